//! 输入验证辅助函数
//!
//! - normalize_required：验证必填字段，去除空格并检查非空
//! - parse_device_id：解析路径中的设备 ID
//!
//! 失败返回 bad_request_error 响应

use crate::utils::response::bad_request_error;
use axum::response::Response;
use domain::DeviceId;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 解析设备 ID（非负整数）
pub fn parse_device_id(value: &str) -> Result<DeviceId, Response> {
    value
        .parse::<DeviceId>()
        .map_err(|err| bad_request_error(err.to_string()))
}
