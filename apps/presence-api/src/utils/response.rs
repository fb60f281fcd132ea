//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, presence_error
//! - DTO 转换：status_to_dto, device_info_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, DeviceInfoDto, DeviceStatusDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DeviceId, DeviceInfo, DeviceStatus};
use presence_tracker::PresenceError;
use tracing::warn;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("DEVICE.NOT_FOUND", "device not found")),
    )
        .into_response()
}

/// 在线状态存储错误响应
pub fn presence_error(err: PresenceError) -> Response {
    warn!(target: "presence.api", error = %err, "presence_request_failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", err.to_string())),
    )
        .into_response()
}

pub fn status_to_dto(
    id: Option<DeviceId>,
    sn: Option<String>,
    status: DeviceStatus,
) -> DeviceStatusDto {
    DeviceStatusDto {
        device_id: id.map(|id| id.to_string()),
        sn,
        status: status.as_str().to_string(),
        status_code: status.code(),
    }
}

pub fn device_info_to_dto(info: DeviceInfo) -> DeviceInfoDto {
    DeviceInfoDto {
        device_id: info.id.to_string(),
        sn: info.sn,
        status: info.status.as_str().to_string(),
        status_code: info.status.code(),
        last_login_time_ms: info.last_login_time_ms,
    }
}
