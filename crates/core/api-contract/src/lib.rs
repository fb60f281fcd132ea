//! 稳定的 DTO 与 API 响应契约。

use serde::Serialize;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 设备在线状态返回结构。
///
/// `statusCode` 与系统记录中的 `device_status` 列取值一致（0 离线 / 1 在线 / 2 未启用）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
    pub status: String,
    pub status_code: i16,
}

/// 当前窗口在线设备数。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineCountDto {
    pub window: u64,
    pub online: u64,
}

/// 按 SN 解析出的设备信息（状态已按实时位图覆盖）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoDto {
    pub device_id: String,
    pub sn: String,
    pub status: String,
    pub status_code: i16,
    pub last_login_time_ms: i64,
}

/// 心跳写入确认。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    pub device_id: String,
    pub window: u64,
    pub windows_written: u64,
}

/// 在线状态指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub heartbeats: u64,
    pub status_queries: u64,
    pub rotations_led: u64,
    pub rotations_skipped: u64,
    pub rotation_failures: u64,
    pub records_demoted: u64,
    pub reconcile_failures: u64,
}
