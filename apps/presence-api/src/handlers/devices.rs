//! 设备在线状态 handlers
//!
//! - GET /api/devices/online/count - 当前窗口在线设备数
//! - GET /api/devices/{id}/status - 按设备 ID 查询在线状态
//! - POST /api/devices/{id}/heartbeat - 心跳写入（标记在线）
//! - GET /api/devices/sn/{sn}/status - 按 SN 查询在线状态
//! - GET /api/devices/sn/{sn} - 按 SN 解析设备信息（状态为实时值）
//!
//! 状态以当前窗口位图为准，系统记录中的“未启用”优先。

use crate::AppState;
use crate::utils::response::{
    device_info_to_dto, not_found_error, presence_error, status_to_dto,
};
use crate::utils::{normalize_required, parse_device_id};
use api_contract::{ApiResponse, HeartbeatAck, OnlineCountDto};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    device_id: String,
}

#[derive(serde::Deserialize)]
pub struct SerialPath {
    sn: String,
}

/// 当前窗口在线设备数
pub async fn count_online(State(state): State<AppState>) -> Response {
    match state.tracker.status.count_online_with_index().await {
        Ok((window, online)) => (
            StatusCode::OK,
            Json(ApiResponse::success(OnlineCountDto { window, online })),
        )
            .into_response(),
        Err(err) => presence_error(err),
    }
}

/// 按设备 ID 查询在线状态
pub async fn get_device_status(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
) -> Response {
    let id = match parse_device_id(&path.device_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.tracker.status.get_status(id).await {
        Ok(status) => (
            StatusCode::OK,
            Json(ApiResponse::success(status_to_dto(Some(id), None, status))),
        )
            .into_response(),
        Err(err) => presence_error(err),
    }
}

/// 心跳写入
///
/// 写入 `[cur, cur + K)` 共 K 个窗口，返回写入时的当前窗口与 K。
pub async fn heartbeat(State(state): State<AppState>, Path(path): Path<DevicePath>) -> Response {
    let id = match parse_device_id(&path.device_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let window = match state.tracker.on_heartbeat(id).await {
        Ok(window) => window,
        Err(err) => return presence_error(err),
    };
    let windows_written = state.tracker.window.windows_per_heartbeat();
    debug!(target: "presence.api", device_id = %id, window, windows_written, "heartbeat_recorded");
    (
        StatusCode::OK,
        Json(ApiResponse::success(HeartbeatAck {
            device_id: id.to_string(),
            window,
            windows_written,
        })),
    )
        .into_response()
}

/// 按 SN 查询在线状态，解析不到设备时为离线
pub async fn get_status_by_sn(
    State(state): State<AppState>,
    Path(path): Path<SerialPath>,
) -> Response {
    let sn = match normalize_required(path.sn, "sn") {
        Ok(sn) => sn,
        Err(response) => return response,
    };
    match state.tracker.status.get_status_by_external_key(&sn).await {
        Ok(status) => (
            StatusCode::OK,
            Json(ApiResponse::success(status_to_dto(None, Some(sn), status))),
        )
            .into_response(),
        Err(err) => presence_error(err),
    }
}

/// 按 SN 解析设备信息
pub async fn get_device_by_sn(
    State(state): State<AppState>,
    Path(path): Path<SerialPath>,
) -> Response {
    let sn = match normalize_required(path.sn, "sn") {
        Ok(sn) => sn,
        Err(response) => return response,
    };
    match state.tracker.status.resolve_device(&sn).await {
        Ok(Some(info)) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_info_to_dto(info))),
        )
            .into_response(),
        Ok(None) => not_found_error(),
        Err(err) => presence_error(err),
    }
}
