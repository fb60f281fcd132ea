//! 路由定义
//!
//! - 健康检查：/health
//! - 指标快照：/metrics
//! - 在线状态：/api/devices/*

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/api/devices/online/count", get(count_online))
        .route("/api/devices/:device_id/status", get(get_device_status))
        .route("/api/devices/:device_id/heartbeat", post(heartbeat))
        .route("/api/devices/sn/:sn/status", get(get_status_by_sn))
        .route("/api/devices/sn/:sn", get(get_device_by_sn))
}
