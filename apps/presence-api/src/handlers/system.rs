//! 健康检查与指标快照。
//!
//! - GET /health
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use presence_telemetry::metrics;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            heartbeats: snapshot.heartbeats,
            status_queries: snapshot.status_queries,
            rotations_led: snapshot.rotations_led,
            rotations_skipped: snapshot.rotations_skipped,
            rotation_failures: snapshot.rotation_failures,
            records_demoted: snapshot.records_demoted,
            reconcile_failures: snapshot.reconcile_failures,
        })),
    )
        .into_response()
}
