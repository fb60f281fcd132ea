//! 追踪、请求 ID 与在线状态指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub heartbeats: u64,
    pub status_queries: u64,
    pub rotations_led: u64,
    pub rotations_skipped: u64,
    pub rotation_failures: u64,
    pub records_demoted: u64,
    pub reconcile_failures: u64,
}

/// 在线状态进程内指标。
pub struct TelemetryMetrics {
    heartbeats: AtomicU64,
    status_queries: AtomicU64,
    rotations_led: AtomicU64,
    rotations_skipped: AtomicU64,
    rotation_failures: AtomicU64,
    records_demoted: AtomicU64,
    reconcile_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            heartbeats: AtomicU64::new(0),
            status_queries: AtomicU64::new(0),
            rotations_led: AtomicU64::new(0),
            rotations_skipped: AtomicU64::new(0),
            rotation_failures: AtomicU64::new(0),
            records_demoted: AtomicU64::new(0),
            reconcile_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            status_queries: self.status_queries.load(Ordering::Relaxed),
            rotations_led: self.rotations_led.load(Ordering::Relaxed),
            rotations_skipped: self.rotations_skipped.load(Ordering::Relaxed),
            rotation_failures: self.rotation_failures.load(Ordering::Relaxed),
            records_demoted: self.records_demoted.load(Ordering::Relaxed),
            reconcile_failures: self.reconcile_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录心跳写入次数。
pub fn record_heartbeat() {
    metrics().heartbeats.fetch_add(1, Ordering::Relaxed);
}

/// 记录状态查询次数。
pub fn record_status_query() {
    metrics().status_queries.fetch_add(1, Ordering::Relaxed);
}

/// 记录本进程作为 leader 完成的轮转次数。
pub fn record_rotation_led() {
    metrics().rotations_led.fetch_add(1, Ordering::Relaxed);
}

/// 记录未抢到锁（follower）的轮转次数。
pub fn record_rotation_skipped() {
    metrics().rotations_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录 leader 路径失败次数。
pub fn record_rotation_failure() {
    metrics().rotation_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录对账降级为离线的记录数。
pub fn record_records_demoted(count: u64) {
    metrics().records_demoted.fetch_add(count, Ordering::Relaxed);
}

/// 记录对账失败次数。
pub fn record_reconcile_failure() {
    metrics().reconcile_failures.fetch_add(1, Ordering::Relaxed);
}
