//! 在线状态对账：把系统记录中已离线的设备降级为离线。
//!
//! 只会把在线改为离线，从不提升。批量更新失败不在本轮重试，
//! 这些记录仍为在线，下一轮对账会再次查出并重试。

use crate::error::PresenceError;
use crate::window::PresenceWindowManager;
use domain::{DeviceId, DeviceStatus, DeviceStatusRecord, DeviceStatusUpdate};
use presence_storage::DeviceStatusStore;
use presence_telemetry::{record_reconcile_failure, record_records_demoted};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// 一次对账的结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 对照的窗口索引。
    pub window: u64,
    /// 参与对照的在线记录数。
    pub scanned: usize,
    /// 被降级为离线的记录数。
    pub demoted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// 最后上线时间在两个心跳间隔内。
    Recent,
    /// 不限最后上线时间，用于带外维护。
    Full,
}

pub struct ReconciliationJob {
    window: Arc<PresenceWindowManager>,
    records: Arc<dyn DeviceStatusStore>,
}

impl ReconciliationJob {
    pub fn new(window: Arc<PresenceWindowManager>, records: Arc<dyn DeviceStatusStore>) -> Self {
        Self { window, records }
    }

    /// 有界对账（轮转后调用）。
    pub async fn run(&self) -> Result<ReconcileReport, PresenceError> {
        self.run_at(now_epoch_ms()).await
    }

    pub async fn run_at(&self, now_ms: i64) -> Result<ReconcileReport, PresenceError> {
        self.reconcile(Scope::Recent, now_ms).await
    }

    /// 全量对账：所有在线记录。
    pub async fn run_full(&self) -> Result<ReconcileReport, PresenceError> {
        self.run_full_at(now_epoch_ms()).await
    }

    pub async fn run_full_at(&self, now_ms: i64) -> Result<ReconcileReport, PresenceError> {
        self.reconcile(Scope::Full, now_ms).await
    }

    /// 有界查询的起点：now - 2 * 心跳间隔。
    pub fn recent_cutoff_ms(&self, now_ms: i64) -> i64 {
        let heartbeat_ms =
            i64::try_from(self.window.settings().heartbeat_interval.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(heartbeat_ms.saturating_mul(2))
    }

    async fn reconcile(&self, scope: Scope, now_ms: i64) -> Result<ReconcileReport, PresenceError> {
        let candidates = match scope {
            Scope::Recent => {
                self.records
                    .list_online_since(self.recent_cutoff_ms(now_ms))
                    .await?
            }
            Scope::Full => self.records.list_online().await?,
        };
        let max_id = self.window.max_device_id();
        let (candidates, out_of_range): (Vec<DeviceStatusRecord>, Vec<DeviceStatusRecord>) =
            candidates
                .into_iter()
                .filter(|record| record.status == DeviceStatus::Online)
                .partition(|record| record.id.get() <= max_id);
        // 超出位图偏移上限的设备无法写入窗口，跳过且不降级
        if !out_of_range.is_empty() {
            warn!(
                target: "presence.reconcile",
                skipped = out_of_range.len(),
                max_id,
                first = %out_of_range[0].id,
                "reconcile_ids_out_of_range"
            );
        }

        // 整轮只读取一次索引，所有记录对照同一个窗口
        let index = self.window.current_index().await?;
        let ids: Vec<DeviceId> = candidates.iter().map(|record| record.id).collect();
        let flags = self.window.online_among(index, &ids).await?;

        let updated_by = &self.window.settings().updated_by;
        let updates: Vec<DeviceStatusUpdate> = candidates
            .iter()
            .zip(flags)
            .filter(|(_, online)| !online)
            .map(|(record, _)| DeviceStatusUpdate {
                id: record.id,
                status: DeviceStatus::Offline,
                offline_time_ms: now_ms,
                updated_by: updated_by.clone(),
            })
            .collect();

        let report = ReconcileReport {
            window: index,
            scanned: candidates.len(),
            demoted: updates.len(),
        };
        if !updates.is_empty() {
            if let Err(err) = self.records.update_status_batch(&updates).await {
                record_reconcile_failure();
                warn!(
                    target: "presence.reconcile",
                    window = index,
                    pending = updates.len(),
                    error = %err,
                    "reconcile_batch_update_failed"
                );
                return Err(err.into());
            }
            record_records_demoted(updates.len() as u64);
        }
        info!(
            target: "presence.reconcile",
            window = report.window,
            scanned = report.scanned,
            demoted = report.demoted,
            full = scope == Scope::Full,
            "reconcile_finished"
        );
        Ok(report)
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
