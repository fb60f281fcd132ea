//! 窗口轮转协调。
//!
//! 每个进程运行一个固定频率的定时器（窗口周期 + 偏移）。每次触发时尝试以
//! set-if-absent 抢占轮转锁（TTL = 窗口周期）：
//! - 抢到：作为本周期 leader，先推进索引再退役旧窗口，随后同步执行对账
//! - 未抢到：follower，本周期什么也不做
//!
//! leader 路径上的任何错误只记录日志，不会终止定时器。推进后、退役前进程退出时，
//! 旧窗口不会被删除，由位图的兜底 TTL 自然清理。

use crate::error::PresenceError;
use crate::reconcile::{ReconcileReport, ReconciliationJob};
use crate::window::PresenceWindowManager;
use presence_telemetry::{record_rotation_failure, record_rotation_led, record_rotation_skipped};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 单次轮转的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Leader {
        retired: u64,
        current: u64,
        report: ReconcileReport,
    },
    Follower,
}

pub struct RotationCoordinator {
    window: Arc<PresenceWindowManager>,
    reconciler: Arc<ReconciliationJob>,
    owner_token: String,
}

impl RotationCoordinator {
    pub fn new(window: Arc<PresenceWindowManager>, reconciler: Arc<ReconciliationJob>) -> Self {
        Self {
            window,
            reconciler,
            owner_token: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// 本进程写入锁单元的持有者标识。
    pub fn owner_token(&self) -> &str {
        &self.owner_token
    }

    /// 尝试获取本周期的轮转锁（非阻塞，仅尝试一次）。
    pub async fn try_acquire_lock(&self) -> Result<bool, PresenceError> {
        let settings = self.window.settings();
        let acquired = self
            .window
            .cells()
            .set_if_absent(
                &settings.lock_key,
                &self.owner_token,
                Some(settings.window_period),
            )
            .await?;
        Ok(acquired)
    }

    /// 锁仍由本进程持有时才继续执行写操作。
    async fn ensure_lease(&self) -> Result<(), PresenceError> {
        let key = &self.window.settings().lock_key;
        let holder = self.window.cells().get(key).await?;
        if holder.as_deref() != Some(self.owner_token.as_str()) {
            return Err(PresenceError::LeaseLost { key: key.clone() });
        }
        Ok(())
    }

    /// 执行一次轮转尝试，错误向上返回。
    pub async fn tick(&self) -> Result<RotationOutcome, PresenceError> {
        if !self.try_acquire_lock().await? {
            return Ok(RotationOutcome::Follower);
        }
        // 先推进再退役，读者任何时刻都至少能看到一个可写窗口
        let retired = self.window.advance().await?;
        self.ensure_lease().await?;
        self.window.retire(retired).await?;
        let report = self.reconciler.run().await?;
        Ok(RotationOutcome::Leader {
            retired,
            current: retired + 1,
            report,
        })
    }

    /// 执行一次轮转尝试并吞掉错误（仅记录日志与指标）。
    pub async fn run_once(&self) -> Option<RotationOutcome> {
        match self.tick().await {
            Ok(outcome) => {
                match &outcome {
                    RotationOutcome::Leader {
                        retired,
                        current,
                        report,
                    } => {
                        record_rotation_led();
                        info!(
                            target: "presence.rotation",
                            retired = *retired,
                            current = *current,
                            scanned = report.scanned,
                            demoted = report.demoted,
                            "window_rotated"
                        );
                    }
                    RotationOutcome::Follower => {
                        record_rotation_skipped();
                        debug!(target: "presence.rotation", "rotation_lock_held_elsewhere");
                    }
                }
                Some(outcome)
            }
            Err(err) => {
                record_rotation_failure();
                warn!(target: "presence.rotation", error = %err, "rotation_failed");
                None
            }
        }
    }

    /// 启动定时轮转任务，首次触发在一个定时器周期之后。
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.window.settings().timer_period();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                target: "presence.rotation",
                period_ms = period.as_millis() as u64,
                owner = %self.owner_token,
                "rotation_timer_started"
            );
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
