//! # Presence Tracker
//!
//! 基于滑动窗口位图的设备在线状态追踪：
//!
//! - [`window`]：窗口位图管理（标记在线、查询、计数、推进、退役、清空）
//! - [`rotation`]：跨进程的窗口轮转协调（锁 + 定时器）
//! - [`reconcile`]：轮转后把系统记录中的过期在线设备降级为离线
//! - [`status`]：对外的状态查询入口
//!
//! 所有组件通过构造参数注入依赖，不使用全局注册表。

pub mod error;
pub mod reconcile;
pub mod rotation;
pub mod settings;
pub mod status;
pub mod window;

pub use error::PresenceError;
pub use reconcile::{ReconcileReport, ReconciliationJob};
pub use rotation::{RotationCoordinator, RotationOutcome};
pub use settings::{PresenceSettings, count_bitset_num};
pub use status::StatusQueryFacade;
pub use window::{DEFAULT_WINDOW_INDEX, PresenceWindowManager};

use presence_storage::{BitsetStore, CellStore, DeviceResolver, DeviceStatusStore};
use std::sync::Arc;

/// 组装好的在线状态追踪组件。
#[derive(Clone)]
pub struct PresenceTracker {
    pub window: Arc<PresenceWindowManager>,
    pub reconciler: Arc<ReconciliationJob>,
    pub rotation: Arc<RotationCoordinator>,
    pub status: Arc<StatusQueryFacade>,
}

impl PresenceTracker {
    pub fn new(
        bits: Arc<dyn BitsetStore>,
        cells: Arc<dyn CellStore>,
        records: Arc<dyn DeviceStatusStore>,
        resolver: Arc<dyn DeviceResolver>,
        settings: PresenceSettings,
    ) -> Result<Self, PresenceError> {
        settings.validate()?;
        let window = Arc::new(PresenceWindowManager::new(bits, cells, settings));
        let reconciler = Arc::new(ReconciliationJob::new(window.clone(), records));
        let rotation = Arc::new(RotationCoordinator::new(
            window.clone(),
            reconciler.clone(),
        ));
        let status = Arc::new(StatusQueryFacade::new(window.clone(), resolver));
        Ok(Self {
            window,
            reconciler,
            rotation,
            status,
        })
    }

    /// 心跳入口：标记设备在线，返回写入的起始窗口。
    pub async fn on_heartbeat(&self, id: domain::DeviceId) -> Result<u64, PresenceError> {
        let window = self.window.mark_online(id).await?;
        presence_telemetry::record_heartbeat();
        Ok(window)
    }
}
