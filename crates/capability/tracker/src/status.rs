//! 设备在线状态查询入口。
//!
//! 系统记录中的状态字段只作参考：除“未启用”外，一律以当前窗口位图为准。

use crate::error::PresenceError;
use crate::window::PresenceWindowManager;
use domain::{DeviceId, DeviceInfo, DeviceStatus, DeviceStatusRecord};
use presence_storage::DeviceResolver;
use presence_telemetry::record_status_query;
use std::sync::Arc;
use tracing::warn;

pub struct StatusQueryFacade {
    window: Arc<PresenceWindowManager>,
    resolver: Arc<dyn DeviceResolver>,
}

impl StatusQueryFacade {
    pub fn new(window: Arc<PresenceWindowManager>, resolver: Arc<dyn DeviceResolver>) -> Self {
        Self { window, resolver }
    }

    /// 按设备 ID 查询：在线或离线。
    pub async fn get_status(&self, id: DeviceId) -> Result<DeviceStatus, PresenceError> {
        record_status_query();
        let online = self.window.is_online(id).await?;
        Ok(DeviceStatus::from_presence(online))
    }

    /// 按 SN 查询；解析不到设备（或解析出错）时返回离线。
    pub async fn get_status_by_external_key(&self, sn: &str) -> Result<DeviceStatus, PresenceError> {
        match self.lookup(sn).await {
            Some(info) => self.get_status(info.id).await,
            None => Ok(DeviceStatus::Offline),
        }
    }

    /// 对系统记录应用“未启用优先，其余以位图为准”的规则。
    pub async fn get_status_for_record(
        &self,
        record: &DeviceStatusRecord,
    ) -> Result<DeviceStatus, PresenceError> {
        if record.status == DeviceStatus::NotEnabled {
            return Ok(DeviceStatus::NotEnabled);
        }
        self.get_status(record.id).await
    }

    /// 按 SN 解析设备信息，并用实时状态覆盖其中的状态字段。
    pub async fn resolve_device(&self, sn: &str) -> Result<Option<DeviceInfo>, PresenceError> {
        let Some(mut info) = self.lookup(sn).await else {
            return Ok(None);
        };
        info.status = self.get_status_for_record(&info.as_status_record()).await?;
        Ok(Some(info))
    }

    /// 当前窗口在线设备总数。
    pub async fn count_online(&self) -> Result<u64, PresenceError> {
        self.window.count_online().await
    }

    /// 当前窗口索引及其在线设备数（同一次读取）。
    pub async fn count_online_with_index(&self) -> Result<(u64, u64), PresenceError> {
        self.window.count_online_with_index().await
    }

    async fn lookup(&self, sn: &str) -> Option<DeviceInfo> {
        match self.resolver.resolve(sn).await {
            Ok(info) => info,
            Err(err) => {
                warn!(target: "presence.status", sn = %sn, error = %err, "device_resolve_failed");
                None
            }
        }
    }
}
