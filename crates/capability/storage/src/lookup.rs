//! 基于旁路缓存的 SN 解析器。

use crate::cache::{always, get_or_compute};
use crate::error::StorageError;
use crate::traits::{CellStore, DeviceResolver, DeviceStatusStore};
use domain::DeviceInfo;
use std::sync::Arc;
use std::time::Duration;

/// 默认缓存时长：30 分钟。
pub const DEFAULT_DEVICE_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// 默认缓存键前缀。
pub const DEFAULT_DEVICE_CACHE_PREFIX: &str = "device_info:sn:";

/// 先查缓存、未命中再查系统记录的设备解析器。
///
/// 只缓存查到的设备；查不到的 SN 每次都会回源。
pub struct CachedDeviceResolver {
    cells: Arc<dyn CellStore>,
    devices: Arc<dyn DeviceStatusStore>,
    key_prefix: String,
    ttl: Duration,
}

impl CachedDeviceResolver {
    pub fn new(cells: Arc<dyn CellStore>, devices: Arc<dyn DeviceStatusStore>) -> Self {
        Self {
            cells,
            devices,
            key_prefix: DEFAULT_DEVICE_CACHE_PREFIX.to_string(),
            ttl: DEFAULT_DEVICE_CACHE_TTL,
        }
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn cache_key(&self, sn: &str) -> String {
        format!("{}{}", self.key_prefix, sn)
    }
}

#[async_trait::async_trait]
impl DeviceResolver for CachedDeviceResolver {
    async fn resolve(&self, sn: &str) -> Result<Option<DeviceInfo>, StorageError> {
        if sn.trim().is_empty() {
            return Ok(None);
        }
        let key = self.cache_key(sn);
        let devices = self.devices.clone();
        get_or_compute(
            self.cells.as_ref(),
            &key,
            || async move { devices.find_by_sn(sn).await },
            always,
            Some(self.ttl),
        )
        .await
    }
}
