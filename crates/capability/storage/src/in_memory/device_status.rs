//! 设备状态系统记录的内存实现（用于测试与本地运行）。

use crate::error::StorageError;
use crate::traits::DeviceStatusStore;
use domain::{DeviceId, DeviceInfo, DeviceStatus, DeviceStatusRecord, DeviceStatusUpdate};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct Row {
    sn: Option<String>,
    record: DeviceStatusRecord,
}

#[derive(Default)]
pub struct InMemoryDeviceStatusStore {
    rows: RwLock<HashMap<DeviceId, Row>>,
}

impl InMemoryDeviceStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖一条记录。
    pub fn upsert(&self, record: DeviceStatusRecord) -> Result<(), StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let sn = rows.get(&record.id).and_then(|row| row.sn.clone());
        rows.insert(record.id, Row { sn, record });
        Ok(())
    }

    /// 写入或覆盖一条带 SN 的记录。
    pub fn upsert_with_sn(
        &self,
        sn: impl Into<String>,
        record: DeviceStatusRecord,
    ) -> Result<(), StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        rows.insert(
            record.id,
            Row {
                sn: Some(sn.into()),
                record,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: DeviceId) -> Result<Option<DeviceStatusRecord>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(rows.get(&id).map(|row| row.record.clone()))
    }

    fn collect_online(
        &self,
        keep: impl Fn(&DeviceStatusRecord) -> bool,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut records: Vec<DeviceStatusRecord> = rows
            .values()
            .map(|row| &row.record)
            .filter(|record| record.status == DeviceStatus::Online && keep(record))
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl DeviceStatusStore for InMemoryDeviceStatusStore {
    async fn list_online_since(
        &self,
        cutoff_ms: i64,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        self.collect_online(|record| record.last_login_time_ms >= cutoff_ms)
    }

    async fn list_online(&self) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        self.collect_online(|_| true)
    }

    async fn update_status_batch(
        &self,
        updates: &[DeviceStatusUpdate],
    ) -> Result<(), StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for update in updates {
            let Some(row) = rows.get_mut(&update.id) else {
                continue;
            };
            // 与 Postgres 实现一致：只更新仍处于在线状态的行
            if row.record.status != DeviceStatus::Online {
                continue;
            }
            row.record.status = update.status;
            row.record.offline_time_ms = Some(update.offline_time_ms);
            row.record.updated_by = Some(update.updated_by.clone());
        }
        Ok(())
    }

    async fn find_by_sn(&self, sn: &str) -> Result<Option<DeviceInfo>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(rows
            .values()
            .find(|row| row.sn.as_deref() == Some(sn))
            .map(|row| DeviceInfo {
                id: row.record.id,
                sn: sn.to_string(),
                status: row.record.status,
                last_login_time_ms: row.record.last_login_time_ms,
            }))
    }
}
