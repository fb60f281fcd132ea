//! Postgres 设备状态存储实现
//!
//! 对应 `device_info` 表：
//! - `id bigint primary key`
//! - `sn text unique`
//! - `device_status smallint`（0 离线 / 1 在线 / 2 未启用）
//! - `last_login_time_ms bigint`
//! - `offline_time_ms bigint null`
//! - `update_by text null`
//!
//! 设计要点：
//! - 使用参数化 SQL 防止注入
//! - 批量更新为单条语句（UNNEST），整体成功或整体失败
//! - 批量更新只作用于仍处于在线状态的行

use crate::error::StorageError;
use crate::traits::DeviceStatusStore;
use domain::{DeviceId, DeviceInfo, DeviceStatus, DeviceStatusRecord, DeviceStatusUpdate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub struct PgDeviceStatusStore {
    pub pool: PgPool,
}

impl PgDeviceStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn device_id_from_row(row: &PgRow) -> Result<DeviceId, StorageError> {
    let id: i64 = row.try_get("id")?;
    u64::try_from(id)
        .map(DeviceId::new)
        .map_err(|_| StorageError::new(format!("negative device id {}", id)))
}

fn status_from_row(row: &PgRow) -> Result<DeviceStatus, StorageError> {
    let code: i16 = row.try_get("device_status")?;
    DeviceStatus::from_code(code)
        .ok_or_else(|| StorageError::new(format!("unknown device status code {}", code)))
}

fn record_from_row(row: &PgRow) -> Result<DeviceStatusRecord, StorageError> {
    Ok(DeviceStatusRecord {
        id: device_id_from_row(row)?,
        status: status_from_row(row)?,
        last_login_time_ms: row.try_get("last_login_time_ms")?,
        offline_time_ms: row.try_get("offline_time_ms")?,
        updated_by: row.try_get("update_by")?,
    })
}

fn id_to_i64(id: DeviceId) -> Result<i64, StorageError> {
    i64::try_from(id.get())
        .map_err(|_| StorageError::new(format!("device id {} out of range", id)))
}

#[async_trait::async_trait]
impl DeviceStatusStore for PgDeviceStatusStore {
    async fn list_online_since(
        &self,
        cutoff_ms: i64,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        let rows = sqlx::query(
            "select id, device_status, last_login_time_ms, offline_time_ms, update_by \
             from device_info where device_status = $1 and last_login_time_ms >= $2",
        )
        .bind(DeviceStatus::Online.code())
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn list_online(&self) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        let rows = sqlx::query(
            "select id, device_status, last_login_time_ms, offline_time_ms, update_by \
             from device_info where device_status = $1",
        )
        .bind(DeviceStatus::Online.code())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn update_status_batch(
        &self,
        updates: &[DeviceStatusUpdate],
    ) -> Result<(), StorageError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut ids = Vec::with_capacity(updates.len());
        let mut statuses = Vec::with_capacity(updates.len());
        let mut offline_times = Vec::with_capacity(updates.len());
        let mut updated_by = Vec::with_capacity(updates.len());
        for update in updates {
            ids.push(id_to_i64(update.id)?);
            statuses.push(update.status.code());
            offline_times.push(update.offline_time_ms);
            updated_by.push(update.updated_by.clone());
        }
        sqlx::query(
            "update device_info as d \
             set device_status = u.status, offline_time_ms = u.offline_time_ms, update_by = u.update_by \
             from unnest($1::bigint[], $2::smallint[], $3::bigint[], $4::text[]) \
                  as u(id, status, offline_time_ms, update_by) \
             where d.id = u.id and d.device_status = $5",
        )
        .bind(ids)
        .bind(statuses)
        .bind(offline_times)
        .bind(updated_by)
        .bind(DeviceStatus::Online.code())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_sn(&self, sn: &str) -> Result<Option<DeviceInfo>, StorageError> {
        let row = sqlx::query(
            "select id, sn, device_status, last_login_time_ms from device_info where sn = $1",
        )
        .bind(sn)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(DeviceInfo {
            id: device_id_from_row(&row)?,
            sn: row.try_get("sn")?,
            status: status_from_row(&row)?,
            last_login_time_ms: row.try_get("last_login_time_ms")?,
        }))
    }
}
