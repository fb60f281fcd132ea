//! 存储接口 Trait 定义
//!
//! 定义在线状态追踪依赖的外部能力：
//! - BitsetStore：命名位图（get/set/count/delete/expire）
//! - CellStore：命名键值单元（set-if-absent 作为锁、索引计数）
//! - DeviceStatusStore：设备状态系统记录（查询在线设备、批量更新）
//! - DeviceResolver：SN 到设备信息的解析
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发（`Arc<dyn ...>` 注入）

use crate::error::StorageError;
use async_trait::async_trait;
use domain::{DeviceInfo, DeviceStatusRecord, DeviceStatusUpdate};
use std::time::Duration;

/// 命名位图存储
///
/// 位操作在存储端是原子的，调用方无需额外加锁。
#[async_trait]
pub trait BitsetStore: Send + Sync {
    /// 读取单个 bit，位图不存在时视为 false
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool, StorageError>;

    /// 批量读取同一位图中的多个 bit，结果顺序与 `offsets` 一致
    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StorageError>;

    /// 设置单个 bit，位图不存在时惰性创建
    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<(), StorageError>;

    /// 在多张位图中设置同一个 bit 并刷新过期时间（一次往返完成）
    async fn set_bit_in_all(
        &self,
        keys: &[String],
        offset: u64,
        value: bool,
        ttl: Duration,
    ) -> Result<(), StorageError>;

    /// 统计位图中被置位的 bit 数
    async fn count_bits(&self, key: &str) -> Result<u64, StorageError>;

    /// 删除位图，返回删除前是否存在
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// 设置位图的过期时间（从现在起算）
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError>;

    /// 可用的最大 bit 偏移量
    fn max_offset(&self) -> u64 {
        u64::MAX
    }
}

/// 命名键值单元存储
#[async_trait]
pub trait CellStore: Send + Sync {
    /// 仅当键不存在时写入，返回是否写入成功（原子操作）
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), StorageError>;

    /// 删除键，返回删除前是否存在
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// 原子自增 1，返回自增后的值；键不存在时按 0 起算
    async fn incr(&self, key: &str) -> Result<i64, StorageError>;
}

/// 设备状态系统记录
///
/// 对应关系型库中的设备信息表，只暴露在线状态追踪需要的查询与更新。
#[async_trait]
pub trait DeviceStatusStore: Send + Sync {
    /// 查询状态为在线且最后上线时间不早于 `cutoff_ms` 的记录
    async fn list_online_since(
        &self,
        cutoff_ms: i64,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError>;

    /// 查询所有状态为在线的记录（不限最后上线时间）
    async fn list_online(&self) -> Result<Vec<DeviceStatusRecord>, StorageError>;

    /// 批量更新设备状态，整体成功或整体失败
    async fn update_status_batch(
        &self,
        updates: &[DeviceStatusUpdate],
    ) -> Result<(), StorageError>;

    /// 根据 SN 查询设备基本信息
    async fn find_by_sn(&self, sn: &str) -> Result<Option<DeviceInfo>, StorageError>;
}

/// SN 到设备信息的解析器
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    async fn resolve(&self, sn: &str) -> Result<Option<DeviceInfo>, StorageError>;
}
