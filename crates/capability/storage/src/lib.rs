//! # Presence Storage 模块
//!
//! 本模块提供设备在线状态追踪所需的外部能力抽象与实现。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：位图、键值单元、设备状态系统记录、SN 解析器
//! 2. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 3. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 4. **缓存辅助层** (`cache.rs`, `lookup.rs`)：通用旁路缓存与基于它的 SN 解析器
//! 5. **实现层**：
//!    - `redis.rs`：Redis 位图与单元（生产环境）
//!    - `postgres/`：PostgreSQL 设备状态记录（生产环境）
//!    - `in_memory/`：内存实现（用于测试和本地演示）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use presence_storage::{RedisPresenceStore, PgDeviceStatusStore};
//! use std::sync::Arc;
//!
//! let presence = Arc::new(RedisPresenceStore::connect("redis://127.0.0.1:6379").await?);
//! let devices = Arc::new(PgDeviceStatusStore::connect("postgresql://localhost/cpe").await?);
//! ```
//!
//! ## 并发语义
//!
//! - 位图的单 bit 读写在存储端原子完成，多进程并发写同一 bit 无需额外加锁
//! - `CellStore::set_if_absent` 是原子的，作为跨进程的轮转锁使用
//! - `CellStore::incr` 是原子的，作为窗口索引的推进手段

pub mod cache;
pub mod connection;
pub mod error;
pub mod in_memory;
pub mod lookup;
pub mod postgres;
pub mod redis;
pub mod traits;

pub use cache::*;
pub use connection::*;
pub use error::*;
pub use lookup::*;
pub use redis::RedisPresenceStore;
pub use traits::*;

pub use in_memory::{InMemoryDeviceStatusStore, InMemoryPresenceStore};

pub use postgres::PgDeviceStatusStore;
