//! # PostgreSQL 存储实现模块
//!
//! 本模块提供设备状态系统记录的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定，防止 SQL 注入攻击
//! 2. **整体提交**：批量状态更新为单条语句，成功或失败作为整体返回
//! 3. **连接池管理**：使用连接池复用数据库连接
//!
//! ## 数据库模式要求
//!
//! - `device_info`：设备信息表（id, sn, device_status, last_login_time_ms, offline_time_ms, update_by）
//!
//! 建议索引：`(device_status, last_login_time_ms)`，覆盖对账时的有界查询。

pub mod device_status;

pub use device_status::*;
