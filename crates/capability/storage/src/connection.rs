//! 数据库连接管理
//!
//! 提供数据库连接池初始化功能：
//! - connect_pool：建立 Postgres 连接池
//!
//! 设计原则：
//! - 最大连接数限制为 8（对账任务为单次批量查询 + 单条批量更新，无需更多连接）
//! - 获取连接超时交给连接池控制，本层不再叠加超时

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// 连接池默认最大连接数。
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// 建立 Postgres 连接池
///
/// # 参数
/// - `database_url`：Postgres 连接字符串
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    connect_pool_with(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// 以指定最大连接数建立 Postgres 连接池
pub async fn connect_pool_with(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await?;
    Ok(pool)
}
