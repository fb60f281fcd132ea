//! Redis 位图与键值单元实现
//!
//! - 位图：SETBIT / GETBIT / BITCOUNT / DEL / PEXPIRE
//! - 单元：SET NX PX / GET / SET PX / DEL / INCR
//!
//! 过期时间统一使用毫秒精度，便于以毫秒级周期运行测试环境。
//! 所有命令复用同一个 `ConnectionManager`，断线后自动重连。

use crate::error::StorageError;
use crate::traits::{BitsetStore, CellStore};
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis 位图偏移量上限（2^32 - 1）。
const MAX_BIT_OFFSET: u64 = u32::MAX as u64;

fn ensure_offset(offset: u64) -> Result<u64, StorageError> {
    if offset > MAX_BIT_OFFSET {
        return Err(StorageError::new(format!(
            "bit offset {} exceeds redis limit {}",
            offset, MAX_BIT_OFFSET
        )));
    }
    Ok(offset)
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Redis 在线状态存储（位图 + 锁/索引单元）。
#[derive(Clone)]
pub struct RedisPresenceStore {
    manager: ConnectionManager,
}

impl RedisPresenceStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    /// 共享连接的句柄（clone 只复制句柄，不新建连接）。
    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// 每张位图一条 SETBIT + 一条 PEXPIRE，按顺序排入同一个 pipeline。
fn set_bits_pipeline(
    keys: &[String],
    offset: u64,
    value: bool,
    ttl: Duration,
) -> Result<redis::Pipeline, StorageError> {
    let offset = ensure_offset(offset)?;
    let mut pipe = redis::pipe();
    for key in keys {
        pipe.cmd("SETBIT")
            .arg(key)
            .arg(offset)
            .arg(u8::from(value))
            .ignore();
        pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl)).ignore();
    }
    Ok(pipe)
}

#[async_trait::async_trait]
impl BitsetStore for RedisPresenceStore {
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool, StorageError> {
        let offset = ensure_offset(offset)?;
        let mut connection = self.connection();
        let bit: u8 = redis::cmd("GETBIT")
            .arg(key)
            .arg(offset)
            .query_async(&mut connection)
            .await?;
        Ok(bit == 1)
    }

    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StorageError> {
        if offsets.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for offset in offsets {
            pipe.cmd("GETBIT").arg(key).arg(ensure_offset(*offset)?);
        }
        let mut connection = self.connection();
        let bits: Vec<u8> = pipe.query_async(&mut connection).await?;
        Ok(bits.into_iter().map(|bit| bit == 1).collect())
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<(), StorageError> {
        let offset = ensure_offset(offset)?;
        let mut connection = self.connection();
        let _previous: u8 = redis::cmd("SETBIT")
            .arg(key)
            .arg(offset)
            .arg(u8::from(value))
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn set_bit_in_all(
        &self,
        keys: &[String],
        offset: u64,
        value: bool,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        let pipe = set_bits_pipeline(keys, offset, value, ttl)?;
        let mut connection = self.connection();
        let _: () = pipe.query_async(&mut connection).await?;
        Ok(())
    }

    async fn count_bits(&self, key: &str) -> Result<u64, StorageError> {
        let mut connection = self.connection();
        let count: u64 = redis::cmd("BITCOUNT")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(count)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut connection = self.connection();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        let mut connection = self.connection();
        let _applied: u8 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    fn max_offset(&self) -> u64 {
        MAX_BIT_OFFSET
    }
}

#[async_trait::async_trait]
impl CellStore for RedisPresenceStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let mut connection = self.connection();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let reply: Option<String> = cmd.query_async(&mut connection).await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut connection = self.connection();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let mut connection = self.connection();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd.query_async(&mut connection).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        BitsetStore::delete(self, key).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StorageError> {
        let mut connection = self.connection();
        let value: i64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(value)
    }
}
