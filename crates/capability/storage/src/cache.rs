//! 旁路缓存（cache-aside）通用函数。
//!
//! 先读缓存单元；未命中时调用 `compute` 计算，
//! 结果为空则清除缓存键，结果非空且 `should_cache` 允许时写回缓存。

use crate::error::StorageError;
use crate::traits::CellStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 读取或计算并缓存。
///
/// - 缓存值以 JSON 存储在 `key` 对应的单元中
/// - 缓存值无法解析时视为未命中并重新计算
/// - `ttl` 为 `None` 时缓存不过期
pub async fn get_or_compute<T, F, Fut, P>(
    cells: &dyn CellStore,
    key: &str,
    compute: F,
    should_cache: P,
    ttl: Option<Duration>,
) -> Result<Option<T>, StorageError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, StorageError>>,
    P: FnOnce(&T) -> bool,
{
    if let Some(cached) = cells.get(key).await? {
        match serde_json::from_str::<T>(&cached) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => {
                warn!(target: "presence.cache", key = %key, error = %err, "cache_value_undecodable");
            }
        }
    }

    let Some(value) = compute().await? else {
        cells.delete(key).await?;
        return Ok(None);
    };
    if should_cache(&value) {
        let data = serde_json::to_string(&value)?;
        cells.set(key, &data, ttl).await?;
    }
    Ok(Some(value))
}

/// 总是缓存。
pub fn always<T>(_: &T) -> bool {
    true
}
