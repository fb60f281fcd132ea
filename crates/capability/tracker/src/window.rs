//! 滑动窗口位图管理。
//!
//! 每个窗口是一张以设备 ID 为偏移量的位图，窗口索引从 1 开始单调递增。
//! 一次心跳写入 `[cur, cur + K)` 共 K 个窗口，读取只看当前窗口 `cur`，
//! 因此设备最后一次心跳后至少在线一个心跳间隔，至多再多一个窗口周期。
//!
//! 写入与轮转并发时，心跳可能落进刚被退役的窗口。写完后会重新读取索引，
//! 把低于当前索引的窗口再删一次，避免它们滞留到兜底 TTL。

use crate::error::PresenceError;
use crate::settings::PresenceSettings;
use domain::DeviceId;
use presence_storage::{BitsetStore, CellStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// 索引单元不存在或非正数时使用的默认窗口索引。
pub const DEFAULT_WINDOW_INDEX: u64 = 1;

pub struct PresenceWindowManager {
    bits: Arc<dyn BitsetStore>,
    cells: Arc<dyn CellStore>,
    settings: PresenceSettings,
}

impl PresenceWindowManager {
    pub fn new(
        bits: Arc<dyn BitsetStore>,
        cells: Arc<dyn CellStore>,
        settings: PresenceSettings,
    ) -> Self {
        Self {
            bits,
            cells,
            settings,
        }
    }

    pub fn settings(&self) -> &PresenceSettings {
        &self.settings
    }

    pub fn cells(&self) -> &Arc<dyn CellStore> {
        &self.cells
    }

    /// 单次心跳写入的窗口数 K（每次按配置重新计算）。
    pub fn windows_per_heartbeat(&self) -> u64 {
        self.settings.windows_per_heartbeat()
    }

    /// 当前可写窗口的索引，不存在或非正数时为 1。
    pub async fn current_index(&self) -> Result<u64, PresenceError> {
        let Some(raw) = self.cells.get(&self.settings.index_key).await? else {
            return Ok(DEFAULT_WINDOW_INDEX);
        };
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| PresenceError::CorruptIndex(raw.clone()))?;
        Ok(u64::try_from(value)
            .ok()
            .filter(|index| *index > 0)
            .unwrap_or(DEFAULT_WINDOW_INDEX))
    }

    /// 存储可接受的最大设备 ID。
    pub fn max_device_id(&self) -> u64 {
        self.bits.max_offset()
    }

    /// 标记设备在线：写入 `[cur, cur + K)` 共 K 个窗口。幂等。
    ///
    /// 返回写入的起始窗口 `cur`。
    pub async fn mark_online(&self, id: DeviceId) -> Result<u64, PresenceError> {
        self.write_presence(id, true).await
    }

    /// 标记设备离线：清除 `[cur, cur + K)` 中的对应 bit。
    pub async fn mark_offline(&self, id: DeviceId) -> Result<u64, PresenceError> {
        self.write_presence(id, false).await
    }

    async fn write_presence(&self, id: DeviceId, online: bool) -> Result<u64, PresenceError> {
        let start = self.current_index().await?;
        let end = start.saturating_add(self.windows_per_heartbeat());
        let keys: Vec<String> = (start..end)
            .map(|index| self.settings.window_key(index))
            .collect();
        self.bits
            .set_bit_in_all(&keys, id.get(), online, self.settings.window_safety_ttl)
            .await?;

        let current = self.current_index().await?;
        for index in start..current.min(end) {
            let existed = self.bits.delete(&self.settings.window_key(index)).await?;
            debug!(target: "presence.window", index, current, existed, "stale_window_removed");
        }
        Ok(start)
    }

    /// 设备是否在线：只读取当前窗口。
    pub async fn is_online(&self, id: DeviceId) -> Result<bool, PresenceError> {
        let index = self.current_index().await?;
        let online = self
            .bits
            .get_bit(&self.settings.window_key(index), id.get())
            .await?;
        Ok(online)
    }

    /// 在指定窗口中批量读取设备在线状态，顺序与 `ids` 一致。
    pub async fn online_among(
        &self,
        index: u64,
        ids: &[DeviceId],
    ) -> Result<Vec<bool>, PresenceError> {
        let offsets: Vec<u64> = ids.iter().map(|id| id.get()).collect();
        let flags = self
            .bits
            .get_bits(&self.settings.window_key(index), &offsets)
            .await?;
        Ok(flags)
    }

    /// 当前窗口中的在线设备数（精确值）。
    pub async fn count_online(&self) -> Result<u64, PresenceError> {
        let (_, count) = self.count_online_with_index().await?;
        Ok(count)
    }

    /// 当前窗口索引及该窗口中的在线设备数。
    pub async fn count_online_with_index(&self) -> Result<(u64, u64), PresenceError> {
        let index = self.current_index().await?;
        let count = self
            .bits
            .count_bits(&self.settings.window_key(index))
            .await?;
        Ok((index, count))
    }

    /// 原子推进窗口索引，返回推进前的索引（即应当退役的窗口）。
    ///
    /// 调用方（轮转协调器）负责保证每个周期只有一个调用者。
    pub async fn advance(&self) -> Result<u64, PresenceError> {
        let key = &self.settings.index_key;
        self.cells
            .set_if_absent(key, &DEFAULT_WINDOW_INDEX.to_string(), None)
            .await?;
        let next = self.cells.incr(key).await?;
        if next <= DEFAULT_WINDOW_INDEX as i64 {
            // 单元被写成非正数：读取侧按默认索引处理，这里同样从默认索引推进一格
            let repaired = DEFAULT_WINDOW_INDEX + 1;
            self.cells.set(key, &repaired.to_string(), None).await?;
            warn!(target: "presence.window", raw = next, "window_index_repaired");
            return Ok(DEFAULT_WINDOW_INDEX);
        }
        Ok((next - 1) as u64)
    }

    /// 删除指定索引的窗口位图。
    pub async fn retire(&self, index: u64) -> Result<bool, PresenceError> {
        let existed = self.bits.delete(&self.settings.window_key(index)).await?;
        debug!(target: "presence.window", index, existed, "window_retired");
        Ok(existed)
    }

    /// 清空所有窗口、轮转锁与索引单元，索引回到默认值。
    ///
    /// 覆盖 `[max(1, cur - K), cur + K]`，逐个尝试删除，失败不回滚，
    /// 只要有一个删除失败整体即返回 `PartialClear`。
    /// 索引单元无法读取时按默认索引清理窗口，锁与索引单元照常删除。
    pub async fn clear_all(&self) -> Result<(), PresenceError> {
        let mut attempted = 0usize;
        let mut failed = 0usize;
        let current = match self.current_index().await {
            Ok(index) => index,
            Err(err) => {
                attempted += 1;
                failed += 1;
                warn!(target: "presence.window", error = %err, "window_index_unreadable");
                DEFAULT_WINDOW_INDEX
            }
        };
        let k = self.windows_per_heartbeat();
        let floor = current.saturating_sub(k).max(DEFAULT_WINDOW_INDEX);
        let ceiling = current.saturating_add(k);

        for index in floor..=ceiling {
            attempted += 1;
            let key = self.settings.window_key(index);
            if let Err(err) = self.bits.delete(&key).await {
                failed += 1;
                warn!(target: "presence.window", key = %key, error = %err, "window_delete_failed");
            }
        }
        for key in [&self.settings.lock_key, &self.settings.index_key] {
            attempted += 1;
            if let Err(err) = self.cells.delete(key).await {
                failed += 1;
                warn!(target: "presence.window", key = %key, error = %err, "cell_delete_failed");
            }
        }

        if failed > 0 {
            return Err(PresenceError::PartialClear { failed, attempted });
        }
        debug!(target: "presence.window", floor, ceiling, "presence_cleared");
        Ok(())
    }
}
