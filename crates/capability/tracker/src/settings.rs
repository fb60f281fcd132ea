//! 滑动窗口参数。

use crate::error::PresenceError;
use std::time::Duration;

pub const DEFAULT_LOCK_KEY: &str = "device_status:bitset_change_lock";
pub const DEFAULT_INDEX_KEY: &str = "device_status:bitset_index";
pub const DEFAULT_WINDOW_KEY_PREFIX: &str = "device_status:bitset_";
pub const DEFAULT_SAFETY_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SCHEDULE_OFFSET: Duration = Duration::from_secs(1);

/// 在线状态追踪参数。
///
/// 时间均为 `Duration`，测试中可直接使用毫秒级周期。
#[derive(Debug, Clone)]
pub struct PresenceSettings {
    /// 滑动窗口周期，同时也是轮转锁的 TTL。
    pub window_period: Duration,
    /// 设备心跳间隔。
    pub heartbeat_interval: Duration,
    /// 定时器相对窗口周期的偏移，避免与锁过期时刻撞车。
    pub schedule_offset: Duration,
    pub lock_key: String,
    pub index_key: String,
    pub window_key_prefix: String,
    /// 窗口位图的兜底过期时间，轮转停滞时由它清理遗留位图。
    pub window_safety_ttl: Duration,
    /// 对账降级时写入的操作人。
    pub updated_by: String,
}

impl PresenceSettings {
    pub fn new(window_period: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            window_period,
            heartbeat_interval,
            schedule_offset: DEFAULT_SCHEDULE_OFFSET,
            lock_key: DEFAULT_LOCK_KEY.to_string(),
            index_key: DEFAULT_INDEX_KEY.to_string(),
            window_key_prefix: DEFAULT_WINDOW_KEY_PREFIX.to_string(),
            window_safety_ttl: DEFAULT_SAFETY_TTL,
            updated_by: domain::SYSTEM_ACTOR.to_string(),
        }
    }

    pub fn with_schedule_offset(mut self, schedule_offset: Duration) -> Self {
        self.schedule_offset = schedule_offset;
        self
    }

    pub fn validate(&self) -> Result<(), PresenceError> {
        if self.window_period.is_zero() {
            return Err(PresenceError::InvalidSettings(
                "window period must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(PresenceError::InvalidSettings(
                "heartbeat interval must be positive".to_string(),
            ));
        }
        if self.window_safety_ttl.is_zero() {
            return Err(PresenceError::InvalidSettings(
                "window safety ttl must be positive".to_string(),
            ));
        }
        if self.lock_key.is_empty() || self.index_key.is_empty() {
            return Err(PresenceError::InvalidSettings(
                "lock key and index key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 单次心跳需要写入的窗口数 K。
    pub fn windows_per_heartbeat(&self) -> u64 {
        count_bitset_num(self.heartbeat_interval, self.window_period)
    }

    /// 定时器周期：窗口周期 + 偏移。
    pub fn timer_period(&self) -> Duration {
        self.window_period + self.schedule_offset
    }

    pub fn window_key(&self, index: u64) -> String {
        format!("{}{}", self.window_key_prefix, index)
    }
}

/// K = max(floor(heartbeat / window), 1)，按毫秒精度计算。
pub fn count_bitset_num(heartbeat_interval: Duration, window_period: Duration) -> u64 {
    let window_ms = window_period.as_millis();
    if window_ms == 0 {
        return 1;
    }
    let windows = heartbeat_interval.as_millis() / window_ms;
    u64::try_from(windows).unwrap_or(u64::MAX).max(1)
}
