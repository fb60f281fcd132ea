//! 应用运行配置加载。
//!
//! 所有配置在进程启动时读取一次，不支持热更新。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub redis_url: String,
    pub window_period_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub schedule_offset_seconds: u64,
    pub lock_key: String,
    pub index_key: String,
    pub window_key_prefix: String,
    pub window_safety_ttl_seconds: u64,
    pub device_cache_prefix: String,
    pub device_cache_ttl_seconds: u64,
    pub updated_by: String,
    pub rotation_enabled: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("PRESENCE_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("PRESENCE_DATABASE_URL".to_string()))?;
        let http_addr =
            env::var("PRESENCE_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let redis_url = env::var("PRESENCE_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let window_period_seconds = read_positive_u64("PRESENCE_WINDOW_PERIOD_SECONDS", None)?;
        let heartbeat_interval_seconds =
            read_positive_u64("PRESENCE_HEARTBEAT_INTERVAL_SECONDS", Some(1800))?;
        let schedule_offset_seconds = read_u64_with_default("PRESENCE_SCHEDULE_OFFSET_SECONDS", 1)?;
        let lock_key = env::var("PRESENCE_LOCK_KEY")
            .unwrap_or_else(|_| "device_status:bitset_change_lock".to_string());
        let index_key = env::var("PRESENCE_INDEX_KEY")
            .unwrap_or_else(|_| "device_status:bitset_index".to_string());
        let window_key_prefix = env::var("PRESENCE_WINDOW_KEY_PREFIX")
            .unwrap_or_else(|_| "device_status:bitset_".to_string());
        let window_safety_ttl_seconds =
            read_positive_u64("PRESENCE_WINDOW_SAFETY_TTL_SECONDS", Some(86_400))?;
        let device_cache_prefix = env::var("PRESENCE_DEVICE_CACHE_PREFIX")
            .unwrap_or_else(|_| "device_info:sn:".to_string());
        let device_cache_ttl_seconds =
            read_u64_with_default("PRESENCE_DEVICE_CACHE_TTL_SECONDS", 1800)?;
        let updated_by = read_optional("PRESENCE_UPDATED_BY").unwrap_or_else(|| "system".to_string());
        let rotation_enabled = read_bool_with_default("PRESENCE_ROTATION_ENABLED", true);

        Ok(Self {
            http_addr,
            database_url,
            redis_url,
            window_period_seconds,
            heartbeat_interval_seconds,
            schedule_offset_seconds,
            lock_key,
            index_key,
            window_key_prefix,
            window_safety_ttl_seconds,
            device_cache_prefix,
            device_cache_ttl_seconds,
            updated_by,
            rotation_enabled,
        })
    }
}

/// 读取必须大于 0 的 u64；`default` 为 None 时该变量必填。
fn read_positive_u64(key: &str, default: Option<u64>) -> Result<u64, ConfigError> {
    let value = match (env::var(key), default) {
        (Ok(value), _) => value,
        (Err(_), Some(default)) => return Ok(default),
        (Err(_), None) => return Err(ConfigError::Missing(key.to_string())),
    };
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
