//! 设备在线状态服务：心跳写入、状态查询与窗口轮转定时任务。

mod handlers;
mod middleware;
mod routes;
mod utils;

use axum::{Router, middleware as axum_middleware};
use presence_config::AppConfig;
use presence_storage::{CachedDeviceResolver, PgDeviceStatusStore, RedisPresenceStore};
use presence_telemetry::init_tracing;
use presence_tracker::{PresenceSettings, PresenceTracker};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub tracker: PresenceTracker,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // Redis：窗口位图、轮转锁、索引单元与 SN 缓存
    let presence_store = Arc::new(RedisPresenceStore::connect(&config.redis_url).await?);
    // Postgres：设备状态系统记录
    let device_store = Arc::new(PgDeviceStatusStore::connect(&config.database_url).await?);
    let resolver = Arc::new(
        CachedDeviceResolver::new(presence_store.clone(), device_store.clone())
            .with_key_prefix(config.device_cache_prefix.clone())
            .with_ttl(Duration::from_secs(config.device_cache_ttl_seconds)),
    );

    let tracker = PresenceTracker::new(
        presence_store.clone(),
        presence_store,
        device_store,
        resolver,
        presence_settings(&config),
    )?;

    if config.rotation_enabled {
        tracker.rotation.clone().spawn();
    } else {
        info!(target: "presence.api", "rotation_timer_disabled");
    }

    let app = build_app(AppState { tracker });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "presence.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// 组装路由并注入 request_id/trace_id。
pub fn build_app(state: AppState) -> Router {
    routes::create_api_router()
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::request_context))
}

fn presence_settings(config: &AppConfig) -> PresenceSettings {
    let mut settings = PresenceSettings::new(
        Duration::from_secs(config.window_period_seconds),
        Duration::from_secs(config.heartbeat_interval_seconds),
    )
    .with_schedule_offset(Duration::from_secs(config.schedule_offset_seconds));
    settings.lock_key = config.lock_key.clone();
    settings.index_key = config.index_key.clone();
    settings.window_key_prefix = config.window_key_prefix.clone();
    settings.window_safety_ttl = Duration::from_secs(config.window_safety_ttl_seconds);
    settings.updated_by = config.updated_by.clone();
    settings
}


#[cfg(test)]
mod tests {
    use super::presence_settings;
    use presence_config::AppConfig;

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            http_addr: "127.0.0.1:0".to_string(),
            database_url: "postgresql://localhost/cpe".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            window_period_seconds: 60,
            heartbeat_interval_seconds: 1800,
            schedule_offset_seconds: 2,
            lock_key: "lock".to_string(),
            index_key: "index".to_string(),
            window_key_prefix: "bits_".to_string(),
            window_safety_ttl_seconds: 3600,
            device_cache_prefix: "sn:".to_string(),
            device_cache_ttl_seconds: 60,
            updated_by: "reconciler".to_string(),
            rotation_enabled: true,
        };
        let settings = presence_settings(&config);
        assert_eq!(settings.windows_per_heartbeat(), 30);
        assert_eq!(settings.timer_period().as_secs(), 62);
        assert_eq!(settings.window_key(3), "bits_3");
        assert_eq!(settings.lock_key, "lock");
        assert_eq!(settings.updated_by, "reconciler");
        assert!(settings.validate().is_ok());
    }
}
