use domain::{DeviceId, DeviceInfo, DeviceStatus, DeviceStatusRecord};
use presence_storage::{
    CachedDeviceResolver, DeviceResolver, InMemoryDeviceStatusStore, InMemoryPresenceStore,
    StorageError,
};
use presence_tracker::{PresenceSettings, PresenceTracker, PresenceWindowManager, StatusQueryFacade};
use std::sync::Arc;
use std::time::Duration;

fn record(id: u64, status: DeviceStatus) -> DeviceStatusRecord {
    DeviceStatusRecord {
        id: DeviceId::new(id),
        status,
        last_login_time_ms: 1_700_000_000_000,
        offline_time_ms: None,
        updated_by: None,
    }
}

fn tracker() -> (Arc<InMemoryDeviceStatusStore>, PresenceTracker) {
    let store = Arc::new(InMemoryPresenceStore::new());
    let records = Arc::new(InMemoryDeviceStatusStore::new());
    let resolver = Arc::new(CachedDeviceResolver::new(store.clone(), records.clone()));
    let tracker = PresenceTracker::new(
        store.clone(),
        store,
        records.clone(),
        resolver,
        PresenceSettings::new(Duration::from_secs(10), Duration::from_secs(30)),
    )
    .expect("tracker");
    (records, tracker)
}

#[tokio::test]
async fn status_by_id_follows_current_window() {
    let (_, tracker) = tracker();
    let device = DeviceId::new(11);
    assert_eq!(
        tracker.status.get_status(device).await.expect("status"),
        DeviceStatus::Offline
    );
    tracker.on_heartbeat(device).await.expect("heartbeat");
    assert_eq!(
        tracker.status.get_status(device).await.expect("status"),
        DeviceStatus::Online
    );
    assert_eq!(tracker.status.count_online().await.expect("count"), 1);
}

#[tokio::test]
async fn not_enabled_record_is_never_overridden() {
    let (_, tracker) = tracker();
    let disabled = record(5, DeviceStatus::NotEnabled);
    tracker.on_heartbeat(disabled.id).await.expect("heartbeat");
    assert_eq!(
        tracker
            .status
            .get_status_for_record(&disabled)
            .await
            .expect("status"),
        DeviceStatus::NotEnabled
    );

    // 记录中的在线/离线只作参考
    let stale = record(6, DeviceStatus::Online);
    assert_eq!(
        tracker
            .status
            .get_status_for_record(&stale)
            .await
            .expect("status"),
        DeviceStatus::Offline
    );
}

#[tokio::test]
async fn lookup_by_serial_number() {
    let (records, tracker) = tracker();
    records
        .upsert_with_sn("CPE-0001", record(21, DeviceStatus::Offline))
        .expect("upsert");
    records
        .upsert_with_sn("CPE-0002", record(22, DeviceStatus::NotEnabled))
        .expect("upsert");
    tracker.on_heartbeat(DeviceId::new(21)).await.expect("heartbeat");
    tracker.on_heartbeat(DeviceId::new(22)).await.expect("heartbeat");

    assert_eq!(
        tracker
            .status
            .get_status_by_external_key("CPE-0001")
            .await
            .expect("status"),
        DeviceStatus::Online
    );
    assert_eq!(
        tracker
            .status
            .get_status_by_external_key("unknown")
            .await
            .expect("status"),
        DeviceStatus::Offline
    );

    let info = tracker
        .status
        .resolve_device("CPE-0001")
        .await
        .expect("resolve")
        .expect("device");
    assert_eq!(info.id, DeviceId::new(21));
    assert_eq!(info.status, DeviceStatus::Online);

    let disabled = tracker
        .status
        .resolve_device("CPE-0002")
        .await
        .expect("resolve")
        .expect("device");
    assert_eq!(disabled.status, DeviceStatus::NotEnabled);

    assert!(tracker
        .status
        .resolve_device("unknown")
        .await
        .expect("resolve")
        .is_none());
}

struct UnreachableResolver;

#[async_trait::async_trait]
impl DeviceResolver for UnreachableResolver {
    async fn resolve(&self, _: &str) -> Result<Option<DeviceInfo>, StorageError> {
        Err(StorageError::new("connection refused"))
    }
}

#[tokio::test]
async fn resolver_failure_reads_as_offline() {
    let store = Arc::new(InMemoryPresenceStore::new());
    let window = Arc::new(PresenceWindowManager::new(
        store.clone(),
        store,
        PresenceSettings::new(Duration::from_secs(10), Duration::from_secs(30)),
    ));
    let facade = StatusQueryFacade::new(window.clone(), Arc::new(UnreachableResolver));
    window.mark_online(DeviceId::new(1)).await.expect("mark");

    assert_eq!(
        facade
            .get_status_by_external_key("CPE-0001")
            .await
            .expect("status"),
        DeviceStatus::Offline
    );
    assert!(facade
        .resolve_device("CPE-0001")
        .await
        .expect("resolve")
        .is_none());
}

#[tokio::test]
async fn invalid_settings_are_rejected() {
    let store = Arc::new(InMemoryPresenceStore::new());
    let records = Arc::new(InMemoryDeviceStatusStore::new());
    let resolver = Arc::new(CachedDeviceResolver::new(store.clone(), records.clone()));
    let result = PresenceTracker::new(
        store.clone(),
        store,
        records,
        resolver,
        PresenceSettings::new(Duration::ZERO, Duration::from_secs(30)),
    );
    assert!(result.is_err());
}
