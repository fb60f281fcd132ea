use domain::DeviceId;
use presence_storage::{BitsetStore, CellStore, InMemoryPresenceStore, StorageError};
use presence_tracker::{
    DEFAULT_WINDOW_INDEX, PresenceError, PresenceSettings, PresenceWindowManager,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn manager(
    window_secs: u64,
    heartbeat_secs: u64,
) -> (Arc<InMemoryPresenceStore>, PresenceWindowManager) {
    let store = Arc::new(InMemoryPresenceStore::new());
    let settings = PresenceSettings::new(
        Duration::from_secs(window_secs),
        Duration::from_secs(heartbeat_secs),
    );
    let manager = PresenceWindowManager::new(store.clone(), store.clone(), settings);
    (store, manager)
}

async fn rotate(manager: &PresenceWindowManager) -> u64 {
    let retired = manager.advance().await.expect("advance");
    manager.retire(retired).await.expect("retire");
    retired
}

#[tokio::test]
async fn heartbeat_stays_visible_for_one_interval() {
    let (store, manager) = manager(10, 30);
    let device = DeviceId::new(42);
    assert_eq!(manager.windows_per_heartbeat(), 3);
    assert_eq!(manager.current_index().await.expect("index"), 1);

    // t=0
    manager.mark_online(device).await.expect("mark");
    for index in 1..=3 {
        let key = format!("device_status:bitset_{}", index);
        assert!(store.get_bit(&key, 42).await.expect("bit"), "window {}", index);
    }
    assert!(!store
        .get_bit("device_status:bitset_4", 42)
        .await
        .expect("bit"));
    assert!(manager.is_online(device).await.expect("online"));

    // t=10
    assert_eq!(rotate(&manager).await, 1);
    assert_eq!(manager.current_index().await.expect("index"), 2);
    assert!(manager.is_online(device).await.expect("online"));

    // t=20，t=29 仍在同一窗口
    assert_eq!(rotate(&manager).await, 2);
    assert_eq!(manager.current_index().await.expect("index"), 3);
    assert!(manager.is_online(device).await.expect("online"));

    // t=30
    assert_eq!(rotate(&manager).await, 3);
    assert_eq!(manager.current_index().await.expect("index"), 4);
    assert!(!manager.is_online(device).await.expect("online"));
    assert_eq!(
        store.live_keys().expect("keys"),
        vec!["device_status:bitset_index".to_string()]
    );
}

#[tokio::test]
async fn heartbeat_shorter_than_window_writes_one_window() {
    let (store, manager) = manager(10, 5);
    assert_eq!(manager.windows_per_heartbeat(), 1);
    manager.mark_online(DeviceId::new(1)).await.expect("mark");
    assert_eq!(
        store.live_keys().expect("keys"),
        vec!["device_status:bitset_1".to_string()]
    );
}

#[tokio::test]
async fn mark_online_is_idempotent_and_count_is_exact() {
    let (_store, manager) = manager(10, 30);
    for id in [1u64, 2, 3, 2, 1] {
        manager.mark_online(DeviceId::new(id)).await.expect("mark");
    }
    assert_eq!(manager.count_online().await.expect("count"), 3);

    manager.mark_offline(DeviceId::new(2)).await.expect("offline");
    assert_eq!(manager.count_online().await.expect("count"), 2);
    assert!(!manager.is_online(DeviceId::new(2)).await.expect("online"));
}

#[tokio::test]
async fn advance_is_strictly_increasing() {
    let (_store, manager) = manager(10, 30);
    let mut previous = manager.current_index().await.expect("index");
    for _ in 0..5 {
        let retired = manager.advance().await.expect("advance");
        assert_eq!(retired, previous);
        let current = manager.current_index().await.expect("index");
        assert_eq!(current, previous + 1);
        previous = current;
    }
}

#[tokio::test]
async fn non_positive_index_reads_as_default() {
    let (store, manager) = manager(10, 30);
    store
        .set("device_status:bitset_index", "0", None)
        .await
        .expect("seed");
    assert_eq!(
        manager.current_index().await.expect("index"),
        DEFAULT_WINDOW_INDEX
    );
    assert_eq!(manager.advance().await.expect("advance"), DEFAULT_WINDOW_INDEX);
    assert_eq!(manager.current_index().await.expect("index"), 2);

    store
        .set("device_status:bitset_index", "garbage", None)
        .await
        .expect("seed");
    assert!(matches!(
        manager.current_index().await,
        Err(PresenceError::CorruptIndex(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn windows_carry_safety_ttl() {
    let store = Arc::new(InMemoryPresenceStore::new());
    let mut settings = PresenceSettings::new(Duration::from_secs(10), Duration::from_secs(30));
    settings.window_safety_ttl = Duration::from_secs(60);
    let manager = PresenceWindowManager::new(store.clone(), store.clone(), settings);

    manager.mark_online(DeviceId::new(9)).await.expect("mark");
    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(manager.is_online(DeviceId::new(9)).await.expect("online"));
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!manager.is_online(DeviceId::new(9)).await.expect("online"));
}

#[tokio::test]
async fn clear_all_resets_index_and_count() {
    let (store, manager) = manager(10, 30);
    manager.mark_online(DeviceId::new(5)).await.expect("mark");
    manager.advance().await.expect("advance");
    manager.mark_online(DeviceId::new(6)).await.expect("mark");
    store
        .set_if_absent(
            "device_status:bitset_change_lock",
            "owner",
            Some(Duration::from_secs(10)),
        )
        .await
        .expect("lock");

    manager.clear_all().await.expect("clear");

    assert_eq!(
        manager.current_index().await.expect("index"),
        DEFAULT_WINDOW_INDEX
    );
    assert_eq!(manager.count_online().await.expect("count"), 0);
    assert!(store.live_keys().expect("keys").is_empty());

    // 清空后的第一次轮转不会看到旧数据
    manager.advance().await.expect("advance");
    assert_eq!(manager.count_online().await.expect("count"), 0);
}

struct FailingDeletes {
    inner: InMemoryPresenceStore,
    failing_key: String,
}

#[async_trait::async_trait]
impl BitsetStore for FailingDeletes {
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool, StorageError> {
        self.inner.get_bit(key, offset).await
    }

    async fn get_bits(
        &self,
        key: &str,
        offsets: &[u64],
    ) -> Result<Vec<bool>, StorageError> {
        self.inner.get_bits(key, offsets).await
    }

    async fn set_bit(
        &self,
        key: &str,
        offset: u64,
        value: bool,
    ) -> Result<(), StorageError> {
        self.inner.set_bit(key, offset, value).await
    }

    async fn set_bit_in_all(
        &self,
        keys: &[String],
        offset: u64,
        value: bool,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.inner.set_bit_in_all(keys, offset, value, ttl).await
    }

    async fn count_bits(&self, key: &str) -> Result<u64, StorageError> {
        self.inner.count_bits(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if key == self.failing_key {
            return Err(StorageError::new("connection reset"));
        }
        BitsetStore::delete(&self.inner, key).await
    }

    async fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.inner.expire(key, ttl).await
    }
}

#[tokio::test]
async fn clear_all_reports_partial_failure_without_rollback() {
    let cells = Arc::new(InMemoryPresenceStore::new());
    let bits = Arc::new(FailingDeletes {
        inner: InMemoryPresenceStore::new(),
        failing_key: "device_status:bitset_2".to_string(),
    });
    let settings = PresenceSettings::new(Duration::from_secs(10), Duration::from_secs(30));
    let manager = PresenceWindowManager::new(bits.clone(), cells.clone(), settings);
    manager.mark_online(DeviceId::new(1)).await.expect("mark");

    let result = manager.clear_all().await;
    assert!(matches!(
        result,
        Err(PresenceError::PartialClear {
            failed: 1,
            attempted: 6
        })
    ));
    // 其余删除照常生效
    assert!(!bits
        .get_bit("device_status:bitset_1", 1)
        .await
        .expect("bit"));
    assert!(bits
        .get_bit("device_status:bitset_2", 1)
        .await
        .expect("bit"));
    assert_eq!(
        manager.current_index().await.expect("index"),
        DEFAULT_WINDOW_INDEX
    );
}

#[tokio::test]
async fn clear_all_recovers_from_corrupt_index() {
    let (store, manager) = manager(10, 30);
    manager.mark_online(DeviceId::new(3)).await.expect("mark");
    store
        .set_if_absent(
            "device_status:bitset_change_lock",
            "owner",
            Some(Duration::from_secs(10)),
        )
        .await
        .expect("lock");
    store
        .set("device_status:bitset_index", "garbage", None)
        .await
        .expect("seed");
    assert!(manager.mark_online(DeviceId::new(3)).await.is_err());

    let result = manager.clear_all().await;
    assert!(matches!(
        result,
        Err(PresenceError::PartialClear {
            failed: 1,
            attempted: 7
        })
    ));
    assert!(store.live_keys().expect("keys").is_empty());
    assert_eq!(
        manager.current_index().await.expect("index"),
        DEFAULT_WINDOW_INDEX
    );

    // 重置后心跳与推进恢复正常
    manager.mark_online(DeviceId::new(3)).await.expect("mark");
    assert_eq!(manager.advance().await.expect("advance"), 1);
    assert!(manager.is_online(DeviceId::new(3)).await.expect("online"));
}

/// 记录批量写入次数；可选地在写入前模拟一次轮转（推进索引并退役旧窗口）。
struct InstrumentedBits {
    inner: Arc<InMemoryPresenceStore>,
    batch_writes: AtomicUsize,
    single_writes: AtomicUsize,
    rotate_before_write: AtomicBool,
}

impl InstrumentedBits {
    fn new(inner: Arc<InMemoryPresenceStore>) -> Self {
        Self {
            inner,
            batch_writes: AtomicUsize::new(0),
            single_writes: AtomicUsize::new(0),
            rotate_before_write: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl BitsetStore for InstrumentedBits {
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool, StorageError> {
        self.inner.get_bit(key, offset).await
    }

    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StorageError> {
        self.inner.get_bits(key, offsets).await
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<(), StorageError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_bit(key, offset, value).await
    }

    async fn set_bit_in_all(
        &self,
        keys: &[String],
        offset: u64,
        value: bool,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.batch_writes.fetch_add(1, Ordering::SeqCst);
        if self.rotate_before_write.swap(false, Ordering::SeqCst) {
            self.inner
                .set_if_absent("device_status:bitset_index", "1", None)
                .await?;
            let next = self.inner.incr("device_status:bitset_index").await?;
            BitsetStore::delete(&*self.inner, &format!("device_status:bitset_{}", next - 1))
                .await?;
        }
        self.inner.set_bit_in_all(keys, offset, value, ttl).await
    }

    async fn count_bits(&self, key: &str) -> Result<u64, StorageError> {
        self.inner.count_bits(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        BitsetStore::delete(&*self.inner, key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.expire(key, ttl).await
    }
}

#[tokio::test]
async fn heartbeat_is_a_single_batched_write() {
    let store = Arc::new(InMemoryPresenceStore::new());
    let bits = Arc::new(InstrumentedBits::new(store.clone()));
    let settings = PresenceSettings::new(Duration::from_secs(60), Duration::from_secs(1800));
    let manager = PresenceWindowManager::new(bits.clone(), store.clone(), settings);
    assert_eq!(manager.windows_per_heartbeat(), 30);

    assert_eq!(manager.mark_online(DeviceId::new(8)).await.expect("mark"), 1);
    assert_eq!(bits.batch_writes.load(Ordering::SeqCst), 1);
    assert_eq!(bits.single_writes.load(Ordering::SeqCst), 0);
    assert_eq!(store.live_keys().expect("keys").len(), 30);
}

#[tokio::test]
async fn write_racing_rotation_does_not_revive_retired_window() {
    let store = Arc::new(InMemoryPresenceStore::new());
    let bits = Arc::new(InstrumentedBits::new(store.clone()));
    let settings = PresenceSettings::new(Duration::from_secs(10), Duration::from_secs(30));
    let manager = PresenceWindowManager::new(bits.clone(), store.clone(), settings);

    bits.rotate_before_write.store(true, Ordering::SeqCst);
    assert_eq!(manager.mark_online(DeviceId::new(4)).await.expect("mark"), 1);

    assert_eq!(manager.current_index().await.expect("index"), 2);
    assert!(manager.is_online(DeviceId::new(4)).await.expect("online"));
    assert_eq!(
        store.live_keys().expect("keys"),
        vec![
            "device_status:bitset_2".to_string(),
            "device_status:bitset_3".to_string(),
            "device_status:bitset_index".to_string(),
        ]
    );
}
