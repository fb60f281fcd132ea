//! 位图与键值单元的内存实现（用于测试与本地运行）。
//!
//! 与 Redis 共享同一键空间语义：位图与单元同名时互相覆盖，
//! 过期时间基于 `tokio::time::Instant`，在暂停时钟的测试中同样生效。

use crate::error::StorageError;
use crate::traits::{BitsetStore, CellStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Bits(BTreeSet<u64>),
    Text(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

pub struct InMemoryPresenceStore {
    entries: RwLock<HashMap<String, Entry>>,
    max_offset: u64,
}

impl Default for InMemoryPresenceStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_offset: u64::MAX,
        }
    }
}

impl InMemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制 bit 偏移量上限（模拟 Redis 的 2^32 - 1 限制）。
    pub fn with_max_offset(mut self, max_offset: u64) -> Self {
        self.max_offset = max_offset;
        self
    }

    fn ensure_offset(&self, offset: u64) -> Result<u64, StorageError> {
        if offset > self.max_offset {
            return Err(StorageError::new(format!(
                "bit offset {} exceeds limit {}",
                offset, self.max_offset
            )));
        }
        Ok(offset)
    }

    fn write_bit<'a>(
        map: &'a mut HashMap<String, Entry>,
        key: &str,
        offset: u64,
        value: bool,
        now: Instant,
    ) -> Result<&'a mut Entry, StorageError> {
        let entry = map.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Bits(BTreeSet::new()),
            expires_at: None,
        });
        if !entry.is_live(now) {
            *entry = Entry {
                value: Value::Bits(BTreeSet::new()),
                expires_at: None,
            };
        }
        let Value::Bits(bits) = &mut entry.value else {
            return Err(wrong_type(key));
        };
        if value {
            bits.insert(offset);
        } else {
            bits.remove(&offset);
        }
        Ok(entry)
    }

    /// 当前仍存活的键数量（测试辅助）。
    pub fn live_keys(&self) -> Result<Vec<String>, StorageError> {
        let now = Instant::now();
        let map = self
            .entries
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut keys: Vec<String> = map
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn read_live<T>(
        &self,
        key: &str,
        read: impl FnOnce(Option<&Value>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let now = Instant::now();
        let map = self
            .entries
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let value = map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| &entry.value);
        read(value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.remove(key).is_some_and(|entry| entry.is_live(now)))
    }
}

fn wrong_type(key: &str) -> StorageError {
    StorageError::new(format!("key {} holds the wrong kind of value", key))
}

#[async_trait::async_trait]
impl BitsetStore for InMemoryPresenceStore {
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool, StorageError> {
        let offset = self.ensure_offset(offset)?;
        self.read_live(key, |value| match value {
            None => Ok(false),
            Some(Value::Bits(bits)) => Ok(bits.contains(&offset)),
            Some(Value::Text(_)) => Err(wrong_type(key)),
        })
    }

    async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StorageError> {
        for offset in offsets {
            self.ensure_offset(*offset)?;
        }
        self.read_live(key, |value| match value {
            None => Ok(vec![false; offsets.len()]),
            Some(Value::Bits(bits)) => Ok(offsets.iter().map(|o| bits.contains(o)).collect()),
            Some(Value::Text(_)) => Err(wrong_type(key)),
        })
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<(), StorageError> {
        let offset = self.ensure_offset(offset)?;
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Self::write_bit(&mut map, key, offset, value, now)?;
        Ok(())
    }

    async fn set_bit_in_all(
        &self,
        keys: &[String],
        offset: u64,
        value: bool,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let offset = self.ensure_offset(offset)?;
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for key in keys {
            let entry = Self::write_bit(&mut map, key, offset, value, now)?;
            entry.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn count_bits(&self, key: &str) -> Result<u64, StorageError> {
        self.read_live(key, |value| match value {
            None => Ok(0),
            Some(Value::Bits(bits)) => Ok(bits.len() as u64),
            Some(Value::Text(_)) => Err(wrong_type(key)),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.remove(key)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if let Some(entry) = map.get_mut(key).filter(|entry| entry.is_live(now)) {
            entry.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    fn max_offset(&self) -> u64 {
        self.max_offset
    }
}

#[async_trait::async_trait]
impl CellStore for InMemoryPresenceStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if map.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.read_live(key, |value| match value {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::Bits(_)) => Err(wrong_type(key)),
        })
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.remove(key)
    }

    async fn incr(&self, key: &str) -> Result<i64, StorageError> {
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let (current, expires_at) = match map.get(key).filter(|entry| entry.is_live(now)) {
            None => (0, None),
            Some(Entry {
                value: Value::Text(text),
                expires_at,
            }) => {
                let current = text
                    .parse::<i64>()
                    .map_err(|_| StorageError::new(format!("key {} is not an integer", key)))?;
                (current, *expires_at)
            }
            Some(_) => return Err(wrong_type(key)),
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::new(format!("increment on key {} would overflow", key)))?;
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Text(next.to_string()),
                expires_at,
            },
        );
        Ok(next)
    }
}
