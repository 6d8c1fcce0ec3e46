//! Query cache storage.
//!
//! One LRU map from structural keys to type-erased entries. Values are
//! stored behind `Arc<dyn Any>` and read back by cloning the concrete type;
//! a read with the wrong type behaves like a miss.

use std::any::Any;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::QueryKey;
use super::lock::{rw_read, rw_write};
use super::snapshot::Snapshot;

const SOURCE: &str = "cache::store";

type Value = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
}

struct CacheEntry {
    value: Option<Value>,
    status: FetchStatus,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            value: None,
            status: FetchStatus::Idle,
            updated_at: None,
            invalidated: false,
            generation: 0,
        }
    }

    fn with_value(value: Value) -> Self {
        let mut entry = Self::empty();
        entry.store(value);
        entry
    }

    fn store(&mut self, value: Value) {
        self.value = Some(value);
        self.updated_at = Some(Instant::now());
        self.invalidated = false;
    }

    fn typed<T: Clone + 'static>(&self) -> Option<T> {
        self.value.as_ref()?.downcast_ref::<T>().cloned()
    }
}

/// Metadata of one entry, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryState {
    pub status: FetchStatus,
    pub has_value: bool,
    pub invalidated: bool,
    pub updated_at: Option<Instant>,
}

/// Proof that a fetch started; completing with a stale ticket is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

pub struct QueryCache {
    entries: RwLock<LruCache<QueryKey, CacheEntry>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Typed read that also marks the entry as recently used.
    pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        rw_write(&self.entries, SOURCE, "get")
            .get(key)
            .and_then(CacheEntry::typed)
    }

    /// Typed read without touching recency.
    pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        rw_read(&self.entries, SOURCE, "peek")
            .peek(key)
            .and_then(CacheEntry::typed)
    }

    /// True when a value is stored under `key`.
    pub fn contains(&self, key: &QueryKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains")
            .peek(key)
            .is_some_and(|entry| entry.value.is_some())
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        rw_read(&self.entries, SOURCE, "state")
            .peek(key)
            .map(|entry| EntryState {
                status: entry.status,
                has_value: entry.value.is_some(),
                invalidated: entry.invalidated,
                updated_at: entry.updated_at,
            })
    }

    pub fn is_invalidated(&self, key: &QueryKey) -> bool {
        self.state(key).is_some_and(|state| state.invalidated)
    }

    /// A value is fresh while it is present, not invalidated, and younger
    /// than `stale_time`.
    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.state(key).is_some_and(|state| {
            state.has_value
                && !state.invalidated
                && state
                    .updated_at
                    .is_some_and(|at| at.elapsed() < stale_time)
        })
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        let value: Value = Arc::new(value);
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        if let Some(entry) = entries.get_mut(&key) {
            entry.store(value);
            return;
        }
        if let Some((evicted, _)) = entries.push(key, CacheEntry::with_value(value)) {
            counter!("tessera_cache_evict_total").increment(1);
            debug!(key = %evicted, "Evicted cache entry");
        }
    }

    /// Edit a stored value in place. Returns false when `key` holds no value
    /// of type `T`.
    pub fn update<T, F>(&self, key: &QueryKey, edit: F) -> bool
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&mut T),
    {
        let mut entries = rw_write(&self.entries, SOURCE, "update");
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        let Some(mut value) = entry.typed::<T>() else {
            return false;
        };
        edit(&mut value);
        entry.store(Arc::new(value));
        true
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        rw_write(&self.entries, SOURCE, "remove").pop(key).is_some()
    }

    /// Remove every entry under `prefix`.
    pub fn remove_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "remove_prefix");
        let doomed: Vec<QueryKey> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        debug!(prefix = %prefix, removed = doomed.len(), "Removed cache entries");
        doomed.len()
    }

    /// Mark every entry under `prefix` as invalidated; the next read of each
    /// one refetches.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate");
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        counter!("tessera_cache_invalidated_total").increment(count as u64);
        debug!(prefix = %prefix, count, "Invalidated cache entries");
        count
    }

    /// Cancel fetches under `prefix`: their results will be discarded.
    pub fn cancel(&self, prefix: &QueryKey) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "cancel");
        let mut cancelled = 0;
        for (key, entry) in entries.iter_mut() {
            if !key.starts_with(prefix) {
                continue;
            }
            entry.generation = entry.generation.wrapping_add(1);
            if entry.status == FetchStatus::Fetching {
                entry.status = FetchStatus::Idle;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(prefix = %prefix, cancelled, "Cancelled in-flight fetches");
        }
        cancelled
    }

    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let mut entries = rw_write(&self.entries, SOURCE, "begin_fetch");
        if !entries.contains(key) {
            if let Some((evicted, _)) = entries.push(key.clone(), CacheEntry::empty()) {
                counter!("tessera_cache_evict_total").increment(1);
                debug!(key = %evicted, "Evicted cache entry");
            }
        }
        let generation = match entries.get_mut(key) {
            Some(entry) => {
                entry.status = FetchStatus::Fetching;
                entry.generation
            }
            None => 0,
        };
        FetchTicket {
            key: key.clone(),
            generation,
        }
    }

    /// Store a fetched value unless the fetch was cancelled meanwhile.
    pub fn complete_fetch<T: Send + Sync + 'static>(&self, ticket: &FetchTicket, value: T) -> bool {
        let value: Value = Arc::new(value);
        let mut entries = rw_write(&self.entries, SOURCE, "complete_fetch");
        match entries.get_mut(&ticket.key) {
            Some(entry) if entry.generation != ticket.generation => {
                debug!(key = %ticket.key, "Discarded cancelled fetch");
                false
            }
            Some(entry) => {
                entry.store(value);
                entry.status = FetchStatus::Idle;
                true
            }
            None => {
                entries.push(ticket.key.clone(), CacheEntry::with_value(value));
                true
            }
        }
    }

    pub fn fail_fetch(&self, ticket: &FetchTicket) {
        let mut entries = rw_write(&self.entries, SOURCE, "fail_fetch");
        if let Some(entry) = entries.get_mut(&ticket.key) {
            if entry.generation == ticket.generation {
                entry.status = FetchStatus::Idle;
            }
        }
    }

    pub fn keys_with_prefix(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        rw_read(&self.entries, SOURCE, "keys_with_prefix")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Copy of the value under `key`, or `None` when nothing of type `T` is
    /// stored there.
    pub fn snapshot<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Snapshot<T>> {
        self.peek::<T>(key)
            .map(|value| Snapshot::new(key.clone(), value))
    }

    /// Snapshots of every `T` value under `prefix`.
    pub fn snapshot_prefix<T: Clone + Send + Sync + 'static>(
        &self,
        prefix: &QueryKey,
    ) -> Vec<Snapshot<T>> {
        rw_read(&self.entries, SOURCE, "snapshot_prefix")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, entry)| {
                entry
                    .typed::<T>()
                    .map(|value| Snapshot::new(key.clone(), value))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}
