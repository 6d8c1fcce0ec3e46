//! Typed snapshots used to roll back optimistic writes.

use super::keys::QueryKey;
use super::store::QueryCache;

/// The value a key held before an optimistic write.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    key: QueryKey,
    value: T,
}

impl<T: Clone + Send + Sync + 'static> Snapshot<T> {
    pub(crate) fn new(key: QueryKey, value: T) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn restore(self, cache: &QueryCache) {
        cache.set(self.key, self.value);
    }
}

/// Anything that can undo an optimistic write.
pub trait Rollback: Send {
    fn rollback(self, cache: &QueryCache);
}

impl<T: Clone + Send + Sync + 'static> Rollback for Snapshot<T> {
    fn rollback(self, cache: &QueryCache) {
        self.restore(cache);
    }
}

impl Rollback for () {
    fn rollback(self, _cache: &QueryCache) {}
}

impl<R: Rollback> Rollback for Option<R> {
    fn rollback(self, cache: &QueryCache) {
        if let Some(inner) = self {
            inner.rollback(cache);
        }
    }
}

impl<R: Rollback> Rollback for Vec<R> {
    fn rollback(self, cache: &QueryCache) {
        for inner in self {
            inner.rollback(cache);
        }
    }
}

impl<A: Rollback, B: Rollback> Rollback for (A, B) {
    fn rollback(self, cache: &QueryCache) {
        self.0.rollback(cache);
        self.1.rollback(cache);
    }
}
