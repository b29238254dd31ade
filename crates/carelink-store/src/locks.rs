use carelink_core::ContractId;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use and dropped with the last
/// guard or waiter.
///
/// Guards may be held across `.await`. Keys never contend with each other.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

/// Exclusive access to one key of a [`KeyedLocks`] table.
///
/// Dropping the guard releases the key and removes its table entry when
/// nobody else holds or waits on it.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyGuard<'a, K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table's own reference is the only one left once every holder
        // and waiter is gone.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard<'_, K> {
        let mutex = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let guard = mutex.lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key: key.clone(),
            locks: &self.locks,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no key is held or awaited.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock tables owned by a repository and shared by every service on it.
///
/// Contract locks serialize read-modify-write cycles on one contract,
/// including the anchor call made while activating it. Reference locks
/// serialize idempotent credits keyed by an external reference.
#[derive(Debug, Default)]
pub struct RepositoryLocks {
    contracts: KeyedLocks<ContractId>,
    references: KeyedLocks<String>,
}

impl RepositoryLocks {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-contract locks.
    pub fn contracts(&self) -> &KeyedLocks<ContractId> {
        &self.contracts
    }

    /// Per-reference locks.
    pub fn references(&self) -> &KeyedLocks<String> {
        &self.references
    }
}
