//! Concurrent set answering "first time seen?" exactly once per key.

use std::{
    collections::HashSet,
    hash::{BuildHasher, Hash, RandomState},
    sync::{Mutex, PoisonError},
};

use wikigeo_core::EntityId;

const SHARD_BITS: u32 = 4;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u64 = (1 << SHARD_BITS) - 1;

/// Thread-safe membership set for one ingestion run.
///
/// Keys are spread over independently locked shards so workers rarely
/// contend. The insert is the test: for any key, exactly one caller of
/// [`DedupSet::test_and_insert`] observes `true`.
///
/// # Examples
/// ```
/// use wikigeo_core::EntityId;
/// use wikigeo_data::ingest::DedupSet;
///
/// let seen = DedupSet::new();
/// assert!(seen.test_and_insert(EntityId::new(42)));
/// assert!(!seen.test_and_insert(EntityId::new(42)));
/// assert_eq!(seen.len(), 1);
/// ```
#[derive(Debug)]
pub struct DedupSet<K = EntityId> {
    shards: [Mutex<HashSet<K>>; SHARD_COUNT],
    hasher: RandomState,
}

impl<K: Eq + Hash> DedupSet<K> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(HashSet::new())),
            hasher: RandomState::new(),
        }
    }

    /// Insert `key`, returning `true` only if it was absent.
    pub fn test_and_insert(&self, key: K) -> bool {
        let shard = self.shard_for(&key);
        let mut members = shard.lock().unwrap_or_else(PoisonError::into_inner);
        members.insert(key)
    }

    /// Number of distinct keys inserted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Return `true` when nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_for(&self, key: &K) -> &Mutex<HashSet<K>> {
        let [first, ..] = &self.shards;
        usize::try_from(self.hasher.hash_one(key) & SHARD_MASK)
            .ok()
            .and_then(|index| self.shards.get(index))
            .unwrap_or(first)
    }
}

impl<K: Eq + Hash> Default for DedupSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
