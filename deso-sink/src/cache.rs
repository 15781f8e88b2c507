// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! An advisory cache of the last encoder bytes seen per upstream key.
//!
//! Updates are staged: a batch stages what it wrote, and the stage only reaches the
//! cache once the batch succeeded and, if a store transaction was open, once it
//! committed. A batch that is rolled back can therefore never cause a later identical
//! entry to be skipped.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Number of keys kept by default.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

pub struct EntryCache {
    cache: LruCache<String, Vec<u8>>,
    batch: Vec<(String, Vec<u8>)>,
    transaction: Vec<(String, Vec<u8>)>,
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN.saturating_add(DEFAULT_CAPACITY - 1))
    }
}

impl EntryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            batch: Vec::new(),
            transaction: Vec::new(),
        }
    }

    fn cache_key(key: &[u8]) -> String {
        hex::encode(key)
    }

    /// Whether `encoder_bytes` equals the last bytes recorded for `key`, including
    /// updates of the open store transaction.
    pub fn is_unchanged(&mut self, key: &[u8], encoder_bytes: &[u8]) -> bool {
        let key = Self::cache_key(key);
        if let Some((_, staged)) = self.transaction.iter().rev().find(|(staged, _)| *staged == key) {
            return staged == encoder_bytes;
        }
        self.cache
            .get(&key)
            .is_some_and(|cached| cached == encoder_bytes)
    }

    /// Stages an update of the running batch.
    pub fn stage(&mut self, key: &[u8], encoder_bytes: &[u8]) {
        self.batch
            .push((Self::cache_key(key), encoder_bytes.to_vec()));
    }

    /// Ends the running batch. Staged updates are dropped on failure, held until the
    /// end of the store transaction if one is open, and applied otherwise.
    pub fn finish_batch(&mut self, success: bool, in_transaction: bool) {
        let staged = std::mem::take(&mut self.batch);
        if !success {
            return;
        }
        if in_transaction {
            self.transaction.extend(staged);
        } else {
            self.apply(staged);
        }
    }

    pub fn commit(&mut self) {
        let staged = std::mem::take(&mut self.transaction);
        self.apply(staged);
    }

    pub fn rollback(&mut self) {
        self.transaction.clear();
    }

    fn apply(&mut self, staged: Vec<(String, Vec<u8>)>) {
        for (key, bytes) in staged {
            self.cache.put(key, bytes);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> EntryCache {
        EntryCache::new(NonZeroUsize::new(2).unwrap())
    }

    #[test]
    fn test_batches_outside_transactions_apply_immediately() {
        let mut cache = cache();
        assert!(!cache.is_unchanged(b"k", b"v"));
        cache.stage(b"k", b"v");
        assert!(!cache.is_unchanged(b"k", b"v"));
        cache.finish_batch(true, false);
        assert!(cache.is_unchanged(b"k", b"v"));
        assert!(!cache.is_unchanged(b"k", b"w"));
    }

    #[test]
    fn test_failed_batches_are_dropped() {
        let mut cache = cache();
        cache.stage(b"k", b"v");
        cache.finish_batch(false, false);
        assert!(!cache.is_unchanged(b"k", b"v"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_transaction_stage_follows_commit_and_rollback() {
        let mut cache = cache();
        cache.stage(b"k", b"v");
        cache.finish_batch(true, true);
        assert!(cache.is_unchanged(b"k", b"v"));
        cache.rollback();
        assert!(!cache.is_unchanged(b"k", b"v"));

        cache.stage(b"k", b"w");
        cache.finish_batch(true, true);
        cache.commit();
        assert!(cache.is_unchanged(b"k", b"w"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_least_recent_keys() {
        let mut cache = cache();
        for key in [b"a", b"b", b"c"] {
            cache.stage(key, b"v");
        }
        cache.finish_batch(true, false);
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_unchanged(b"a", b"v"));
        assert!(cache.is_unchanged(b"c", b"v"));
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(EntryCache::default().cache.cap().get(), DEFAULT_CAPACITY);
    }
}
