//! Shared replica bookkeeping for records that are in flight.
//!
//! A record is delivered once per storage node it lives on, and those
//! deliveries may be processed concurrently. Rather than sharing one mutable
//! record between batches, every batch looks its record up here by key and
//! mutates the stored entry under the store's lock.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use core_types::{CleanupRecord, ObjectSize, Record, StorageNodeRef};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub size: ObjectSize,
    pub remaining: Vec<StorageNodeRef>,
    /// Nodes released from `remaining` whose instruction file is not on disk
    /// yet. The record cannot drain while any are left.
    pub pending: Vec<StorageNodeRef>,
    pub cleaned: bool,
}

impl From<&Record> for RecordEntry {
    fn from(record: &Record) -> Self {
        Self {
            size: record.size,
            remaining: record.shards.clone(),
            pending: Vec::new(),
            cleaned: record.cleaned,
        }
    }
}

/// Removes the entry for `node` from `shards`. Nothing is removed when no
/// entry matches.
pub fn remove_shard_if_present(shards: &mut Vec<StorageNodeRef>, node: &str) -> bool {
    match shards.iter().position(|shard| shard.node == node) {
        Some(index) => {
            shards.remove(index);
            true
        }
        None => false,
    }
}

#[derive(Debug, Default)]
pub struct RecordStore {
    entries: Mutex<HashMap<String, RecordEntry>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RecordEntry>> {
        // a panic while holding the lock cannot leave an entry half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Tracks `record` unless its key is already known. Returns whether it was
    /// inserted.
    pub fn register(&self, record: &Record) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&record.key) {
            return false;
        }
        entries.insert(record.key.clone(), RecordEntry::from(record));
        true
    }

    /// Registers `record` if needed, then drops `node` from its remaining
    /// shards and holds it as pending until [`RecordStore::confirm_written`].
    /// Returns whether a shard was removed.
    pub fn release(&self, record: &Record, node: &str) -> bool {
        let mut entries = self.lock();
        let entry = entries
            .entry(record.key.clone())
            .or_insert_with(|| RecordEntry::from(record));
        let removed = remove_shard_if_present(&mut entry.remaining, node);
        if removed && !entry.pending.iter().any(|shard| shard.node == node) {
            entry.pending.push(StorageNodeRef::new(node));
        }
        removed
    }

    /// Records that the instruction file for `node` is on disk. A release whose
    /// write failed stays pending until a later write for the same node
    /// succeeds. Returns whether a pending node was cleared.
    pub fn confirm_written(&self, key: &str, node: &str) -> bool {
        self.lock()
            .get_mut(key)
            .is_some_and(|entry| remove_shard_if_present(&mut entry.pending, node))
    }

    /// Marks the record cleaned and returns its cleanup record when every shard
    /// has been released and confirmed written. Returns `None` for unknown
    /// keys, records with shards left or pending, and records that were
    /// already cleaned.
    pub fn take_drained(&self, key: &str) -> Option<CleanupRecord> {
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        if entry.cleaned || !entry.remaining.is_empty() || !entry.pending.is_empty() {
            return None;
        }
        entry.cleaned = true;
        Some(CleanupRecord::drained(key, entry.size))
    }

    pub fn remaining(&self, key: &str) -> Option<Vec<StorageNodeRef>> {
        self.lock().get(key).map(|entry| entry.remaining.clone())
    }

    pub fn pending(&self, key: &str) -> Option<Vec<StorageNodeRef>> {
        self.lock().get(key).map(|entry| entry.pending.clone())
    }

    pub fn is_cleaned(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|entry| entry.cleaned)
    }

    /// Stops tracking `key`. Called once the upstream store has deleted the
    /// record.
    pub fn forget(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shards(nodes: &[&str]) -> Vec<StorageNodeRef> {
        nodes.iter().map(|n| StorageNodeRef::new(*n)).collect()
    }

    fn record(key: &str, nodes: &[&str]) -> Record {
        Record::new(
            key,
            10,
            shards(nodes),
            vec![Some("acct".into()), Some("obj".into())],
        )
    }

    #[test]
    fn test_remove_shard_if_present_exact_match() {
        let mut remaining = shards(&["s1", "s2", "s3"]);
        assert!(remove_shard_if_present(&mut remaining, "s2"));
        assert_eq!(remaining, shards(&["s1", "s3"]));
    }

    #[test]
    fn test_remove_shard_if_present_not_found_leaves_set_unchanged() {
        let mut remaining = shards(&["s1", "s2"]);
        assert!(!remove_shard_if_present(&mut remaining, "s9"));
        assert_eq!(remaining, shards(&["s1", "s2"]));

        let mut empty = Vec::new();
        assert!(!remove_shard_if_present(&mut empty, "s1"));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_register_keeps_existing_entry() {
        let store = RecordStore::new();
        assert!(store.register(&record("k1", &["s1", "s2"])));
        assert!(!store.register(&record("k1", &["s3"])));
        assert_eq!(store.remaining("k1"), Some(shards(&["s1", "s2"])));
    }

    #[test]
    fn test_drains_after_each_distinct_node_released() {
        let store = RecordStore::new();
        let rec = record("k1", &["s1", "s2", "s3"]);

        for node in ["s1", "s2"] {
            assert!(store.release(&rec, node));
            assert!(store.confirm_written("k1", node));
            assert_eq!(store.take_drained("k1"), None);
        }
        assert!(store.release(&rec, "s3"));
        assert!(store.confirm_written("k1", "s3"));

        assert_eq!(store.take_drained("k1"), Some(CleanupRecord::drained("k1", 10)));
        assert!(store.is_cleaned("k1"));
        // fires exactly once
        assert_eq!(store.take_drained("k1"), None);
    }

    #[test]
    fn test_repeated_release_of_same_node_does_not_drain() {
        let store = RecordStore::new();
        let rec = record("k1", &["s1", "s2"]);

        assert!(store.release(&rec, "s1"));
        assert!(!store.release(&rec, "s1"));

        assert_eq!(store.remaining("k1"), Some(shards(&["s2"])));
        assert_eq!(store.pending("k1"), Some(shards(&["s1"])));
        assert_eq!(store.take_drained("k1"), None);
    }

    #[test]
    fn test_unconfirmed_release_blocks_drain() {
        let store = RecordStore::new();
        let rec = record("k1", &["s1", "s2"]);

        // s1 released but its write failed, s2 written
        assert!(store.release(&rec, "s1"));
        assert!(store.release(&rec, "s2"));
        assert!(store.confirm_written("k1", "s2"));

        assert_eq!(store.remaining("k1"), Some(vec![]));
        assert_eq!(store.pending("k1"), Some(shards(&["s1"])));
        assert_eq!(store.take_drained("k1"), None);
        assert!(!store.is_cleaned("k1"));

        // redelivered s1 finds no shard to release but its write confirms it
        assert!(!store.release(&rec, "s1"));
        assert!(store.confirm_written("k1", "s1"));
        assert_eq!(store.take_drained("k1"), Some(CleanupRecord::drained("k1", 10)));
    }

    #[test]
    fn test_confirm_written_for_unknown_key_or_node() {
        let store = RecordStore::new();
        assert!(!store.confirm_written("k1", "s1"));

        store.register(&record("k1", &["s1"]));
        assert!(!store.confirm_written("k1", "s1"));
        assert_eq!(store.remaining("k1"), Some(shards(&["s1"])));
    }

    #[test]
    fn test_record_delivered_already_cleaned_never_drains() {
        let store = RecordStore::new();
        let mut rec = record("k1", &["s1"]);
        rec.cleaned = true;

        store.release(&rec, "s1");
        assert_eq!(store.take_drained("k1"), None);
    }

    #[test]
    fn test_forget() {
        let store = RecordStore::new();
        store.register(&record("k1", &["s1"]));
        assert_eq!(store.len(), 1);
        assert!(store.forget("k1"));
        assert!(!store.forget("k1"));
        assert!(store.is_empty());
        assert_eq!(store.take_drained("k1"), None);
    }
}
