use serde::{Deserialize, Serialize};

pub mod events;

pub use events::{ControlSignal, LifecycleEvent, WriterDescription, WriterState};

pub type ObjectSize = u64;

/// Tag written as the first column of every instruction line.
pub const MAKO_TAG: &str = "mako";

/// One physical replica location ("shark") holding a copy of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageNodeRef {
    pub node: String,
}

impl StorageNodeRef {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl From<&str> for StorageNodeRef {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

/// A pending-deletion decision for one object.
///
/// `shards` lists the storage nodes that still hold a copy and have not yet had
/// an instruction written for them. `fields` are copied verbatim into the
/// instruction line; by convention the first two are the account and object
/// identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub size: ObjectSize,
    #[serde(default)]
    pub shards: Vec<StorageNodeRef>,
    #[serde(default)]
    pub fields: Vec<Option<String>>,
    #[serde(default)]
    pub cleaned: bool,
}

impl Record {
    pub fn new(
        key: impl Into<String>,
        size: ObjectSize,
        shards: Vec<StorageNodeRef>,
        fields: Vec<Option<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            size,
            shards,
            fields,
            cleaned: false,
        }
    }

    /// True when the account or object identifier (the first two content
    /// fields) is absent, null or empty.
    pub fn is_missing_identifiers(&self) -> bool {
        (0..2).any(|i| {
            self.fields
                .get(i)
                .and_then(|f| f.as_deref())
                .is_none_or(str::is_empty)
        })
    }
}

/// One delivery of records targeted at a single storage node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionBatch {
    pub node: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl InstructionBatch {
    pub fn new(node: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            node: node.into(),
            records,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key.clone()).collect()
    }
}

/// Evidence that a record has been flushed to every storage node it lived on
/// and may now be removed from the upstream store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupRecord {
    pub key: String,
    pub size: ObjectSize,
    pub shards: Vec<StorageNodeRef>,
}

impl CleanupRecord {
    pub fn drained(key: impl Into<String>, size: ObjectSize) -> Self {
        Self {
            key: key.into(),
            size,
            shards: Vec::new(),
        }
    }
}
