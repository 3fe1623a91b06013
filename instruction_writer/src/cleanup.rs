//! Delivery of drained records to the upstream store.
//!
//! The batch processor calls `on_cleanup` synchronously, at most once per
//! batch, after the batch's spool file has been renamed into place and only
//! when at least one record drained. The upstream store must not delete a
//! record before it has been handed over here.

use core_types::CleanupRecord;

pub trait CleanupListener: Send + Sync {
    fn on_cleanup(&self, records: Vec<CleanupRecord>);
}

/// Queues cleanup sets on a `flume` channel for an async or blocking consumer.
#[derive(Clone)]
pub struct ChannelCleanupListener {
    tx: flume::Sender<Vec<CleanupRecord>>,
}

impl ChannelCleanupListener {
    pub fn new(tx: flume::Sender<Vec<CleanupRecord>>) -> Self {
        Self { tx }
    }

    /// Creates a listener together with the receiving end of an unbounded channel.
    pub fn unbounded() -> (Self, flume::Receiver<Vec<CleanupRecord>>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }
}

impl CleanupListener for ChannelCleanupListener {
    fn on_cleanup(&self, records: Vec<CleanupRecord>) {
        let count = records.len();
        if self.tx.send(records).is_err() {
            // records stay in the upstream store and are redelivered later
            tracing::warn!(count, "cleanup receiver dropped, cleanup records discarded");
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingCleanupListener;

#[cfg(any(test, feature = "test-util"))]
mod recording {
    use std::sync::{Arc, Mutex};

    use core_types::CleanupRecord;

    use super::CleanupListener;

    /// Keeps every cleanup set it receives, in order.
    #[derive(Clone, Default)]
    pub struct RecordingCleanupListener {
        received: Arc<Mutex<Vec<Vec<CleanupRecord>>>>,
    }

    impl RecordingCleanupListener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn received(&self) -> Vec<Vec<CleanupRecord>> {
            self.received.lock().unwrap().clone()
        }

        pub fn all_records(&self) -> Vec<CleanupRecord> {
            self.received().into_iter().flatten().collect()
        }
    }

    impl CleanupListener for RecordingCleanupListener {
        fn on_cleanup(&self, records: Vec<CleanupRecord>) {
            self.received.lock().unwrap().push(records);
        }
    }
}
