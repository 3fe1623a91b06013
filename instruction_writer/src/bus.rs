//! Subscription point between the upstream producer and the batch processor.
//!
//! The lifecycle state machine installs the processor on entering `Running`
//! and removes it on leaving. A batch dispatched while nothing is installed is
//! not buffered; the producer still owns it and redelivers it later.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};

use async_std::task::{self, JoinHandle};
use core_types::InstructionBatch;

use crate::{batch::BatchReport, error::Error};

#[async_trait::async_trait]
pub trait InstructionHandler: Send + Sync {
    async fn handle(&self, batch: InstructionBatch) -> Result<BatchReport, Error>;
}

pub type BatchHandle = JoinHandle<Result<BatchReport, Error>>;

#[derive(Default)]
pub struct InstructionBus {
    handler: Mutex<Option<Arc<dyn InstructionHandler>>>,
    in_flight: Arc<AtomicUsize>,
}

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InstructionBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn InstructionHandler>>> {
        self.handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Installs `handler`. Returns `false` and keeps the current handler if one
    /// is already installed.
    pub fn subscribe(&self, handler: Arc<dyn InstructionHandler>) -> bool {
        let mut current = self.lock();
        if current.is_some() {
            return false;
        }
        *current = Some(handler);
        true
    }

    /// Removes the installed handler. Batches dispatched afterwards are not
    /// accepted; batches already dispatched run to completion.
    pub fn unsubscribe(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().is_some()
    }

    /// Number of dispatched batches that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Spawns processing of `batch` on the installed handler. Dispatches are
    /// not serialized against each other.
    pub fn dispatch(&self, batch: InstructionBatch) -> Option<BatchHandle> {
        let Some(handler) = self.lock().clone() else {
            tracing::warn!(
                storage_id = %batch.node,
                count = batch.records.len(),
                "no instruction handler subscribed, batch not accepted"
            );
            return None;
        };

        let guard = InFlightGuard::new(self.in_flight.clone());
        Some(task::spawn(async move {
            let _guard = guard;
            handler.handle(batch).await
        }))
    }
}
