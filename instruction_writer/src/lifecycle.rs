//! Lifecycle of the instruction writer.
//!
//! ```text
//!            pause                 shutdown
//!   Running -------> Paused ----------------> Shutdown
//!      ^  <-------      |                        ^
//!      |    resume      |                        |
//!      +----------------+------------------------+
//!                         shutdown
//! ```
//!
//! Entering `Running` subscribes the batch processor to the instruction bus;
//! entering `Paused` or `Shutdown` unsubscribes it. Both happen under the state
//! lock, so once a signal call returns no later dispatch reaches a detached
//! processor. Batches already dispatched are neither cancelled nor awaited.

use std::sync::{Arc, Mutex, MutexGuard};

use core_types::{ControlSignal, InstructionBatch, LifecycleEvent, WriterDescription, WriterState};

use crate::{
    batch::{BatchProcessor, processor::WriterDependencies},
    bus::{BatchHandle, InstructionBus},
    error::Error,
    record_store::RecordStore,
    settings::WriterSettings,
};

pub const COMPONENT_NAME: &str = "instruction writer";

/// What a control signal does in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Leave the current state and enter the given one.
    Enter(WriterState),
    /// Stay, and announce the current state again.
    Reemit,
    /// Stay silently.
    Ignore,
}

pub fn transition(from: WriterState, signal: ControlSignal) -> Transition {
    use ControlSignal as S;
    use WriterState as W;

    match (from, signal) {
        (W::Running, S::Pause) => Transition::Enter(W::Paused),
        (W::Running, S::Resume) => Transition::Reemit,
        (W::Running, S::Shutdown) => Transition::Enter(W::Shutdown),
        (W::Paused, S::Resume) => Transition::Enter(W::Running),
        (W::Paused, S::Pause) => Transition::Reemit,
        (W::Paused, S::Shutdown) => Transition::Enter(W::Shutdown),
        (W::Shutdown, _) => Transition::Ignore,
    }
}

pub struct InstructionWriter {
    state: Mutex<WriterState>,
    bus: Arc<InstructionBus>,
    processor: Arc<BatchProcessor>,
    observers: Mutex<Vec<flume::Sender<LifecycleEvent>>>,
}

impl InstructionWriter {
    /// Provisions the spool root and enters `Running`.
    ///
    /// Failing to create the spool root is fatal: the writer is not created.
    pub fn start(
        settings: WriterSettings,
        bus: Arc<InstructionBus>,
        deps: WriterDependencies,
    ) -> Result<Self, Error> {
        let root = &settings.instr_write_path_prefix;
        file_system::ensure_spool_root(root).map_err(|e| {
            Error::ConfigError(format!("unable to mkdir {}: {}", root.display(), e))
        })?;

        tracing::info!(
            root = %root.display(),
            instance = %settings.instance,
            "Starting instruction writer"
        );

        let writer = Self {
            state: Mutex::new(WriterState::Running),
            processor: Arc::new(BatchProcessor::new(&settings, deps)),
            bus,
            observers: Mutex::new(Vec::new()),
        };
        writer.enter(WriterState::Running);
        Ok(writer)
    }

    fn lock_state(&self) -> MutexGuard<'_, WriterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_observers(&self) -> MutexGuard<'_, Vec<flume::Sender<LifecycleEvent>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, state: WriterState) {
        let event = LifecycleEvent::from(state);
        // observers whose receiver is gone are dropped
        self.lock_observers().retain(|tx| tx.send(event).is_ok());
    }

    fn enter(&self, state: WriterState) {
        match state {
            WriterState::Running => {
                self.bus.subscribe(self.processor.clone());
            }
            WriterState::Paused | WriterState::Shutdown => {
                self.bus.unsubscribe();
            }
        }
        self.emit(state);
    }

    /// Applies `signal` and returns the resulting state.
    pub fn signal(&self, signal: ControlSignal) -> WriterState {
        let mut state = self.lock_state();
        let from = *state;

        match transition(from, signal) {
            Transition::Enter(next) => {
                tracing::debug!(%from, %next, %signal, "instruction writer changing state");
                *state = next;
                self.enter(next);
            }
            Transition::Reemit => {
                tracing::trace!(%from, %signal, "instruction writer already in state");
                self.emit(from);
            }
            Transition::Ignore => {
                tracing::debug!(%from, %signal, "Received {} signal after shutdown, ignoring", signal);
            }
        }
        *state
    }

    pub fn pause(&self) -> WriterState {
        self.signal(ControlSignal::Pause)
    }

    pub fn resume(&self) -> WriterState {
        self.signal(ControlSignal::Resume)
    }

    /// Stops accepting new batches. Writes already in flight are not awaited;
    /// callers that need them finished keep the handles returned by `dispatch`.
    pub fn shutdown(&self) -> WriterState {
        self.signal(ControlSignal::Shutdown)
    }

    pub fn state(&self) -> WriterState {
        *self.lock_state()
    }

    pub fn is_accepting(&self) -> bool {
        self.state() == WriterState::Running
    }

    pub fn describe(&self) -> WriterDescription {
        WriterDescription {
            component: COMPONENT_NAME.to_string(),
            state: self.state(),
        }
    }

    /// Subscribes to lifecycle events. Every receiver gets every event,
    /// starting with the state current at subscription.
    pub fn lifecycle_events(&self) -> flume::Receiver<LifecycleEvent> {
        let state = self.lock_state();
        let (tx, rx) = flume::unbounded();
        // rx is alive, the send cannot fail
        let _ = tx.send(LifecycleEvent::from(*state));
        self.lock_observers().push(tx);
        rx
    }

    pub fn bus(&self) -> Arc<InstructionBus> {
        self.bus.clone()
    }

    pub fn records(&self) -> Arc<RecordStore> {
        self.processor.records()
    }

    /// Convenience for `bus().dispatch(batch)`.
    pub fn dispatch(&self, batch: InstructionBatch) -> Option<BatchHandle> {
        self.bus.dispatch(batch)
    }
}
