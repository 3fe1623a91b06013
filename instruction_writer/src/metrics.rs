use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub const INSTRUCTIONS_WRITTEN_METRIC: &str = "gc_mako_instrs_written";
pub const STORAGE_ID_LABEL: &str = "manta_storage_id";

/// Receives one observation per successfully written batch.
pub trait InstructionMetrics: Send + Sync {
    fn observe_instructions_written(&self, storage_id: &str, count: usize);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInstructionStats {
    pub observations: u64,
    pub instructions: u64,
}

/// Per storage node totals kept in memory.
#[derive(Clone, Default)]
pub struct InMemoryMetrics {
    stats: Arc<Mutex<HashMap<String, NodeInstructionStats>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats_for(&self, storage_id: &str) -> Option<NodeInstructionStats> {
        self.lock().get(storage_id).cloned()
    }

    /// Snapshot sorted by storage id.
    pub fn snapshot(&self) -> Vec<(String, NodeInstructionStats)> {
        let mut stats: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    pub fn total_instructions(&self) -> u64 {
        self.lock().values().map(|s| s.instructions).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, NodeInstructionStats>> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InstructionMetrics for InMemoryMetrics {
    fn observe_instructions_written(&self, storage_id: &str, count: usize) {
        let mut stats = self.lock();
        let entry = stats.entry(storage_id.to_string()).or_default();
        entry.observations += 1;
        entry.instructions += count as u64;
        tracing::trace!(
            metric = INSTRUCTIONS_WRITTEN_METRIC,
            manta_storage_id = storage_id,
            count,
            "observed"
        );
    }
}
