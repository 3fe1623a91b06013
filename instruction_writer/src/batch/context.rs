use std::{path::PathBuf, sync::Arc};

use core_types::{CleanupRecord, InstructionBatch};

use crate::{
    batch::processor::BatchReport, cleanup::CleanupListener, metrics::InstructionMetrics,
    path_codec::InstructionPathBuilder, record_store::RecordStore, spool_write::SpoolWriter,
};

/// Context object that flows through the batch pipeline, accumulating state
pub struct BatchContext {
    pub batch: InstructionBatch,
    pub records: Arc<RecordStore>,
    pub path_builder: Arc<InstructionPathBuilder>,
    pub spool_writer: SpoolWriter,
    pub cleanup: Arc<dyn CleanupListener>,
    pub metrics: Option<Arc<dyn InstructionMetrics>>,

    // Accumulated state as pipeline progresses
    pub keys: Vec<String>,
    pub released: usize,
    pub validation_warnings: usize,
    pub path: Option<PathBuf>,
    pub data: Option<String>,
    pub written: bool,
    pub cleaned: Vec<CleanupRecord>,
}

impl BatchContext {
    pub fn new(
        batch: InstructionBatch,
        records: Arc<RecordStore>,
        path_builder: Arc<InstructionPathBuilder>,
        spool_writer: SpoolWriter,
        cleanup: Arc<dyn CleanupListener>,
        metrics: Option<Arc<dyn InstructionMetrics>>,
    ) -> Self {
        Self {
            batch,
            records,
            path_builder,
            spool_writer,
            cleanup,
            metrics,
            keys: Vec::new(),
            released: 0,
            validation_warnings: 0,
            path: None,
            data: None,
            written: false,
            cleaned: Vec::new(),
        }
    }

    pub fn node(&self) -> &str {
        &self.batch.node
    }

    pub fn record_count(&self) -> usize {
        self.batch.records.len()
    }

    pub fn into_report(self) -> BatchReport {
        BatchReport {
            node: self.batch.node,
            path: self.path.unwrap_or_default(),
            record_count: self.batch.records.len(),
            released: self.released,
            validation_warnings: self.validation_warnings,
            cleaned: self.cleaned,
        }
    }
}
