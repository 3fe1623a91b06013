use std::{path::PathBuf, sync::Arc};

use core_types::{CleanupRecord, InstructionBatch};

use crate::{
    batch::context::BatchContext,
    bus::InstructionHandler,
    cleanup::CleanupListener,
    error::Error,
    metrics::InstructionMetrics,
    path_codec::InstructionPathBuilder,
    pipeline::Pipeline,
    record_store::RecordStore,
    settings::WriterSettings,
    spool_fs_ops::{SpoolFileSystemOps, StdSpoolFileSystemOps},
    spool_write::SpoolWriter,
};

/// Collaborators shared by every batch.
#[derive(Clone)]
pub struct WriterDependencies {
    pub fs_ops: Arc<dyn SpoolFileSystemOps>,
    pub records: Arc<RecordStore>,
    pub cleanup: Arc<dyn CleanupListener>,
    pub metrics: Option<Arc<dyn InstructionMetrics>>,
}

impl WriterDependencies {
    pub fn new(cleanup: Arc<dyn CleanupListener>) -> Self {
        Self {
            fs_ops: Arc::new(StdSpoolFileSystemOps),
            records: Arc::new(RecordStore::new()),
            cleanup,
            metrics: None,
        }
    }

    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn SpoolFileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    pub fn with_record_store(mut self, records: Arc<RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn InstructionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Outcome of a successfully written batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub node: String,
    pub path: PathBuf,
    pub record_count: usize,
    /// Records from which the batch's node was actually removed.
    pub released: usize,
    pub validation_warnings: usize,
    /// Records reported to the cleanup listener, in batch order.
    pub cleaned: Vec<CleanupRecord>,
}

pub struct BatchProcessor {
    records: Arc<RecordStore>,
    path_builder: Arc<InstructionPathBuilder>,
    spool_writer: SpoolWriter,
    cleanup: Arc<dyn CleanupListener>,
    metrics: Option<Arc<dyn InstructionMetrics>>,
}

impl BatchProcessor {
    pub fn new(settings: &WriterSettings, deps: WriterDependencies) -> Self {
        Self {
            records: deps.records,
            path_builder: Arc::new(InstructionPathBuilder::new(
                settings.instr_write_path_prefix.clone(),
                settings.instance.clone(),
            )),
            spool_writer: SpoolWriter::new_with_fs_ops(deps.fs_ops),
            cleanup: deps.cleanup,
            metrics: deps.metrics,
        }
    }

    pub fn records(&self) -> Arc<RecordStore> {
        self.records.clone()
    }

    #[tracing::instrument(
        skip_all,
        fields(storage_id = %batch.node, count = batch.records.len())
    )]
    pub async fn process(&self, batch: InstructionBatch) -> Result<BatchReport, Error> {
        let mut context = BatchContext::new(
            batch,
            self.records.clone(),
            self.path_builder.clone(),
            self.spool_writer.clone(),
            self.cleanup.clone(),
            self.metrics.clone(),
        );

        let pipeline = Pipeline::<BatchContext>::new();
        pipeline.execute(&mut context).await?;

        tracing::debug!(
            path = ?context.path,
            keys = ?context.keys,
            "Finished writing instruction data"
        );

        Ok(context.into_report())
    }
}

#[async_trait::async_trait]
impl InstructionHandler for BatchProcessor {
    async fn handle(&self, batch: InstructionBatch) -> Result<BatchReport, Error> {
        self.process(batch).await
    }
}
