use crate::{
    batch::context::BatchContext,
    path_codec::{format_instruction_lines, validate_node_id},
    pipeline::{PipelineStep, StepAction},
};

/// Step 1: Reject batches whose node id cannot be used as a directory name,
/// before any record is touched.
pub struct ValidateNodeStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for ValidateNodeStep {
    fn name(&self) -> &'static str {
        "validate_node"
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        match validate_node_id(context.node()) {
            Ok(()) => StepAction::Continue,
            Err(e) => {
                tracing::error!(
                    storage_id = context.node(),
                    numlines = context.record_count(),
                    error = %e,
                    "Rejecting instruction batch"
                );
                StepAction::Abort(e)
            }
        }
    }
}

/// Step 2: Remove the batch's node from the remaining shards of every record.
///
/// The decrement is not rolled back if a later step fails. The node stays
/// pending on the record until a write for it succeeds, and the upstream store
/// keeps the record until it is reported clean, so a failed batch can be
/// delivered again.
pub struct ReleaseReplicasStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for ReleaseReplicasStep {
    fn name(&self) -> &'static str {
        "release_replicas"
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        let node = context.batch.node.clone();
        let mut keys = Vec::with_capacity(context.batch.records.len());
        let mut released = 0;

        for record in &context.batch.records {
            if context.records.release(record, &node) {
                released += 1;
            } else {
                tracing::debug!(
                    key = %record.key,
                    storage_id = %node,
                    "storage node not among remaining shards"
                );
            }
            keys.push(record.key.clone());
        }

        context.keys = keys;
        context.released = released;
        StepAction::Continue
    }
}

/// Step 3: Warn about records without account or object identifiers. Never
/// blocks the write.
pub struct ValidateRecordsStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for ValidateRecordsStep {
    fn name(&self) -> &'static str {
        "validate_records"
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        for record in &context.batch.records {
            if record.is_missing_identifiers() {
                tracing::warn!(
                    key = %record.key,
                    fields = ?record.fields,
                    storage_id = context.node(),
                    "instruction line is missing account or object information"
                );
                context.validation_warnings += 1;
            }
        }
        StepAction::Continue
    }
}

/// Step 4: Build the spool path and file content.
pub struct FormatInstructionsStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for FormatInstructionsStep {
    fn name(&self) -> &'static str {
        "format_instructions"
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        let path = context.path_builder.next_path(context.node());
        let data = format_instruction_lines(context.node(), &context.batch.records);

        tracing::info!(
            storage_id = context.node(),
            count = context.record_count(),
            path = %path.display(),
            "Received instructions to write"
        );

        context.path = Some(path);
        context.data = Some(data);
        StepAction::Continue
    }
}

/// Step 5: Durably write the spool file.
pub struct WriteSpoolFileStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for WriteSpoolFileStep {
    fn name(&self) -> &'static str {
        "write_spool_file"
    }

    fn should_execute(&self, context: &BatchContext) -> bool {
        context.path.is_some() && context.data.is_some()
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        let (Some(path), Some(data)) = (context.path.as_ref(), context.data.as_ref()) else {
            return StepAction::Continue;
        };

        match context.spool_writer.write(path, data).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    keys = ?context.keys,
                    storage_id = context.node(),
                    "Wrote Mako GC instruction object to spool dir"
                );
                context.written = true;
                StepAction::Continue
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    numlines = context.record_count(),
                    "Error encountered while writing Mako GC instructions"
                );
                StepAction::Abort(e)
            }
        }
    }
}

/// Step 6: Record how many instructions were written for the node.
pub struct ObserveMetricsStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for ObserveMetricsStep {
    fn name(&self) -> &'static str {
        "observe_metrics"
    }

    fn should_execute(&self, context: &BatchContext) -> bool {
        context.written && context.metrics.is_some()
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        if let Some(metrics) = &context.metrics {
            metrics.observe_instructions_written(context.node(), context.record_count());
        }
        StepAction::Continue
    }
}

/// Step 7: Confirm the node's release for every record in the batch, then
/// mark every record whose shards are all released and written as cleaned.
///
/// A record must only leave the upstream store after the instruction for each
/// of its storage nodes is on disk. Otherwise a restart would never see it
/// again and its remaining copies would leak. This step therefore only runs
/// once the spool file has been published.
pub struct CollectCleanupStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for CollectCleanupStep {
    fn name(&self) -> &'static str {
        "collect_cleanup"
    }

    fn should_execute(&self, context: &BatchContext) -> bool {
        context.written
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        let node = context.node();
        let cleaned: Vec<_> = context
            .batch
            .records
            .iter()
            .filter_map(|record| {
                context.records.confirm_written(&record.key, node);
                context.records.take_drained(&record.key)
            })
            .collect();

        if cleaned.is_empty() {
            tracing::trace!(storage_id = node, "No records drained by batch");
            return StepAction::Skip;
        }
        context.cleaned = cleaned;
        StepAction::Continue
    }
}

/// Step 8: Hand drained records to the cleanup listener.
pub struct NotifyCleanupStep;

#[async_trait::async_trait]
impl PipelineStep<BatchContext> for NotifyCleanupStep {
    fn name(&self) -> &'static str {
        "notify_cleanup"
    }

    fn should_execute(&self, context: &BatchContext) -> bool {
        context.written && !context.cleaned.is_empty()
    }

    async fn execute(&self, context: &mut BatchContext) -> StepAction {
        tracing::debug!(
            storage_id = context.node(),
            count = context.cleaned.len(),
            "Emitting cleanup records"
        );
        context.cleanup.on_cleanup(context.cleaned.clone());
        StepAction::Continue
    }
}
