use crate::{
    batch::{
        context::BatchContext,
        steps::{
            CollectCleanupStep, FormatInstructionsStep, NotifyCleanupStep, ObserveMetricsStep,
            ReleaseReplicasStep, ValidateNodeStep, ValidateRecordsStep, WriteSpoolFileStep,
        },
    },
    pipeline::Pipeline,
};

impl Default for Pipeline<BatchContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<BatchContext> {
    pub fn new() -> Self {
        Self::with_steps(vec![
            Box::new(ValidateNodeStep),
            Box::new(ReleaseReplicasStep),
            Box::new(ValidateRecordsStep),
            Box::new(FormatInstructionsStep),
            Box::new(WriteSpoolFileStep),
            Box::new(ObserveMetricsStep),
            Box::new(CollectCleanupStep),
            Box::new(NotifyCleanupStep),
        ])
    }
}
