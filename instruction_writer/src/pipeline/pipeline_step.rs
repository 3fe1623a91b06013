use crate::error::Error;

/// The action to take after a step completes.
///
/// - `Continue`: Proceed to the next step normally
/// - `Skip`: Successfully exit early without running remaining steps
/// - `Abort`: Stop the pipeline with an error
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Continue to the next step
    Continue,
    /// Skip all remaining steps (successful early exit)
    Skip,
    /// Abort the pipeline with an error
    Abort(Error),
}

/// A single stage of a pipeline.
///
/// Each step receives a mutable reference to the context, may record results in
/// it, and returns a `StepAction` to control the rest of the run.
#[async_trait::async_trait]
pub trait PipelineStep<T>: Send + Sync {
    /// Returns the name of this step for logging.
    fn name(&self) -> &'static str;

    /// Called before `execute()`. Steps returning `false` are skipped without
    /// affecting the pipeline flow.
    fn should_execute(&self, _context: &T) -> bool {
        true
    }

    async fn execute(&self, context: &mut T) -> StepAction;
}
