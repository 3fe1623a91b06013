use super::pipeline_step::{PipelineStep, StepAction};
use crate::error::Error;

/// Executes a series of steps in sequence over a shared context.
///
/// The pipeline continues until all steps complete, a step returns `Skip`, or a
/// step returns `Abort`. An aborted run leaves whatever the earlier steps wrote
/// into the context in place; nothing is rolled back.
pub struct Pipeline<T> {
    pub steps: Vec<Box<dyn PipelineStep<T>>>,
}

impl<T> Pipeline<T> {
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    /// Returns `Ok(())` if all steps complete or a step returns `Skip`,
    /// `Err(error)` if a step returns `Abort(error)`.
    pub async fn execute(&self, context: &mut T) -> Result<(), Error> {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::trace!("Step {} will be skipped based on context", step.name());
                continue;
            }

            tracing::trace!("Executing step: {}", step.name());

            match step.execute(context).await {
                StepAction::Continue => {
                    continue;
                }
                StepAction::Skip => {
                    tracing::debug!("Step {} requested skip - stopping pipeline", step.name());
                    return Ok(());
                }
                StepAction::Abort(error) => {
                    tracing::debug!("Step {} aborted the pipeline: {}", step.name(), error);
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
