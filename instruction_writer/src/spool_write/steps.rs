use std::{io, path::Path};

use crate::{
    error::Error,
    pipeline::{PipelineStep, StepAction},
    spool_fs_ops::SpoolFileSystemOps,
    spool_write::context::SpoolWriteContext,
};

/// `mkdir` that treats an existing directory as success.
async fn ensure_dir(fs_ops: &dyn SpoolFileSystemOps, dir: &Path) -> Result<(), Error> {
    match fs_ops.create_dir(dir).await {
        Ok(()) => {
            tracing::debug!(dir = %dir.display(), "created spool directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::trace!(dir = %dir.display(), "mkdir: dir already exists");
            Ok(())
        }
        Err(e) => Err(Error::DirectoryError(format!(
            "failed to create {}: {}",
            dir.display(),
            e
        ))),
    }
}

/// Step 1: make sure the node's spool directory exists.
///
/// The spool root itself is provisioned once at startup, so a single level of
/// `mkdir` is enough here.
pub struct EnsureSpoolDirStep;

#[async_trait::async_trait]
impl PipelineStep<SpoolWriteContext> for EnsureSpoolDirStep {
    fn name(&self) -> &'static str {
        "ensure_spool_dir"
    }

    async fn execute(&self, context: &mut SpoolWriteContext) -> StepAction {
        match ensure_dir(context.fs_ops.as_ref(), &context.location.dir).await {
            Ok(()) => StepAction::Continue,
            Err(e) => StepAction::Abort(e),
        }
    }
}

/// Step 2: make sure the sibling scratch directory exists.
pub struct EnsureScratchDirStep;

#[async_trait::async_trait]
impl PipelineStep<SpoolWriteContext> for EnsureScratchDirStep {
    fn name(&self) -> &'static str {
        "ensure_scratch_dir"
    }

    async fn execute(&self, context: &mut SpoolWriteContext) -> StepAction {
        match ensure_dir(context.fs_ops.as_ref(), &context.location.scratch_dir).await {
            Ok(()) => StepAction::Continue,
            Err(e) => StepAction::Abort(e),
        }
    }
}

/// Step 3: write the content into the scratch file. The file name embeds a
/// fresh token, so finding it already present is a hard failure.
pub struct WriteScratchFileStep;

#[async_trait::async_trait]
impl PipelineStep<SpoolWriteContext> for WriteScratchFileStep {
    fn name(&self) -> &'static str {
        "write_scratch_file"
    }

    async fn execute(&self, context: &mut SpoolWriteContext) -> StepAction {
        let scratch_path = &context.location.scratch_path;
        let res = context
            .fs_ops
            .write_new_file(scratch_path, context.data.as_bytes())
            .await;

        match res {
            Ok(()) => {
                tracing::debug!(
                    path = %scratch_path.display(),
                    bytes = context.data.len(),
                    "wrote scratch file"
                );
                StepAction::Continue
            }
            Err(e) => StepAction::Abort(Error::WriteError(format!(
                "failed to write {}: {}",
                scratch_path.display(),
                e
            ))),
        }
    }
}

/// Step 4: rename the scratch file into the spool directory.
pub struct PublishFileStep;

#[async_trait::async_trait]
impl PipelineStep<SpoolWriteContext> for PublishFileStep {
    fn name(&self) -> &'static str {
        "publish_file"
    }

    async fn execute(&self, context: &mut SpoolWriteContext) -> StepAction {
        let src = &context.location.scratch_path;
        let res = context.fs_ops.rename(src, &context.path).await;

        match res {
            Ok(()) => {
                tracing::debug!(
                    src = %src.display(),
                    dest = %context.path.display(),
                    "renamed scratch file into spool dir"
                );
                context.published = true;
                StepAction::Continue
            }
            Err(e) => StepAction::Abort(Error::RenameError(format!(
                "failed to rename {} to {}: {}",
                src.display(),
                context.path.display(),
                e
            ))),
        }
    }
}
