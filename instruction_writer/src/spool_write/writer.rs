use std::{path::Path, sync::Arc};

use crate::{
    error::Error,
    pipeline::Pipeline,
    spool_fs_ops::{SpoolFileSystemOps, StdSpoolFileSystemOps},
    spool_write::context::SpoolWriteContext,
};

#[derive(Clone)]
pub struct SpoolWriter {
    fs_ops: Arc<dyn SpoolFileSystemOps>,
}

impl Default for SpoolWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpoolWriter {
    pub fn new() -> Self {
        Self::new_with_fs_ops(Arc::new(StdSpoolFileSystemOps))
    }

    pub fn new_with_fs_ops(fs_ops: Arc<dyn SpoolFileSystemOps>) -> Self {
        Self { fs_ops }
    }

    /// Writes `data` so that it appears at `path` all at once or not at all.
    #[tracing::instrument(skip_all, fields(path = %path.display()), err)]
    pub async fn write(&self, path: &Path, data: &str) -> Result<(), Error> {
        let mut context =
            SpoolWriteContext::new(path.to_path_buf(), data.to_string(), self.fs_ops.clone())?;

        let pipeline = Pipeline::<SpoolWriteContext>::new();
        pipeline.execute(&mut context).await?;

        if !context.published {
            return Err(Error::RenameError(format!(
                "{} was not published",
                path.display()
            )));
        }
        Ok(())
    }
}
