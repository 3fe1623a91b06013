use std::{path::PathBuf, sync::Arc};

use crate::{error::Error, path_codec::ScratchLocation, spool_fs_ops::SpoolFileSystemOps};

/// Context that flows through the spool write pipeline.
pub struct SpoolWriteContext {
    pub path: PathBuf,
    pub data: String,
    pub location: ScratchLocation,
    pub fs_ops: Arc<dyn SpoolFileSystemOps>,

    // Set by PublishFileStep once the rename has succeeded
    pub published: bool,
}

impl SpoolWriteContext {
    pub fn new(
        path: PathBuf,
        data: String,
        fs_ops: Arc<dyn SpoolFileSystemOps>,
    ) -> Result<Self, Error> {
        let location = ScratchLocation::for_path(&path)?;
        Ok(Self {
            path,
            data,
            location,
            fs_ops,
            published: false,
        })
    }
}
