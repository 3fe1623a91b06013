use crate::{
    pipeline::Pipeline,
    spool_write::{
        context::SpoolWriteContext,
        steps::{EnsureScratchDirStep, EnsureSpoolDirStep, PublishFileStep, WriteScratchFileStep},
    },
};

impl Default for Pipeline<SpoolWriteContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<SpoolWriteContext> {
    pub fn new() -> Self {
        Self::with_steps(vec![
            Box::new(EnsureSpoolDirStep),
            Box::new(EnsureScratchDirStep),
            Box::new(WriteScratchFileStep),
            Box::new(PublishFileStep),
        ])
    }
}
