//! Processing of one instruction batch: release the batch's node from every
//! record, write the spool file, then report records that are fully flushed.

pub mod context;
pub mod pipeline;
pub mod processor;
pub mod steps;

pub use processor::{BatchProcessor, BatchReport};
