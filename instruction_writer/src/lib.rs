//! Durable-write stage of the storage garbage collector.
//!
//! Instruction batches (records to delete from one storage node) arrive on an
//! [`bus::InstructionBus`]. While the [`lifecycle::InstructionWriter`] is
//! running, each batch is written to the node's spool directory with an
//! atomic create-then-rename, and records whose every storage node now has an
//! instruction on disk are reported through a [`cleanup::CleanupListener`] as
//! safe to remove from the upstream store.

pub mod batch;
pub mod bus;
pub mod cleanup;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod path_codec;
pub mod pipeline;
pub mod record_store;
pub mod settings;
pub mod spool_fs_ops;
pub mod spool_write;

pub use batch::{BatchProcessor, BatchReport, processor::WriterDependencies};
pub use bus::InstructionBus;
pub use error::Error;
pub use lifecycle::InstructionWriter;
pub use settings::WriterSettings;
