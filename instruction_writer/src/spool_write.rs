//! Durable spool writer.
//!
//! A file is written into the sibling `<dir>.tmp` scratch directory with
//! exclusive-create semantics and then renamed into `<dir>`, so a reader of the
//! spool directory (the collector's rsync) never sees a partially written file.
//! Any failing step aborts the write; nothing is retried here.

pub mod context;
pub mod pipeline;
pub mod steps;
pub mod writer;

pub use writer::SpoolWriter;
