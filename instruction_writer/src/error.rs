use thiserror::Error;

/// Errors surfaced by the instruction writer.
///
/// Only `ConfigError` is fatal, and only during startup. Every other variant
/// aborts the batch it occurred in and nothing else.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Directory error: {0}")]
    DirectoryError(String),
    #[error("Write error: {0}")]
    WriteError(String),
    #[error("Rename error: {0}")]
    RenameError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DeserializationError(err.to_string())
    }
}
