use std::io;
use std::path::PathBuf;

use crate::process::Outcome;

/// Errors that can occur during devloop operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to spawn `{program}`: {source}")]
    SpawnError {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Build of {target} failed: {outcome}")]
    BuildFailed { target: String, outcome: Outcome },

    #[error("Failed to copy asset {} -> {}: {source}", from.display(), to.display())]
    AssetCopyError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("File watch stream closed unexpectedly")]
    WatchClosed,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for devloop operations
pub type Result<T> = std::result::Result<T, Error>;
