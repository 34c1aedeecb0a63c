use std::path::PathBuf;

use thiserror::Error;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The selected folder is missing or not a directory.
    #[error("invalid photo directory: {}", .0.display())]
    BadDir(PathBuf),

    /// The scan completed but found no images.
    #[error("no images found in the selected folder")]
    EmptyCatalog,

    /// `start` was called before a valid folder was selected.
    #[error("no folder selected")]
    NoFolderSelected,

    /// A non-positive slideshow interval was requested.
    #[error("interval must be greater than zero")]
    InvalidInterval,

    /// A background fill was stopped before it found an image.
    #[error("operation cancelled")]
    Cancelled,

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
