use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshots are switched off; carries the human-readable reason.
    #[error("{0}")]
    Disabled(String),

    #[error("A snapshot upload is already in progress.")]
    InProgress,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage operation failed: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
