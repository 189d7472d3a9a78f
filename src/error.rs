use std::path::PathBuf;
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Window probe failed: {0}")]
    Probe(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Block list {path} not found")]
    BlockListMissing { path: PathBuf },

    #[error("Block list {path}: {source}")]
    BlockList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("A focus session is already active")]
    SessionActive,

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Wrap an I/O error raised while touching the block-list file.
    pub fn block_list(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::BlockListMissing { path }
        } else {
            Self::BlockList { path, source }
        }
    }
}

/// Check if a rusqlite error is a busy/locked database, which the loops
/// treat as transient.
pub fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.code == rusqlite::ffi::ErrorCode::DatabaseBusy
            || err.code == rusqlite::ffi::ErrorCode::DatabaseLocked)
}
