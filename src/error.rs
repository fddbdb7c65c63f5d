//! Centralized error types for mailkeep.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailkeep library.
#[derive(Error, Debug)]
pub enum BackupError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified mailbox path does not exist.
    #[error("Mailbox not found: {0}")]
    MailboxNotFound(PathBuf),

    /// The path is neither an MBOX file nor a directory of `.eml` files.
    #[error("Not a usable mailbox (expected an MBOX file or a directory of .eml files): {0}")]
    InvalidSource(PathBuf),

    /// The raw bytes could not be parsed as an RFC 5322 / MIME message.
    #[error("Unparseable message: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, BackupError>`.
pub type Result<T> = std::result::Result<T, BackupError>;

impl BackupError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `BackupError`
/// when no path context is available (rare; prefer `BackupError::io`).
impl From<std::io::Error> for BackupError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
