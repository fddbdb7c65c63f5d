//! Message acquisition: the `MessageSource` trait and the local sources.
//!
//! A source hands out raw RFC 5322 message bytes one at a time. Where the
//! messages come from is its own business; the backup pipeline only ever
//! sees the bytes.

use std::path::Path;

use crate::error::{BackupError, Result};

pub mod eml;
pub mod mbox;

pub use eml::EmlDirSource;
pub use mbox::MboxSource;

/// A finite stream of raw messages.
///
/// `None` marks the end of the stream. An `Err` item stands for one message
/// that could not be read; callers are expected to record it and keep
/// pulling. Sources are not required to be restartable.
pub trait MessageSource: std::fmt::Debug {
    /// Produce the next raw message, if any.
    fn next_message(&mut self) -> Option<Result<Vec<u8>>>;
}

/// Open the right source for a local mailbox path: a directory is read as a
/// folder of `.eml` files, a file as an MBOX.
pub fn open_source(path: &Path) -> Result<Box<dyn MessageSource>> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BackupError::MailboxNotFound(path.to_path_buf())
        } else {
            BackupError::io(path, e)
        }
    })?;

    if metadata.is_dir() {
        Ok(Box::new(EmlDirSource::open(path)?))
    } else if metadata.is_file() {
        Ok(Box::new(MboxSource::open(path)?))
    } else {
        Err(BackupError::InvalidSource(path.to_path_buf()))
    }
}
