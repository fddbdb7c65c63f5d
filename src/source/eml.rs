//! Directory-of-`.eml`-files message source.
//!
//! Each `.eml` file holds one bare RFC 5322 message. Files are visited in
//! sorted name order so runs are deterministic.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{BackupError, Result};
use crate::source::MessageSource;

/// Reads every `*.eml` file in one directory, in sorted order.
#[derive(Debug)]
pub struct EmlDirSource {
    files: std::vec::IntoIter<PathBuf>,
}

impl EmlDirSource {
    /// List the directory's `.eml` files. Other entries are ignored.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackupError::MailboxNotFound(dir.to_path_buf())
            } else {
                BackupError::io(dir, e)
            }
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
            })
            .collect();
        files.sort();

        Ok(Self {
            files: files.into_iter(),
        })
    }
}

impl MessageSource for EmlDirSource {
    fn next_message(&mut self) -> Option<Result<Vec<u8>>> {
        let path = self.files.next()?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(Ok(strip_mbox_separator(bytes))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read message file");
                Some(Err(BackupError::io(path, e)))
            }
        }
    }
}

/// Drop a leading mbox `From ` separator line, which `.eml` files exported
/// from mbox folders sometimes still carry.
fn strip_mbox_separator(mut bytes: Vec<u8>) -> Vec<u8> {
    let bom = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        3
    } else {
        0
    };
    if bytes[bom..].starts_with(b"From ") {
        if let Some(pos) = bytes[bom..].iter().position(|&b| b == b'\n') {
            bytes.drain(..bom + pos + 1);
        }
    }
    bytes
}
