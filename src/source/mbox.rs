//! Pull-mode MBOX reader.
//!
//! Scans the file line by line with a fixed-size buffer, yielding one
//! message per `From ` separator. Tolerant of:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - A UTF-8 BOM at the start of the file
//! - Truncated final messages at EOF
//! - NUL bytes and other binary content in bodies
//!
//! A `From ` line only counts as a separator at the start of the file or
//! directly after a blank line; anywhere else it is kept as body content
//! (with a warning), so unquoted "From ..." prose cannot split a message.
//! The separator line itself is stripped from the yielded bytes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{BackupError, Result};
use crate::source::MessageSource;

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Streaming MBOX message source.
#[derive(Debug)]
pub struct MboxSource {
    path: PathBuf,
    reader: BufReader<File>,
    line_buf: Vec<u8>,
    current: Vec<u8>,
    prev_line_was_blank: bool,
    at_start: bool,
    done: bool,
}

impl MboxSource {
    /// Open an MBOX file for scanning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackupError::MailboxNotFound(path.clone())
            } else {
                BackupError::io(&path, e)
            }
        })?;

        Ok(Self {
            path,
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
            line_buf: Vec::with_capacity(4096),
            current: Vec::with_capacity(64 * 1024),
            prev_line_was_blank: false,
            at_start: true,
            done: false,
        })
    }

    /// Take the accumulated message, if it holds anything.
    fn take_current(&mut self) -> Option<Vec<u8>> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

impl MessageSource for MboxSource {
    fn next_message(&mut self) -> Option<Result<Vec<u8>>> {
        if self.done {
            return None;
        }

        loop {
            self.line_buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.line_buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(BackupError::io(&self.path, e)));
                }
            };

            if read == 0 {
                // EOF: flush whatever the file ended with
                self.done = true;
                return self.take_current().map(Ok);
            }

            if is_mbox_separator(&self.line_buf) {
                if self.at_start || self.prev_line_was_blank {
                    self.at_start = false;
                    self.prev_line_was_blank = false;
                    // The separator ends the previous message and is not part
                    // of the next one
                    if let Some(message) = self.take_current() {
                        return Some(Ok(message));
                    }
                    continue;
                }
                warn!(
                    path = %self.path.display(),
                    "'From ' line without preceding blank line, keeping as body content"
                );
            }

            self.prev_line_was_blank = is_blank_line(&self.line_buf);
            self.at_start = false;
            self.current.extend_from_slice(&self.line_buf);
        }
    }
}

/// Whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip a BOM on the very first line
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Whether a line is blank (only whitespace, CR, or LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
