//! Results of content selection and of writing one message to disk.

use std::path::PathBuf;

/// The body chosen to represent a message, at most one per message.
#[derive(Debug, Clone)]
pub struct SelectedContent {
    /// Decoded body bytes (UTF-8 for text parts that declared a charset).
    pub data: Vec<u8>,

    /// Content type the bytes came from, e.g. `"text/html"`.
    pub content_type: String,

    /// `true` when the source part was HTML. Plain text gets wrapped in a
    /// minimal HTML document at write time.
    pub is_html: bool,
}

/// One attachment slated for extraction.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename as decoded from the part headers. Not yet sanitized for
    /// filesystem use; never empty.
    pub filename: String,

    /// Raw decoded payload bytes, written to disk unmodified.
    pub data: Vec<u8>,
}

/// The filesystem artifact produced for one message.
///
/// Created once, never mutated or deleted afterwards.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    /// The per-message directory.
    pub dir: PathBuf,

    /// Every file written under `dir` (body file and attachments).
    pub files: Vec<PathBuf>,

    /// Total bytes written across `files`.
    pub bytes: u64,
}
