//! Write one message's selected content and attachments to disk.
//!
//! The writer owns every filesystem side effect: it creates the per-message
//! directory, renders the body to `email_content.html`, and drops each
//! attachment next to it under its decoded filename.

use std::path::Path;

use tracing::debug;

use crate::error::{BackupError, Result};
use crate::model::content::{Attachment, BackupRecord, SelectedContent};
use crate::model::message::ParsedMessage;
use crate::parser::header::{decode_encoded_words, format_message_date, parse_sender_address};
use crate::sanitize::sanitize;

/// The body file written inside every message directory. Plain-text bodies
/// are wrapped in HTML so a browser renders both kinds the same way.
pub const BODY_FILENAME: &str = "email_content.html";

/// Naming metadata for one message, derived from its top-level headers.
#[derive(Debug, Clone)]
pub struct MessageMeta {
    /// Local-time `YYYY-MM-DD HH:MM`, or `unknown_date`.
    pub date: String,
    /// Bare sender address, or `unknown_sender`.
    pub sender: String,
    /// Decoded subject; empty when the header is missing. Sanitized only
    /// when it becomes part of the directory name.
    pub subject: String,
}

impl MessageMeta {
    /// Derive the naming metadata from a parsed message's headers.
    pub fn from_message(msg: &ParsedMessage) -> Self {
        Self {
            date: format_message_date(msg.header("date")),
            sender: parse_sender_address(msg.header("from")),
            subject: decode_encoded_words(msg.header("subject").unwrap_or_default()),
        }
    }

    /// The per-message directory name: `"{date} - {sender} - {subject}"`,
    /// with only the subject sanitized (the date legitimately contains `:`).
    pub fn directory_name(&self) -> String {
        format!("{} - {} - {}", self.date, self.sender, sanitize(&self.subject))
    }
}

/// Write one message under `dest_root`.
///
/// Returns `Ok(None)` when there is neither a body nor any attachment: the
/// message is skipped and nothing touches the disk. Otherwise the message
/// directory is created (reusing it if a previous run already made it) and
/// every file is written, attachments overwriting same-named siblings.
pub fn write_message(
    content: Option<SelectedContent>,
    attachments: Vec<Attachment>,
    meta: &MessageMeta,
    dest_root: &Path,
) -> Result<Option<BackupRecord>> {
    if content.is_none() && attachments.is_empty() {
        return Ok(None);
    }

    let dir = dest_root.join(meta.directory_name());
    std::fs::create_dir_all(&dir).map_err(|e| BackupError::io(&dir, e))?;

    let mut files = Vec::new();
    let mut bytes = 0u64;

    if let Some(content) = content {
        let body = render_body(&content);
        let path = dir.join(BODY_FILENAME);
        std::fs::write(&path, &body).map_err(|e| BackupError::io(&path, e))?;
        debug!(path = %path.display(), "Wrote body");
        bytes += body.len() as u64;
        files.push(path);
    }

    for attachment in attachments {
        let path = dir.join(attachment_filename(&attachment.filename));
        std::fs::write(&path, &attachment.data).map_err(|e| BackupError::io(&path, e))?;
        debug!(path = %path.display(), size = attachment.data.len(), "Wrote attachment");
        bytes += attachment.data.len() as u64;
        if !files.contains(&path) {
            files.push(path);
        }
    }

    Ok(Some(BackupRecord { dir, files, bytes }))
}

/// Render the selected content as the HTML body file.
///
/// HTML is written as decoded, otherwise-untouched text; plain text is
/// escaped and wrapped in a minimal document so it displays verbatim.
fn render_body(content: &SelectedContent) -> String {
    let text = decode_text(&content.data);
    if content.is_html {
        text
    } else {
        format!(
            "<html><body><pre>{}</pre></body></html>",
            html_escape::encode_text(&text)
        )
    }
}

/// Decode body bytes as UTF-8, falling back to Windows-1252, which maps
/// every byte value and therefore cannot fail.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Turn a decoded attachment name into a safe file name within the message
/// directory. Names that sanitize away entirely fall back to `attachment`.
fn attachment_filename(raw: &str) -> String {
    let name = sanitize(&decode_encoded_words(raw));
    if name.is_empty() {
        "attachment".to_string()
    } else {
        name
    }
}
