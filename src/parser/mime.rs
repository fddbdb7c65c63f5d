//! MIME decomposition: turn raw message bytes into an owned part tree.
//!
//! `mail-parser` does the heavy lifting (multipart splitting, transfer
//! decoding, charset handling, filename parameters); this module projects its
//! flat part table into the [`MessagePart`] tree and recovers the top-level
//! headers from the raw bytes.

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::{BackupError, Result};
use crate::model::message::{Disposition, MessagePart, ParsedMessage};
use crate::parser::header::{decode_header_bytes, unfold_headers};

/// Parse a complete raw message (headers + body) into a [`ParsedMessage`].
///
/// Fails only when the bytes cannot be recognized as a message at all;
/// individually malformed parts degrade inside the tree instead.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    let raw = strip_bom(raw);
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(BackupError::Parse("empty message".into()));
    }

    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| BackupError::Parse("not recognizable as an RFC 5322 message".into()))?;

    let headers = unfold_headers(&decode_header_bytes(header_block(raw)));
    let root = project_part(&parsed, 0);

    Ok(ParsedMessage { headers, root })
}

/// Recursively convert one `mail-parser` part (and its descendants) into the
/// owned tree.
fn project_part(msg: &mail_parser::Message<'_>, idx: usize) -> MessagePart {
    let part = &msg.parts[idx];

    match &part.body {
        PartType::Multipart(children) => MessagePart::Multipart {
            children: children
                .iter()
                .map(|&child| project_part(msg, child))
                .collect(),
        },
        // An embedded message stays opaque: its raw bytes can be written out
        // as an attachment, but its inner parts never become body candidates
        // of the outer message.
        PartType::Message(nested) => MessagePart::Leaf {
            content_type: "message/rfc822".to_string(),
            disposition: part_disposition(part),
            filename: part_filename(part),
            payload: nested.raw_message.to_vec(),
        },
        _ => MessagePart::Leaf {
            content_type: part_content_type(part),
            disposition: part_disposition(part),
            filename: part_filename(part),
            payload: part.contents().to_vec(),
        },
    }
}

/// Lowercased `type/subtype` for a leaf part, with sensible defaults when the
/// `Content-Type` header is missing.
fn part_content_type(part: &mail_parser::MessagePart<'_>) -> String {
    match part.content_type() {
        Some(ct) => {
            let main = ct.ctype();
            match ct.subtype() {
                Some(sub) => format!("{main}/{sub}").to_ascii_lowercase(),
                None => main.to_ascii_lowercase(),
            }
        }
        None => match &part.body {
            PartType::Html(_) => "text/html".to_string(),
            PartType::Text(_) => "text/plain".to_string(),
            _ => "application/octet-stream".to_string(),
        },
    }
}

fn part_disposition(part: &mail_parser::MessagePart<'_>) -> Disposition {
    match part.content_disposition() {
        Some(cd) if cd.ctype().eq_ignore_ascii_case("attachment") => Disposition::Attachment,
        Some(cd) if cd.ctype().eq_ignore_ascii_case("inline") => Disposition::Inline,
        _ => Disposition::Unspecified,
    }
}

/// Decoded filename from the part headers; empty names count as absent.
fn part_filename(part: &mail_parser::MessagePart<'_>) -> Option<String> {
    part.attachment_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
}

/// Everything before the first blank line: the top-level header block.
fn header_block(raw: &[u8]) -> &[u8] {
    let lf = find_subslice(raw, b"\n\n");
    let crlf = find_subslice(raw, b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => &raw[..a.min(b)],
        (Some(a), None) => &raw[..a],
        (None, Some(b)) => &raw[..b],
        (None, None) => raw,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}
