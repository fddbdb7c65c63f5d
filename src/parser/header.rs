//! Header decoding: RFC 2047 encoded-words, date parsing, sender extraction.
//!
//! Everything here is total: malformed input degrades to a readable fallback
//! (`unknown_date`, `unknown_sender`, or the original text) instead of an
//! error, so one bad header can never sink a backup run.

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Placeholder used when the `Date:` header is absent or unparsable.
pub const UNKNOWN_DATE: &str = "unknown_date";

/// Placeholder used when the `From:` header is absent or carries no address.
pub const UNKNOWN_SENDER: &str = "unknown_sender";

/// Decode raw header-block bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every
/// byte value).
pub(crate) fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: continuation lines (starting with space or tab) are joined
/// onto the previous header.
///
/// Returns `(lowercase_name, raw_value)` pairs in wire order.
pub(crate) fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon that are not continuations are skipped
    }

    result
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`.
///
/// Plain text passes through unchanged. A token that fails to decode is kept
/// as-is rather than dropped, so the result is always readable.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two adjacent encoded words is not emitted (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    /// Bytes consumed from the input *after* the opening `=?`.
    consumed: usize,
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Shape: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_uppercase().as_str() {
        "B" => decode_b_encoding(encoded_text)?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    let text = decode_charset(charset, &bytes);

    Some(DecodedWord {
        text,
        consumed: total_consumed,
    })
}

/// Decode B-encoding (base64, possibly with embedded whitespace or with the
/// trailing padding omitted).
fn decode_b_encoding(input: &str) -> Option<Vec<u8>> {
    let cleaned: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if cleaned.ends_with(b"=") {
        general_purpose::STANDARD.decode(&cleaned).ok()
    } else {
        general_purpose::STANDARD_NO_PAD.decode(&cleaned).ok()
    }
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("00"),
                    16,
                ) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let charset_lower = charset.to_lowercase();
    match charset_lower.as_str() {
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(
                    charset = charset,
                    "Unknown charset, falling back to UTF-8 lossy"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

/// Format a message's `Date:` header as a local-time, minute-precision
/// timestamp: `YYYY-MM-DD HH:MM`.
///
/// Absent, empty, or unparsable headers yield [`UNKNOWN_DATE`]. Never fails.
pub fn format_message_date(raw: Option<&str>) -> String {
    match raw.and_then(parse_date) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Parse an email date string in the common formats seen in the wild.
///
/// Handles RFC 2822 and RFC 3339 plus a handful of broken variants
/// (missing day-of-week, named timezones, bare local timestamps).
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = DateTime::parse_from_str(&no_dow, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&no_dow, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    // Swap named timezone abbreviations for offsets and retry
    let replaced = replace_named_tz(&no_dow);
    if replaced != no_dow {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&replaced, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Strip a leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

/// Extract the bare email address from a `From:` header.
///
/// Supports `"Display Name" <addr>` and bare-address forms, with encoded
/// display names resolved first. Yields [`UNKNOWN_SENDER`] when the header is
/// absent or contains nothing address-shaped.
pub fn parse_sender_address(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(r) => decode_encoded_words(r),
        None => return UNKNOWN_SENDER.to_string(),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN_SENDER.to_string();
    }

    // "Display Name <address>" or "<address>"
    if let Some(angle_start) = trimmed.rfind('<') {
        if let Some(angle_end) = trimmed.rfind('>') {
            if angle_end > angle_start {
                let addr = trimmed[angle_start + 1..angle_end].trim();
                if addr.contains('@') {
                    return addr.to_string();
                }
            }
        }
    }

    // Bare address: "user@domain"
    if trimmed.contains('@') {
        return trimmed.to_string();
    }

    UNKNOWN_SENDER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_plain_header_passes_through() {
        assert_eq!(decode_encoded_words("Weekly report"), "Weekly report");
    }

    #[test]
    fn test_unknown_charset_still_yields_text() {
        let input = "=?X-NO-SUCH-CHARSET?Q?hello?=";
        assert_eq!(decode_encoded_words(input), "hello");
    }

    #[test]
    fn test_malformed_word_kept_verbatim() {
        // No closing "?=": not an encoded word
        let input = "=?UTF-8?B?SG9sYQ";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_bad_base64_kept_verbatim() {
        let input = "=?UTF-8?B?!!!not-base64!!!?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        // 山田太郎
        let input = "=?UTF-8?B?5bGx55Sw5aSq6YOO?=";
        assert_eq!(decode_encoded_words(input), "山田太郎");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        // Müller
        let input = "=?Windows-1252?Q?M=FCller?=";
        assert_eq!(decode_encoded_words(input), "Müller");
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_parse_date_without_dow() {
        assert!(parse_date("04 Jan 2024 10:00:00 +0000").is_some());
    }

    #[test]
    fn test_parse_date_named_tz() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 EST").is_some());
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
    }

    #[test]
    fn test_format_message_date_minute_precision() {
        // Seconds are dropped; output is shifted to the local timezone, so
        // compute the expectation through the same conversion.
        let formatted = format_message_date(Some("Fri, 01 Mar 2024 10:15:42 +0000"));
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 1, 10, 15, 42)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        assert_eq!(formatted, expected);
    }

    #[test]
    fn test_format_message_date_fallbacks() {
        assert_eq!(format_message_date(None), UNKNOWN_DATE);
        assert_eq!(format_message_date(Some("")), UNKNOWN_DATE);
        assert_eq!(format_message_date(Some("not a date")), UNKNOWN_DATE);
    }

    #[test]
    fn test_sender_display_name_form() {
        assert_eq!(
            parse_sender_address(Some("\"Jane Doe\" <jane@example.com>")),
            "jane@example.com"
        );
    }

    #[test]
    fn test_sender_bare_form() {
        assert_eq!(
            parse_sender_address(Some("jane@example.com")),
            "jane@example.com"
        );
    }

    #[test]
    fn test_sender_encoded_display_name() {
        assert_eq!(
            parse_sender_address(Some("=?UTF-8?B?5bGx55Sw?= <yamada@example.jp>")),
            "yamada@example.jp"
        );
    }

    #[test]
    fn test_sender_fallbacks() {
        assert_eq!(parse_sender_address(None), UNKNOWN_SENDER);
        assert_eq!(parse_sender_address(Some("")), UNKNOWN_SENDER);
        assert_eq!(parse_sender_address(Some("no address here")), UNKNOWN_SENDER);
    }
}
