//! Filename sanitization for backup directory and attachment names.
//!
//! Header-derived strings (subjects, attachment names) can carry characters
//! that are reserved on common filesystems. Sanitization deletes them rather
//! than substituting placeholders, so `Re:招待/案内` becomes `Re 招待案内`
//! and stays recognizable.

/// Characters that are deleted from filesystem names.
///
/// This is the Windows reserved set; on Unix only `/` is strictly required,
/// but backups are routinely copied across platforms so the full set goes.
pub const RESERVED_CHARS: [char; 8] = ['\\', '/', ':', '*', '?', '<', '>', '|'];

/// Remove all reserved characters from `s`.
///
/// Every other character is kept as-is, including whitespace, control
/// characters and non-ASCII text. The operation never fails and is
/// idempotent: sanitizing an already-sanitized string returns it unchanged.
/// The result may be empty if `s` contained only reserved characters.
pub fn sanitize(s: &str) -> String {
    s.chars().filter(|c| !RESERVED_CHARS.contains(c)).collect()
}
