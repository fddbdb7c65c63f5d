//! Parsed message structure: the MIME part tree plus top-level headers.

/// How a part asks to be presented, from its `Content-Disposition` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// `Content-Disposition: inline`.
    Inline,
    /// `Content-Disposition: attachment`.
    Attachment,
    /// No `Content-Disposition` header (or an unrecognized token).
    Unspecified,
}

/// One node of a message's MIME tree.
///
/// Exactly one of the two shapes holds per node: a multipart container with
/// ordered children, or a leaf carrying decoded payload bytes. Leaf payloads
/// are already content-transfer-decoded (base64 / quoted-printable resolved).
#[derive(Debug, Clone)]
pub enum MessagePart {
    /// A `multipart/*` container.
    Multipart {
        /// Child parts in wire order.
        children: Vec<MessagePart>,
    },
    /// A leaf part with content.
    Leaf {
        /// Lowercased `type/subtype`, e.g. `"text/html"`.
        content_type: String,
        /// Presentation hint from `Content-Disposition`.
        disposition: Disposition,
        /// Decoded filename from `Content-Disposition`/`Content-Type`
        /// parameters, if any.
        filename: Option<String>,
        /// Transfer-decoded payload bytes. For `text/*` parts these are the
        /// charset-decoded text re-encoded as UTF-8.
        payload: Vec<u8>,
    },
}

impl MessagePart {
    /// `true` for multipart containers.
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart { .. })
    }
}

/// A fully decomposed message: top-level headers plus the MIME part tree.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// Unfolded top-level headers in wire order, names lowercased.
    /// Repeated headers keep every occurrence.
    pub headers: Vec<(String, String)>,
    /// Root of the part tree. A non-multipart message is a single `Leaf`.
    pub root: MessagePart,
}

impl ParsedMessage {
    /// Look up the first occurrence of a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}
