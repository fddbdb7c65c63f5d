//! Content selection: pick one body to keep and enumerate attachments.
//!
//! The walk visits every leaf of the part tree in pre-order. Parts with an
//! `attachment` disposition and a usable filename become attachments no
//! matter their content type; among the rest, HTML is preferred over plain
//! text, and when several candidates of the same kind exist the one seen
//! last takes precedence.

use crate::model::content::{Attachment, SelectedContent};
use crate::model::message::{Disposition, MessagePart};

/// Walk the part tree and return the selected body (if any) plus all
/// attachments, consuming the tree so payloads move instead of copying.
pub fn select_content(root: MessagePart) -> (Option<SelectedContent>, Vec<Attachment>) {
    let mut state = Selection::default();
    visit(root, &mut state);
    state.finish()
}

#[derive(Default)]
struct Selection {
    html: Option<Vec<u8>>,
    plain: Option<Vec<u8>>,
    attachments: Vec<Attachment>,
}

impl Selection {
    /// HTML wins over plain text; with neither there is no displayable body.
    fn finish(self) -> (Option<SelectedContent>, Vec<Attachment>) {
        let Selection {
            html,
            plain,
            attachments,
        } = self;
        let content = match (html, plain) {
            (Some(data), _) => Some(SelectedContent {
                data,
                content_type: "text/html".to_string(),
                is_html: true,
            }),
            (None, Some(data)) => Some(SelectedContent {
                data,
                content_type: "text/plain".to_string(),
                is_html: false,
            }),
            (None, None) => None,
        };
        (content, attachments)
    }
}

fn visit(part: MessagePart, state: &mut Selection) {
    match part {
        MessagePart::Multipart { children } => {
            for child in children {
                visit(child, state);
            }
        }
        // A part that declares itself an attachment and carries a non-empty
        // filename is extracted as-is, whatever its content type.
        MessagePart::Leaf {
            disposition: Disposition::Attachment,
            filename: Some(name),
            payload,
            ..
        } if !name.is_empty() => {
            state.attachments.push(Attachment {
                filename: name,
                data: payload,
            });
        }
        // Everything else (including attachment-disposition parts with no
        // usable filename) competes on content type alone.
        MessagePart::Leaf {
            content_type,
            payload,
            ..
        } => match content_type.as_str() {
            "text/html" => state.html = Some(payload),
            "text/plain" => state.plain = Some(payload),
            _ => {}
        },
    }
}
