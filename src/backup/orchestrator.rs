//! Drive the decode → select → write pipeline over a whole message source.

use std::path::Path;

use tracing::{debug, warn};

use crate::backup::writer::{write_message, MessageMeta};
use crate::model::outcome::{MessageReport, Outcome};
use crate::parser::mime::parse_message;
use crate::select::select_content;
use crate::source::MessageSource;

/// Back up every message the source yields into `dest_root`.
///
/// Each message is processed in isolation: a fetch, parse, or write failure
/// is recorded in that message's report and the batch moves on. Ordinals are
/// 1-based and purely diagnostic; directory names derive from each message's
/// own headers, so re-running over an unchanged mailbox reproduces the same
/// tree.
///
/// The optional progress callback is invoked with the ordinal of each
/// message as processing starts.
pub fn run_backup(
    source: &mut dyn MessageSource,
    dest_root: &Path,
    progress: Option<&dyn Fn(u64)>,
) -> Vec<MessageReport> {
    let mut reports = Vec::new();
    let mut ordinal: u64 = 0;

    while let Some(next) = source.next_message() {
        ordinal += 1;
        if let Some(cb) = progress {
            cb(ordinal);
        }

        let outcome = match next {
            Ok(raw) => backup_one(&raw, dest_root),
            Err(e) => Outcome::Failed(e),
        };

        match &outcome {
            Outcome::Written(record) => {
                debug!(ordinal, dir = %record.dir.display(), "Message saved")
            }
            Outcome::NoContent => debug!(ordinal, "Message skipped, no content"),
            Outcome::Failed(e) => warn!(ordinal, error = %e, "Message failed"),
        }

        reports.push(MessageReport { ordinal, outcome });
    }

    reports
}

/// Run one message through parse → select → write.
fn backup_one(raw: &[u8], dest_root: &Path) -> Outcome {
    let parsed = match parse_message(raw) {
        Ok(parsed) => parsed,
        Err(e) => return Outcome::Failed(e),
    };

    let meta = MessageMeta::from_message(&parsed);
    let (content, attachments) = select_content(parsed.root);

    match write_message(content, attachments, &meta, dest_root) {
        Ok(Some(record)) => Outcome::Written(record),
        Ok(None) => Outcome::NoContent,
        Err(e) => Outcome::Failed(e),
    }
}
