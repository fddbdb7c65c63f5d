//! Per-message outcomes and the run tally derived from them.

use crate::error::BackupError;
use crate::model::content::BackupRecord;

/// Terminal state of one message's backup attempt.
#[derive(Debug)]
pub enum Outcome {
    /// The message directory was created and its files written.
    Written(BackupRecord),

    /// No displayable body and no attachments: nothing written, not an error.
    NoContent,

    /// Fetch, parse, or write failed for this message. The batch continues.
    Failed(BackupError),
}

/// One message's outcome, tagged with its position in the run.
#[derive(Debug)]
pub struct MessageReport {
    /// 1-based position within the source. Diagnostic only; directory names
    /// never include it.
    pub ordinal: u64,

    /// What happened to this message.
    pub outcome: Outcome,
}

/// Aggregated counts over a run, for the final tally.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct RunSummary {
    /// Messages written to disk.
    pub saved: u64,
    /// Messages skipped for having no content.
    pub skipped: u64,
    /// Messages that failed.
    pub failed: u64,
    /// Total bytes written across all saved messages.
    pub bytes_written: u64,
}

impl RunSummary {
    /// Tally a sequence of per-message reports.
    pub fn from_reports(reports: &[MessageReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.outcome {
                Outcome::Written(record) => {
                    summary.saved += 1;
                    summary.bytes_written += record.bytes;
                }
                Outcome::NoContent => summary.skipped += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}
