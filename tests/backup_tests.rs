//! Integration tests for the backup pipeline: message sources, MIME
//! decomposition, content selection, and the on-disk projection.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mailkeep::backup::orchestrator::run_backup;
use mailkeep::backup::writer::BODY_FILENAME;
use mailkeep::model::content::BackupRecord;
use mailkeep::model::outcome::{MessageReport, Outcome, RunSummary};
use mailkeep::source::open_source;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Render an RFC 2822 date the way directory names do: local time,
/// minute precision.
fn local_stamp(rfc2822: &str) -> String {
    chrono::DateTime::parse_from_rfc2822(rfc2822)
        .unwrap()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn backup_fixture_mbox(dest: &Path) -> Vec<MessageReport> {
    let mut source = open_source(&fixture("backup.mbox")).unwrap();
    run_backup(source.as_mut(), dest, None)
}

fn written(reports: &[MessageReport], idx: usize) -> &BackupRecord {
    match &reports[idx].outcome {
        Outcome::Written(record) => record,
        other => panic!("message {} should be written, got: {:?}", idx + 1, other),
    }
}

// ─── Test 1: backup.mbox → 5 messages, all saved ────────────────────

#[test]
fn test_backup_mbox_all_messages_saved() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());
    assert_eq!(
        reports.len(),
        5,
        "backup.mbox should contain exactly 5 messages"
    );

    let summary = RunSummary::from_reports(&reports);
    assert_eq!(summary.saved, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 5);
}

// ─── Test 2: Directory named from date, sender, and subject ─────────

#[test]
fn test_directory_name_from_headers() {
    let dest = assert_fs::TempDir::new().unwrap();
    backup_fixture_mbox(dest.path());

    let expected = format!(
        "{} - alice@example.com - Hello World",
        local_stamp("Thu, 04 Jan 2024 10:00:00 +0000")
    );
    dest.child(&expected).assert(predicate::path::is_dir());
    dest.child(format!("{expected}/{BODY_FILENAME}"))
        .assert(predicate::path::exists());
}

// ─── Test 3: Plain-text body wrapped in <pre> ───────────────────────

#[test]
fn test_plain_body_wrapped_in_pre() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    let record = written(&reports, 0);
    let body = std::fs::read_to_string(record.dir.join(BODY_FILENAME)).unwrap();
    assert!(body.starts_with("<html><body><pre>"), "got: '{body}'");
    assert!(body.ends_with("</pre></body></html>"), "got: '{body}'");
    assert!(body.contains("This is the first message."));
}

// ─── Test 4: HTML part preferred over plain text ────────────────────

#[test]
fn test_html_preferred_over_plain() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    let record = written(&reports, 1);
    let body = std::fs::read_to_string(record.dir.join(BODY_FILENAME)).unwrap();
    assert!(
        body.contains("<h1>Release 2.0</h1>"),
        "HTML alternative should win, got: '{body}'"
    );
    assert!(
        !body.contains("<pre>"),
        "HTML bodies are written verbatim, got: '{body}'"
    );
}

// ─── Test 5: Attachment extracted with decoded bytes ────────────────

#[test]
fn test_attachment_extracted() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    let record = written(&reports, 2);
    let pdf = std::fs::read(record.dir.join("minutes.pdf")).unwrap();
    assert_eq!(pdf, b"%PDF-1.4 minutes");
    // Body plus attachment
    assert_eq!(record.files.len(), 2);
}

// ─── Test 6: Reserved characters removed from the subject ───────────

#[test]
fn test_subject_sanitized_in_directory_name() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    // Subject was "Project minutes: draft?"
    let record = written(&reports, 2);
    let name = record.dir.file_name().unwrap().to_string_lossy();
    assert!(
        name.ends_with(" - bob@example.com - Project minutes draft"),
        "got: '{name}'"
    );
    assert!(!name.contains('?'));
}

// ─── Test 7: RFC 2047 headers decoded before naming ─────────────────

#[test]
fn test_encoded_headers_decoded() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    let record = written(&reports, 3);
    let name = record.dir.file_name().unwrap().to_string_lossy();
    assert!(name.contains("jose@example.com"), "got: '{name}'");
    assert!(name.contains("Résumé"), "got: '{name}'");
}

// ─── Test 8: Body "From " line is not a separator ───────────────────

#[test]
fn test_from_line_in_body_preserved() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());
    assert_eq!(reports.len(), 5, "body From line must not split a message");

    let record = written(&reports, 3);
    let body = std::fs::read_to_string(record.dir.join(BODY_FILENAME)).unwrap();
    assert!(
        body.contains("From the archive"),
        "body should keep the From line, got: '{body}'"
    );
}

// ─── Test 9: Missing Date and From fall back to placeholders ────────

#[test]
fn test_missing_headers_fall_back() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = backup_fixture_mbox(tmp.path());

    let record = written(&reports, 4);
    assert_eq!(
        record.dir.file_name().unwrap().to_string_lossy(),
        "unknown_date - unknown_sender - Orphan"
    );
}

// ─── Test 10: EML directory read in sorted order ────────────────────

#[test]
fn test_eml_directory_sorted_and_filtered() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(
        src.path().join("b.eml"),
        b"From: b@example.com\nSubject: Bravo\n\nsecond\n",
    )
    .unwrap();
    std::fs::write(
        src.path().join("a.eml"),
        b"From: a@example.com\nSubject: Alpha\n\nfirst\n",
    )
    .unwrap();
    std::fs::write(src.path().join("notes.txt"), b"not a message\n").unwrap();

    let dest = tempfile::tempdir().unwrap();
    let mut source = open_source(src.path()).unwrap();
    let reports = run_backup(source.as_mut(), dest.path(), None);

    assert_eq!(reports.len(), 2, "only .eml files should be read");
    let first = written(&reports, 0).dir.file_name().unwrap().to_string_lossy().to_string();
    assert!(first.contains("Alpha"), "sorted order, got: '{first}'");
}

// ─── Test 11: Message with no content is skipped ────────────────────

#[test]
fn test_no_content_message_skipped() {
    let src = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("no_content.eml"), src.path().join("beacon.eml")).unwrap();

    let dest = tempfile::tempdir().unwrap();
    let mut source = open_source(src.path()).unwrap();
    let reports = run_backup(source.as_mut(), dest.path(), None);

    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].outcome, Outcome::NoContent));
    assert_eq!(
        std::fs::read_dir(dest.path()).unwrap().count(),
        0,
        "a skipped message must leave no directory behind"
    );
}

// ─── Test 12: Non-UTF-8 charset decoded via its label ───────────────

#[test]
fn test_latin1_body_decoded() {
    let src = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("latin1.eml"), src.path().join("bonjour.eml")).unwrap();

    let dest = assert_fs::TempDir::new().unwrap();
    let mut source = open_source(src.path()).unwrap();
    let reports = run_backup(source.as_mut(), dest.path(), None);

    let record = written(&reports, 0);
    let child = dest.child(
        record
            .dir
            .strip_prefix(dest.path())
            .unwrap()
            .join(BODY_FILENAME),
    );
    child.assert(predicate::str::contains("café bien serré"));
}

// ─── Test 13: Re-running over the same mailbox is idempotent ────────

#[test]
fn test_rerun_reuses_directories() {
    let tmp = tempfile::tempdir().unwrap();
    backup_fixture_mbox(tmp.path());
    let first: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();

    backup_fixture_mbox(tmp.path());
    let second: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();

    assert_eq!(first.len(), 5);
    assert_eq!(
        {
            let mut v = first.clone();
            v.sort();
            v
        },
        {
            let mut v = second.clone();
            v.sort();
            v
        },
        "second run must reproduce the same directory set"
    );
}

// ─── Test 14: A bad message does not sink the batch ─────────────────

#[test]
fn test_bad_message_does_not_sink_batch() {
    use std::io::Write as _;

    let tmp = tempfile::tempdir().unwrap();
    let mbox_path = tmp.path().join("mixed.mbox");
    let mut f = std::fs::File::create(&mbox_path).unwrap();
    writeln!(f, "From a@example.com Mon Jan  8 10:00:00 2024").unwrap();
    writeln!(f, "From: a@example.com").unwrap();
    writeln!(f, "Subject: Before").unwrap();
    writeln!(f).unwrap();
    writeln!(f, "first body").unwrap();
    writeln!(f).unwrap();
    // A separator followed by nothing but whitespace: unparseable
    writeln!(f, "From b@example.com Mon Jan  8 11:00:00 2024").unwrap();
    writeln!(f, " ").unwrap();
    writeln!(f, "From c@example.com Mon Jan  8 12:00:00 2024").unwrap();
    writeln!(f, "From: c@example.com").unwrap();
    writeln!(f, "Subject: After").unwrap();
    writeln!(f).unwrap();
    writeln!(f, "second body").unwrap();
    drop(f);

    let dest = tempfile::tempdir().unwrap();
    let mut source = open_source(&mbox_path).unwrap();
    let reports = run_backup(source.as_mut(), dest.path(), None);

    assert_eq!(reports.len(), 3);
    assert!(matches!(reports[0].outcome, Outcome::Written(_)));
    assert!(matches!(reports[1].outcome, Outcome::Failed(_)));
    assert!(matches!(reports[2].outcome, Outcome::Written(_)));

    let summary = RunSummary::from_reports(&reports);
    assert_eq!(summary.saved, 2);
    assert_eq!(summary.failed, 1);
}

// ─── Test 15: Forwarded message written as an opaque attachment ─────

#[test]
fn test_forwarded_message_attachment() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(
        src.path().join("fwd.eml"),
        b"From: outer@example.com\r\n\
Date: Tue, 09 Jan 2024 12:00:00 +0000\r\n\
Subject: Fwd\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"AAA\"\r\n\
\r\n\
--AAA\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--AAA\r\n\
Content-Type: message/rfc822\r\n\
Content-Disposition: attachment; filename=\"orig.eml\"\r\n\
\r\n\
From: inner@example.com\r\n\
Subject: Inner\r\n\
\r\n\
inner body\r\n\
--AAA--\r\n",
    )
    .unwrap();

    let dest = tempfile::tempdir().unwrap();
    let mut source = open_source(src.path()).unwrap();
    let reports = run_backup(source.as_mut(), dest.path(), None);

    let record = written(&reports, 0);
    let inner = std::fs::read(record.dir.join("orig.eml")).unwrap();
    assert!(
        inner.starts_with(b"From: inner@example.com"),
        "inner message should be written raw"
    );
}

// ─── Test 16: Missing mailbox is a hard error ───────────────────────

#[test]
fn test_missing_mailbox_is_an_error() {
    let err = open_source(Path::new("/no/such/mailbox.mbox")).unwrap_err();
    assert!(
        err.to_string().contains("Mailbox not found"),
        "got: '{err}'"
    );
}
