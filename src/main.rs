//! CLI entry point for `mailkeep`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailkeep::backup::orchestrator::run_backup;
use mailkeep::config::Config;
use mailkeep::model::outcome::{MessageReport, Outcome, RunSummary};
use mailkeep::source::open_source;

#[derive(Parser)]
#[command(name = "mailkeep", version, about = "Back up mailboxes into browsable directory trees")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Mailbox to back up (MBOX file or directory of .eml files)
    #[arg(value_name = "MAILBOX")]
    mailbox: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up a single mailbox
    Backup {
        /// MBOX file or directory of .eml files
        mailbox: PathBuf,
        /// Destination root (defaults to the configured backup root)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Back up every account listed in the config file
    Run {
        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailkeep::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Backup {
            mailbox,
            output,
            json,
        }) => cmd_backup(&config, &mailbox, output.as_deref(), json),
        Some(Commands::Run { json }) => cmd_run(&config, json),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.mailbox {
            // Bare path: back it up with the defaults
            Some(mailbox) => cmd_backup(&config, &mailbox, None, false),
            // No arguments at all: process the configured accounts
            None => cmd_run(&config, false),
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailkeep::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailkeep.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailkeep", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Back up a single mailbox.
fn cmd_backup(
    config: &Config,
    mailbox: &Path,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let dest = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.general.backup_root.clone());

    let (reports, elapsed) = backup_mailbox(mailbox, &dest)?;
    let summary = RunSummary::from_reports(&reports);

    if json {
        let doc = serde_json::json!({
            "mailbox": mailbox.to_string_lossy(),
            "destination": dest.to_string_lossy(),
            "messages": reports.iter().map(report_json).collect::<Vec<_>>(),
            "summary": summary,
            "elapsed_ms": elapsed.as_millis(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_reports(&reports);
        print_summary(&summary, elapsed);
    }

    Ok(())
}

/// Back up every configured account, continuing past accounts whose mailbox
/// cannot be opened.
fn cmd_run(config: &Config, json: bool) -> anyhow::Result<()> {
    if config.accounts.is_empty() {
        anyhow::bail!(
            "No accounts configured. Add [[accounts]] entries to the config file \
             or pass a mailbox path."
        );
    }

    let mut account_docs = Vec::new();
    let mut total = RunSummary::default();

    for account in &config.accounts {
        let dest = account.destination(&config.general.backup_root);

        if !json {
            println!();
            println!("  Account '{}': {}", account.name, account.mailbox.display());
        }

        match backup_mailbox(&account.mailbox, &dest) {
            Ok((reports, elapsed)) => {
                let summary = RunSummary::from_reports(&reports);
                total.saved += summary.saved;
                total.skipped += summary.skipped;
                total.failed += summary.failed;
                total.bytes_written += summary.bytes_written;

                if json {
                    account_docs.push(serde_json::json!({
                        "account": account.name,
                        "mailbox": account.mailbox.to_string_lossy(),
                        "destination": dest.to_string_lossy(),
                        "messages": reports.iter().map(report_json).collect::<Vec<_>>(),
                        "summary": summary,
                        "elapsed_ms": elapsed.as_millis(),
                    }));
                } else {
                    print_reports(&reports);
                    print_summary(&summary, elapsed);
                }
            }
            Err(e) => {
                tracing::warn!(account = %account.name, error = %e, "Skipping account");
                if json {
                    account_docs.push(serde_json::json!({
                        "account": account.name,
                        "mailbox": account.mailbox.to_string_lossy(),
                        "error": e.to_string(),
                    }));
                } else {
                    println!("  Skipping account '{}': {e}", account.name);
                }
            }
        }
    }

    if json {
        let doc = serde_json::json!({
            "accounts": account_docs,
            "total": total,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else if config.accounts.len() > 1 {
        println!();
        println!("  All accounts:");
        print_summary(&total, std::time::Duration::ZERO);
    }

    Ok(())
}

/// Open the source, drive the backup with a progress spinner, and time it.
fn backup_mailbox(
    mailbox: &Path,
    dest: &Path,
) -> anyhow::Result<(Vec<MessageReport>, std::time::Duration)> {
    let mut source = open_source(mailbox)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Backing up message {pos}")
            .expect("valid template"),
    );

    let start = Instant::now();
    let reports = run_backup(
        source.as_mut(),
        dest,
        Some(&|ordinal| pb.set_position(ordinal)),
    );
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    Ok((reports, elapsed))
}

/// Print one line per message outcome.
fn print_reports(reports: &[MessageReport]) {
    println!();
    for report in reports {
        match &report.outcome {
            Outcome::Written(record) => {
                println!("  #{:<5} saved    {}", report.ordinal, record.dir.display())
            }
            Outcome::NoContent => {
                println!("  #{:<5} skipped  no content", report.ordinal)
            }
            Outcome::Failed(e) => {
                println!("  #{:<5} failed   {e}", report.ordinal)
            }
        }
    }
}

/// Print the run tally in a human-readable table.
fn print_summary(summary: &RunSummary, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<16} {}", "Saved", summary.saved);
    println!("  {:<16} {}", "Skipped", summary.skipped);
    println!("  {:<16} {}", "Failed", summary.failed);
    println!(
        "  {:<16} {}",
        "Bytes written",
        format_size(summary.bytes_written, BINARY)
    );
    if !elapsed.is_zero() {
        println!("  {:<16} {:.2?}", "Elapsed", elapsed);
    }
    println!();
}

/// One message outcome as JSON.
fn report_json(report: &MessageReport) -> serde_json::Value {
    match &report.outcome {
        Outcome::Written(record) => serde_json::json!({
            "ordinal": report.ordinal,
            "status": "saved",
            "dir": record.dir.to_string_lossy(),
            "files": record
                .files
                .iter()
                .map(|f| f.to_string_lossy())
                .collect::<Vec<_>>(),
            "bytes": record.bytes,
        }),
        Outcome::NoContent => serde_json::json!({
            "ordinal": report.ordinal,
            "status": "skipped",
            "reason": "no content",
        }),
        Outcome::Failed(e) => serde_json::json!({
            "ordinal": report.ordinal,
            "status": "failed",
            "error": e.to_string(),
        }),
    }
}
