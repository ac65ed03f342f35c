//! Command-line front end for the storage gateway.
//!
//! # Responsibility
//! - Wire `.env`/environment config, logging and the REST backend together.
//! - Expose each gateway operation as a sub-command for manual checks.
//!
//! # Invariants
//! - Documents and rows go to stdout as JSON; diagnostics go to stderr.
//! - Any gateway error exits with status 1.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use schemastore_core::{
    default_log_level, init_logging, GatewayConfig, GatewayError, LogRange, Notifier,
    RestBackend, StorageGateway,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "schemastore")]
#[command(about = "Read and write dashboard documents and event logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage info
    Ping,
    /// Upload a JSON file to storage
    Upload {
        name: String,
        file: PathBuf,
        /// Suppress success/failure notifications
        #[arg(long)]
        silent: bool,
    },
    /// Print a stored JSON document
    Download { name: String },
    /// List JSON documents under a prefix
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Delete a stored object
    Delete { name: String },
    /// Print log rows between two bounds (RFC 3339 or YYYY-MM-DD, inclusive)
    Logs { start: String, end: String },
    /// Read or write the repository document
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
}

#[derive(Subcommand)]
enum RepoAction {
    Get,
    Save { file: PathBuf },
}

/// Prints user-facing notifications to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn success(&self, message: &str) {
        eprintln!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

fn main() -> ExitCode {
    // A missing .env file is normal; the process environment still applies.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    if let Command::Ping = cli.command {
        println!("schemastore_core ping={}", schemastore_core::ping());
        println!("schemastore_core version={}", schemastore_core::core_version());
        return ExitCode::SUCCESS;
    }

    let gateway = StorageGateway::from_config(GatewayConfig::from_env())
        .with_notifier(Arc::new(StderrNotifier));

    match run(&gateway, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("event=cli_command module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(gateway: &StorageGateway<RestBackend>, command: Command) -> Result<(), String> {
    match command {
        Command::Ping => Ok(()),
        Command::Upload { name, file, silent } => {
            let document = read_json_file(&file)?;
            gateway
                .upload_json(&document, &name, silent)
                .map_err(describe)
        }
        Command::Download { name } => {
            let document = gateway.download_json::<Value>(&name).map_err(describe)?;
            print_document(&name, document)
        }
        Command::List { prefix } => {
            for name in gateway.list_json_names(&prefix).map_err(describe)? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Delete { name } => gateway.delete_blob(&name).map_err(describe),
        Command::Logs { start, end } => {
            let range = LogRange::new(parse_bound(&start, false)?, parse_bound(&end, true)?);
            let rows = gateway.fetch_logs(&range).map_err(describe)?;
            print_json(&rows)
        }
        Command::Repo { action } => match action {
            RepoAction::Get => {
                let document = gateway.get_repo_document::<Value>().map_err(describe)?;
                print_document(&gateway.config().repo_file_name, document)
            }
            RepoAction::Save { file } => {
                let document = read_json_file(&file)?;
                gateway.save_repo_document(&document).map_err(describe)
            }
        },
    }
}

fn describe(err: GatewayError) -> String {
    err.to_string()
}

fn read_json_file(path: &Path) -> Result<Value, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|err| format!("`{}` is not valid JSON: {err}", path.display()))
}

fn print_document(name: &str, document: Option<Value>) -> Result<(), String> {
    match document {
        Some(value) => print_json(&value),
        None => Err(format!("document not found: {name}")),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to render JSON: {err}"))?;
    println!("{rendered}");
    Ok(())
}

/// Parses an RFC 3339 instant, or a calendar day taken as its first/last
/// instant depending on `is_end`.
fn parse_bound(raw: &str, is_end: bool) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| format!("`{trimmed}` is neither RFC 3339 nor YYYY-MM-DD"))?;
    let whole_day = LogRange::whole_days(day, day);
    Ok(if is_end { whole_day.end } else { whole_day.start })
}
