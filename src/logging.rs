//! Tracing setup for the server and the command line tool.
//!
//! The server writes compact lines to stdout and mirrors them into a log file:
//! `RUSTY_DIGEST_LOG_FILE` when set, `logs/rusty-digest.log` otherwise. The file is fed through a
//! `tracing_appender` worker whose guard lives in a static for the rest of the process.
//! `RUST_LOG` overrides the default filter in both setups.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "RUSTY_DIGEST_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_NAME: &str = "rusty-digest.log";

/// Where the server's file layer writes.
#[derive(Debug, PartialEq, Eq)]
enum LogDestination {
    /// Explicit file, opened in append mode.
    File(PathBuf),
    /// Default file inside a directory that may not exist yet.
    Directory {
        dir: PathBuf,
        file_name: &'static str,
    },
}

fn log_destination(override_path: Option<String>) -> LogDestination {
    match override_path.filter(|path| !path.trim().is_empty()) {
        Some(path) => LogDestination::File(PathBuf::from(path)),
        None => LogDestination::Directory {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_NAME,
        },
    }
}

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the server subscriber: stdout plus the log file when it can be opened.
///
/// Filtering defaults to `info`.
pub fn init_tracing() {
    let file_layer = open_log_writer(log_destination(std::env::var(LOG_FILE_ENV).ok())).map(
        |writer| {
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact()
        },
    );

    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();
}

/// Install a stderr-only subscriber for short-lived command line tools (`warn` by default).
pub fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(filter_or("warn"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// The subscriber is not installed yet, so failures go to stderr and stdout logging continues.
fn open_log_writer(destination: LogDestination) -> Option<NonBlocking> {
    let (writer, guard) = match destination {
        LogDestination::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .inspect_err(|err| {
                    eprintln!("Cannot open log file {}: {err}", path.display());
                })
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        LogDestination::Directory { dir, file_name } => {
            std::fs::create_dir_all(&dir)
                .inspect_err(|err| {
                    eprintln!("Cannot create log directory {}: {err}", dir.display());
                })
                .ok()?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };
    let _ = FILE_GUARD.set(guard);
    Some(writer)
}
