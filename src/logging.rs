//! Log routing for the server and the CLI.
//!
//! The server logs indexing batches and answered questions to stdout and to
//! `logs/rusty-docs.log`, or to the file named by `RUSTY_DOCS_LOG_FILE`. The CLI keeps stdout
//! for answers and writes diagnostics to stderr only.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "RUSTY_DOCS_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "rusty-docs.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the server subscriber.
///
/// `RUST_LOG` selects the level (`info` when unset). Stdout gets short lines without targets;
/// the log file, if it can be opened, gets the same events with targets and no colour codes.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Install the CLI subscriber: stderr only, `warn` unless `RUST_LOG` says otherwise.
pub fn init_cli_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Where the server log goes: the `RUSTY_DOCS_LOG_FILE` value, or the default file.
fn log_file_path(configured: Option<String>) -> PathBuf {
    configured
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Server logging continues on stdout alone when the file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = log_file_path(std::env::var(LOG_FILE_ENV).ok());
    match open_log_file(&path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn log_file_defaults_when_unset_or_blank() {
        let default = Path::new("logs").join("rusty-docs.log");
        assert_eq!(log_file_path(None), default);
        assert_eq!(log_file_path(Some("  ".into())), default);
        assert_eq!(
            log_file_path(Some("/var/log/rustydocs.log".into())),
            PathBuf::from("/var/log/rustydocs.log")
        );
    }

    #[test]
    fn log_file_is_created_with_parents_and_appended() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("server.log");

        open_log_file(&path)
            .expect("open")
            .write_all(b"first\n")
            .expect("write");
        open_log_file(&path)
            .expect("reopen")
            .write_all(b"second\n")
            .expect("write");

        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "first\nsecond\n"
        );
    }
}
