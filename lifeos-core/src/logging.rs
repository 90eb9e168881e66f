//! File logging for the `lifeos` command.
//!
//! Each run appends to a daily file under `$XDG_STATE_HOME/lifeos/`
//! (`lifeos.log.YYYY-MM-DD`, UTC date). The appender prunes old days beyond
//! `[logging] max_files`. The level comes from `[logging] level` unless
//! `RUST_LOG` is set. Nothing is written to stdout or stderr, so `--json`
//! output stays machine-readable.
//!
//! Store events worth finding later:
//! - `Store loaded` with record and pending-rewrite counts
//! - `Discarding unreadable snapshot` and `Removed links to discarded records`
//!   when a run recovers with `discard_corrupt`
//! - `Committed snapshot` at debug level per mutation, listing the slots written

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILE_PREFIX: &str = "lifeos.log";

/// Flushes buffered log lines when dropped. Keep it alive until exit.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Install the file subscriber.
///
/// A second call in the same process keeps the first subscriber.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let dir = Config::state_dir();
    std::fs::create_dir_all(&dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .max_log_files(config.max_files.max(1))
        .build(&dir)
        .map_err(|e| Error::Config(format!("failed to open log file in {}: {e}", dir.display())))?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        "lifeos starting"
    );

    Ok(LoggingGuard { _worker: worker })
}

/// Today's log file, as `lifeos doctor` reports it.
pub fn log_file_path() -> PathBuf {
    Config::state_dir().join(format!("{FILE_PREFIX}.{}", Utc::now().format("%Y-%m-%d")))
}
