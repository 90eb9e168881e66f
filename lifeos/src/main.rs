//! lifeos - command-line front end for the Life OS store
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/lifeos/lifeos.db (~/.local/share/lifeos/lifeos.db)
//! - Logs: $XDG_STATE_HOME/lifeos/lifeos.log.YYYY-MM-DD (~/.local/state/lifeos/)
//! - Config: $XDG_CONFIG_HOME/lifeos/config.toml (~/.config/lifeos/config.toml)

mod cli;
mod commands;
mod output;
mod process_lock;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use lifeos_core::{Config, Database, RecoveryPolicy, Store};
use output::Printer;
use process_lock::acquire_writer_guard;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        lifeos_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = match cli.db.clone() {
        Some(path) if path.is_relative() => std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(path),
        Some(path) => path,
        None => config.resolved_database_path(),
    };

    // Held until exit so load-modify-write cycles never interleave
    let _writer_guard = if cli.command.is_mutating() {
        Some(acquire_writer_guard(&db_path).context("failed to acquire writer lock")?)
    } else {
        None
    };

    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let policy = if cli.discard_corrupt {
        RecoveryPolicy::DiscardCorrupt
    } else {
        config.store.recovery
    };
    let mut store = Store::open(db, policy).with_context(|| {
        format!(
            "failed to load store from {} (run with --discard-corrupt to start unreadable collections empty)",
            db_path.display()
        )
    })?;

    let printer = Printer::new(cli.json);
    let code = commands::run(&mut store, cli.command, &printer)?;

    tracing::info!("lifeos finished");
    Ok(code)
}
