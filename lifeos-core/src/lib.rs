//! # lifeos-core
//!
//! Core library for Life OS - a personal and legal-practice workspace.
//!
//! This library provides:
//! - Domain types for cases, contacts, tasks, projects, goals, work sessions,
//!   and contact interactions
//! - A relational store that keeps two-sided links consistent
//! - Versioned, checksummed snapshots persisted to SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use lifeos_core::{CaseInput, Config, Database, Store};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let mut store = Store::open(db, config.store.recovery).expect("failed to load store");
//! let case_id = store
//!     .create_case(CaseInput::new("Acme v. Smith", "Acme Corp"))
//!     .expect("failed to create case");
//! ```

// Re-export commonly used items at the crate root
pub use backend::{MemorySlots, SlotStore};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use store::{IntegrityViolation, RecoveryPolicy, Slot, State, Store};
pub use types::*;

// Public modules
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
