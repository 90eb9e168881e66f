//! Database layer for Life OS
//!
//! This module provides the SQLite slot backend with:
//! - Schema migrations
//! - Transactional batch writes for collection snapshots

pub mod repo;
pub mod schema;

pub use repo::{Database, SlotInfo};
