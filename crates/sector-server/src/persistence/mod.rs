//! Persistence layer for the task ledger.
//!
//! SQLite-backed snapshot storage. The in-memory ledger never waits on the
//! database for reads; saves happen after mutations and failures are logged,
//! not propagated.

pub mod db;
pub mod tasks;

pub use db::{init_database, Database};
