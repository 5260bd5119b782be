//! Storage layer for shopsync.
//!
//! `SQLite` persistence for the syncable records. The dirty flag on each row
//! is the durable work queue; there is no separate in-memory queue.

mod database;
mod migrations;

pub use database::Database;
