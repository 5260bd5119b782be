//! Output formatting for shopsync.
//!
//! This module provides formatters for displaying sync results in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::ShopSyncError;
use crate::sync::{BatchResult, EntityKind, EntityStatus, ErrorRow, PullStats, PushResult};

pub use json::*;
pub use pretty::*;

/// Format per-entity status based on output format
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_status(
    rows: &[(EntityKind, EntityStatus)],
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(rows)),
        OutputFormat::Json => format_status_json(rows),
    }
}

/// Format batch results based on output format
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_batches(batches: &[BatchResult], format: OutputFormat) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_batches_pretty(batches)),
        OutputFormat::Json => format_batches_json(batches),
    }
}

/// Format a single push result based on output format
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_push_result(result: &PushResult, format: OutputFormat) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_push_result_pretty(result)),
        OutputFormat::Json => format_push_result_json(result),
    }
}

/// Format pull statistics based on output format
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_pull_stats(stats: &[PullStats], format: OutputFormat) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_pull_stats_pretty(stats)),
        OutputFormat::Json => format_pull_stats_json(stats),
    }
}

/// Format failing records based on output format
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_errors(
    kind: EntityKind,
    rows: &[ErrorRow],
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_errors_pretty(kind, rows)),
        OutputFormat::Json => format_errors_json(kind, rows),
    }
}
