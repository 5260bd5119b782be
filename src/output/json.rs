//! JSON output formatting for shopsync.
//!
//! Machine-readable renderings of sync results, for scripting.

use serde::Serialize;
use serde_json::json;

use crate::error::ShopSyncError;
use crate::sync::{BatchResult, EntityKind, EntityStatus, ErrorRow, PullStats, PushResult};

/// Format per-entity sync status as JSON
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_status_json(rows: &[(EntityKind, EntityStatus)]) -> Result<String, ShopSyncError> {
    let entities: Vec<_> = rows
        .iter()
        .map(|(kind, status)| {
            json!({
                "entity": kind,
                "total": status.total,
                "pending": status.pending,
                "failing": status.failing,
                "unconfirmed": status.unconfirmed,
            })
        })
        .collect();
    let output = json!({
        "count": entities.len(),
        "entities": entities
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format batch results as JSON
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_batches_json(batches: &[BatchResult]) -> Result<String, ShopSyncError> {
    let output = json!({
        "total": batches.iter().map(|b| b.total).sum::<usize>(),
        "success_count": batches.iter().map(|b| b.success_count).sum::<usize>(),
        "error_count": batches.iter().map(|b| b.error_count).sum::<usize>(),
        "batches": batches
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format a single push result as JSON
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_push_result_json(result: &PushResult) -> Result<String, ShopSyncError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Format pull statistics as JSON
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_pull_stats_json(stats: &[PullStats]) -> Result<String, ShopSyncError> {
    let output = json!({
        "count": stats.len(),
        "pulls": stats
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format failing records as JSON
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn format_errors_json(kind: EntityKind, rows: &[ErrorRow]) -> Result<String, ShopSyncError> {
    let output = json!({
        "entity": kind,
        "count": rows.len(),
        "items": rows
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `ShopSyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ShopSyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}
