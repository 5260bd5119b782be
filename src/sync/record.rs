//! The syncable record shape shared by every entity.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row};
use serde::Serialize;

use super::identity::RemoteIdentity;

/// Entity types the engine can push and pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Customers,
    Addresses,
    Products,
    SellingPlans,
    Inventory,
}

impl EntityKind {
    /// Every kind, parents before children.
    pub const ALL: [Self; 5] = [
        Self::Customers,
        Self::Addresses,
        Self::Products,
        Self::SellingPlans,
        Self::Inventory,
    ];

    /// Backing table.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Addresses => "addresses",
            Self::Products => "products",
            Self::SellingPlans => "selling_plans",
            Self::Inventory => "inventory_levels",
        }
    }

    /// Singular name for messages.
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Customers => "customer",
            Self::Addresses => "address",
            Self::Products => "product",
            Self::SellingPlans => "selling plan",
            Self::Inventory => "inventory level",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Customers => "customers",
            Self::Addresses => "addresses",
            Self::Products => "products",
            Self::SellingPlans => "selling-plans",
            Self::Inventory => "inventory",
        };
        f.write_str(name)
    }
}

/// Sync bookkeeping columns carried by every syncable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub identity: RemoteIdentity,
    /// Local changes not yet reflected remotely.
    pub dirty: bool,
    /// Diagnostic from the most recent failed or skipped push.
    pub last_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Bumped by every local edit.
    pub version: i64,
    /// Token of the push currently holding the record.
    pub claim_token: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    /// Set while a create request is awaiting confirmation.
    pub create_issued_at: Option<DateTime<Utc>>,
}

/// A local row: identity, sync state and entity fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<F> {
    pub local_id: i64,
    pub sync: SyncState,
    pub fields: F,
}

/// Columns selected ahead of the entity columns, in order.
pub const SYNC_COLUMNS: [&str; 9] = [
    "local_id",
    "remote_id",
    "dirty",
    "last_error",
    "last_synced_at",
    "version",
    "claim_token",
    "claimed_at",
    "create_issued_at",
];

impl<F> Record<F> {
    /// Decode the sync columns, then the entity columns with `decode`.
    pub(crate) fn from_row(
        row: &Row<'_>,
        decode: impl FnOnce(&Row<'_>, usize) -> rusqlite::Result<F>,
    ) -> rusqlite::Result<Self> {
        let remote_id: Option<String> = row.get(1)?;
        Ok(Self {
            local_id: row.get(0)?,
            sync: SyncState {
                identity: RemoteIdentity::from_column(remote_id.as_deref()),
                dirty: row.get(2)?,
                last_error: row.get(3)?,
                last_synced_at: parse_timestamp(row.get(4)?),
                version: row.get(5)?,
                claim_token: row.get(6)?,
                claimed_at: parse_timestamp(row.get(7)?),
                create_issued_at: parse_timestamp(row.get(8)?),
            },
            fields: decode(row, SYNC_COLUMNS.len())?,
        })
    }
}

/// Entity-specific columns of a syncable table.
pub trait Entity: Sized {
    const KIND: EntityKind;

    /// Entity columns, in the order of [`to_values`](Self::to_values).
    const COLUMNS: &'static [&'static str];

    /// Decode the entity columns starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column has an unexpected type.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;

    /// Values for [`COLUMNS`](Self::COLUMNS).
    fn to_values(&self) -> Vec<SqlValue>;

    /// Identifying columns besides `remote_id`, as a `WHERE` fragment and
    /// its parameters. Pulled rows fall back to this match.
    fn natural_key(&self) -> Option<(&'static str, Vec<SqlValue>)> {
        None
    }

    /// Load rows from link tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn load_links(&mut self, _conn: &Connection, _local_id: i64) -> rusqlite::Result<()> {
        Ok(())
    }

    /// Replace rows in link tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save_links(&self, _conn: &Connection, _local_id: i64) -> rusqlite::Result<()> {
        Ok(())
    }
}

/// Format a timestamp for storage.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, formatted for storage.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp; unreadable values are treated as absent.
#[must_use]
pub fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split a comma-separated tag column.
#[must_use]
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
