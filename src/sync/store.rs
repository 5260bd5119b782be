//! Persistence of syncable records and their sync state.
//!
//! Every state transition the engines make is a single `UPDATE` guarded by
//! the claim token or the record version, so overlapping runs cannot clobber
//! each other's bookkeeping.

use chrono::{Duration, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::Serialize;

use super::identity::{RemoteId, RemoteIdentity};
use super::record::{format_timestamp, now_timestamp, Entity, EntityKind, Record, SYNC_COLUMNS};
use crate::error::ShopSyncError;
use crate::storage::Database;

/// Result of writing one pulled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(i64),
    Updated(i64),
    /// The local row has unpushed edits and was left alone.
    SkippedDirty(i64),
}

/// How an operator settles a create awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The create reached the platform under this id.
    Adopt(RemoteId),
    /// The create never landed; allow a fresh one.
    Clear,
}

/// Per-entity counts for the status view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityStatus {
    pub total: i64,
    /// Dirty records awaiting push.
    pub pending: i64,
    /// Dirty records whose last attempt failed or was skipped.
    pub failing: i64,
    /// Creates sent but never confirmed.
    pub unconfirmed: i64,
}

/// A record whose last push failed or was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRow {
    pub local_id: i64,
    pub remote_id: Option<String>,
    pub dirty: bool,
    pub last_error: String,
}

/// Record access on top of [`Database`].
#[derive(Clone, Copy)]
pub struct RecordStore<'a> {
    db: &'a Database,
}

impl<'a> RecordStore<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn database(&self) -> &'a Database {
        self.db
    }

    /// Load one record with its links.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn load<F: Entity>(&self, local_id: i64) -> Result<Option<Record<F>>, ShopSyncError> {
        let conn = self.db.connection();
        let sql = format!(
            "SELECT {}, {} FROM {} WHERE local_id = ?1",
            SYNC_COLUMNS.join(", "),
            F::COLUMNS.join(", "),
            F::KIND.table()
        );

        let record = conn
            .query_row(&sql, [local_id], |row| Record::from_row(row, F::from_row))
            .optional()
            .map_err(|e| {
                ShopSyncError::Database(format!(
                    "Failed to load {} {local_id}: {e}",
                    F::KIND.singular()
                ))
            })?;

        match record {
            Some(mut record) => {
                record.fields.load_links(conn, local_id)?;
                Ok(Some(record))
            },
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load), but a missing record is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::NotFound`] if no such record exists.
    pub fn get<F: Entity>(&self, local_id: i64) -> Result<Record<F>, ShopSyncError> {
        self.load(local_id)?.ok_or_else(|| not_found(F::KIND, local_id))
    }

    /// Ids of dirty records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn dirty_ids(&self, kind: EntityKind, limit: Option<usize>) -> Result<Vec<i64>, ShopSyncError> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT local_id FROM {} WHERE dirty = 1 ORDER BY local_id ASC LIMIT ?1",
            kind.table()
        );

        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ShopSyncError::Database(format!("Failed to prepare query: {e}")))?;

        let ids = stmt
            .query_map([limit], |row| row.get::<_, i64>(0))
            .and_then(Iterator::collect)
            .map_err(|e| {
                ShopSyncError::Database(format!("Failed to query dirty {kind}: {e}"))
            })?;

        Ok(ids)
    }

    /// Create a record locally with a placeholder identity, pending push.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert<F: Entity>(&self, fields: &F) -> Result<i64, ShopSyncError> {
        let placeholder = RemoteIdentity::new_placeholder();
        self.insert_row(fields, &placeholder, true)
    }

    fn insert_row<F: Entity>(
        &self,
        fields: &F,
        identity: &RemoteIdentity,
        dirty: bool,
    ) -> Result<i64, ShopSyncError> {
        let conn = self.db.connection();
        let now = now_timestamp();
        let synced_at = if dirty { None } else { Some(now.clone()) };

        let columns = F::COLUMNS.join(", ");
        let placeholders = (6..6 + F::COLUMNS.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} (remote_id, dirty, last_synced_at, created_at, updated_at, {columns})
             VALUES (?1, ?2, ?3, ?4, ?5, {placeholders})",
            F::KIND.table()
        );

        let mut values = vec![
            identity
                .as_column()
                .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),
            SqlValue::Integer(i64::from(dirty)),
            synced_at.map_or(SqlValue::Null, SqlValue::Text),
            SqlValue::Text(now.clone()),
            SqlValue::Text(now),
        ];
        values.extend(fields.to_values());

        conn.execute(&sql, params_from_iter(values)).map_err(|e| {
            ShopSyncError::Database(format!("Failed to insert {}: {e}", F::KIND.singular()))
        })?;

        let local_id = conn.last_insert_rowid();
        fields.save_links(conn, local_id)?;
        Ok(local_id)
    }

    /// Apply a local edit: overwrite fields, bump the version, mark dirty.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::NotFound`] if the record does not exist.
    pub fn update<F: Entity>(&self, local_id: i64, fields: &F) -> Result<(), ShopSyncError> {
        let conn = self.db.connection();
        let assignments = assignments::<F>(3);
        let sql = format!(
            "UPDATE {} SET {assignments}, dirty = 1, version = version + 1, updated_at = ?2
             WHERE local_id = ?1",
            F::KIND.table()
        );

        let mut values = vec![SqlValue::Integer(local_id), SqlValue::Text(now_timestamp())];
        values.extend(fields.to_values());

        let changed = conn.execute(&sql, params_from_iter(values)).map_err(|e| {
            ShopSyncError::Database(format!("Failed to update {}: {e}", F::KIND.singular()))
        })?;
        if changed == 0 {
            return Err(not_found(F::KIND, local_id));
        }

        fields.save_links(conn, local_id)?;
        Ok(())
    }

    /// Take the advisory claim on a record.
    ///
    /// Succeeds only if the record is still at `version` and no other push
    /// holds an unexpired claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn claim(
        &self,
        kind: EntityKind,
        local_id: i64,
        version: i64,
        token: &str,
        lease: Duration,
    ) -> Result<bool, ShopSyncError> {
        let now = Utc::now();
        let expired_before = format_timestamp(now - lease);
        let sql = format!(
            "UPDATE {} SET claim_token = ?1, claimed_at = ?2
             WHERE local_id = ?3 AND version = ?4
               AND (claim_token IS NULL OR claimed_at IS NULL OR claimed_at < ?5)",
            kind.table()
        );

        let changed = self
            .db
            .connection()
            .execute(
                &sql,
                params![token, format_timestamp(now), local_id, version, expired_before],
            )
            .map_err(|e| ShopSyncError::Database(format!("Failed to claim {kind} {local_id}: {e}")))?;

        Ok(changed == 1)
    }

    /// Persist that a create request is about to be sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_create_issued(&self, kind: EntityKind, local_id: i64, token: &str) -> Result<(), ShopSyncError> {
        let sql = format!(
            "UPDATE {} SET create_issued_at = ?1 WHERE local_id = ?2 AND claim_token = ?3",
            kind.table()
        );
        self.db
            .connection()
            .execute(&sql, params![now_timestamp(), local_id, token])
            .map_err(|e| ShopSyncError::Database(format!("Failed to mark {kind} {local_id}: {e}")))?;
        Ok(())
    }

    /// Reconcile a successful push.
    ///
    /// Stores the remote id, clears the error, marker and claim, and clears
    /// `dirty` only if no local edit happened since `read_version`. Returns
    /// whether the record is now clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_success(
        &self,
        kind: EntityKind,
        local_id: i64,
        remote_id: &RemoteId,
        read_version: i64,
    ) -> Result<bool, ShopSyncError> {
        let conn = self.db.connection();
        let sql = format!(
            "UPDATE {} SET remote_id = ?1, last_error = NULL, last_synced_at = ?2,
                    create_issued_at = NULL, claim_token = NULL, claimed_at = NULL,
                    dirty = CASE WHEN version = ?3 THEN 0 ELSE dirty END
             WHERE local_id = ?4",
            kind.table()
        );
        conn.execute(
            &sql,
            params![remote_id.as_str(), now_timestamp(), read_version, local_id],
        )
        .map_err(|e| ShopSyncError::Database(format!("Failed to record push of {kind} {local_id}: {e}")))?;

        let dirty: bool = conn
            .query_row(
                &format!("SELECT dirty FROM {} WHERE local_id = ?1", kind.table()),
                [local_id],
                |row| row.get(0),
            )
            .map_err(|e| ShopSyncError::Database(format!("Failed to read {kind} {local_id}: {e}")))?;

        Ok(!dirty)
    }

    /// Reconcile a failed push: store the message and release the claim.
    ///
    /// `dirty` is left set. The create marker is kept when the outcome of a
    /// create is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_failure(
        &self,
        kind: EntityKind,
        local_id: i64,
        message: &str,
        keep_create_marker: bool,
    ) -> Result<(), ShopSyncError> {
        let marker = if keep_create_marker {
            "create_issued_at"
        } else {
            "NULL"
        };
        let sql = format!(
            "UPDATE {} SET last_error = ?1, create_issued_at = {marker},
                    claim_token = NULL, claimed_at = NULL
             WHERE local_id = ?2",
            kind.table()
        );
        self.db
            .connection()
            .execute(&sql, params![message, local_id])
            .map_err(|e| ShopSyncError::Database(format!("Failed to record failure of {kind} {local_id}: {e}")))?;
        Ok(())
    }

    /// Store the reason a push was skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_skip(&self, kind: EntityKind, local_id: i64, message: &str) -> Result<(), ShopSyncError> {
        let sql = format!(
            "UPDATE {} SET last_error = ?1 WHERE local_id = ?2",
            kind.table()
        );
        self.db
            .connection()
            .execute(&sql, params![message, local_id])
            .map_err(|e| ShopSyncError::Database(format!("Failed to record skip of {kind} {local_id}: {e}")))?;
        Ok(())
    }

    /// Local id and dirty flag of the record holding `remote_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_by_remote_id(
        &self,
        kind: EntityKind,
        remote_id: &RemoteId,
    ) -> Result<Option<(i64, bool)>, ShopSyncError> {
        let sql = format!(
            "SELECT local_id, dirty FROM {} WHERE remote_id = ?1",
            kind.table()
        );
        self.db
            .connection()
            .query_row(&sql, [remote_id.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
            .map_err(|e| ShopSyncError::Database(format!("Failed to look up {kind} {remote_id}: {e}")))
    }

    fn find_by_natural_key<F: Entity>(&self, fields: &F) -> Result<Option<(i64, bool)>, ShopSyncError> {
        let Some((clause, values)) = fields.natural_key() else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT local_id, dirty FROM {} WHERE {clause}",
            F::KIND.table()
        );
        self.db
            .connection()
            .query_row(&sql, params_from_iter(values), |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
            .map_err(|e| ShopSyncError::Database(format!("Failed to look up {}: {e}", F::KIND.singular())))
    }

    /// Write a pulled record, keyed by its remote id.
    ///
    /// New records are inserted clean. Existing clean records are
    /// overwritten. Records with unpushed edits are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a query or write fails.
    pub fn upsert_pulled<F: Entity>(&self, remote_id: &RemoteId, fields: &F) -> Result<UpsertOutcome, ShopSyncError> {
        let existing = match self.find_by_remote_id(F::KIND, remote_id)? {
            Some(found) => Some(found),
            None => self.find_by_natural_key(fields)?,
        };

        let Some((local_id, dirty)) = existing else {
            let identity = RemoteIdentity::Synced(remote_id.clone());
            let local_id = self.insert_row(fields, &identity, false)?;
            return Ok(UpsertOutcome::Created(local_id));
        };

        if dirty {
            return Ok(UpsertOutcome::SkippedDirty(local_id));
        }

        let conn = self.db.connection();
        let now = now_timestamp();
        let assignments = assignments::<F>(4);
        let sql = format!(
            "UPDATE {} SET {assignments}, remote_id = ?2, last_synced_at = ?3, updated_at = ?3,
                    version = version + 1
             WHERE local_id = ?1 AND dirty = 0",
            F::KIND.table()
        );

        let mut values = vec![
            SqlValue::Integer(local_id),
            SqlValue::Text(remote_id.as_str().to_string()),
            SqlValue::Text(now),
        ];
        values.extend(fields.to_values());

        let changed = conn.execute(&sql, params_from_iter(values)).map_err(|e| {
            ShopSyncError::Database(format!("Failed to update {}: {e}", F::KIND.singular()))
        })?;

        // A local edit landed between the lookup and the write.
        if changed == 0 {
            return Ok(UpsertOutcome::SkippedDirty(local_id));
        }

        fields.save_links(conn, local_id)?;
        Ok(UpsertOutcome::Updated(local_id))
    }

    /// Mark a record for push again and clear its error.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::NotFound`] if the record does not exist.
    pub fn requeue(&self, kind: EntityKind, local_id: i64) -> Result<(), ShopSyncError> {
        let sql = format!(
            "UPDATE {} SET dirty = 1, last_error = NULL, version = version + 1, updated_at = ?1
             WHERE local_id = ?2",
            kind.table()
        );
        self.execute_on_record(kind, local_id, &sql, params![now_timestamp(), local_id])
    }

    /// Settle a create awaiting confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::NotFound`] if the record does not exist, or
    /// [`ShopSyncError::InvalidInput`] if the id is already used by another
    /// record.
    pub fn resolve(&self, kind: EntityKind, local_id: i64, resolution: &Resolution) -> Result<(), ShopSyncError> {
        match resolution {
            Resolution::Adopt(remote_id) => {
                if let Some((other, _)) = self.find_by_remote_id(kind, remote_id)? {
                    if other != local_id {
                        return Err(ShopSyncError::InvalidInput(format!(
                            "{remote_id} already belongs to {} {other}",
                            kind.singular()
                        )));
                    }
                }
                let sql = format!(
                    "UPDATE {} SET remote_id = ?1, create_issued_at = NULL, last_error = NULL,
                            claim_token = NULL, claimed_at = NULL
                     WHERE local_id = ?2",
                    kind.table()
                );
                self.execute_on_record(kind, local_id, &sql, params![remote_id.as_str(), local_id])
            },
            Resolution::Clear => {
                let sql = format!(
                    "UPDATE {} SET create_issued_at = NULL, last_error = NULL,
                            claim_token = NULL, claimed_at = NULL
                     WHERE local_id = ?1",
                    kind.table()
                );
                self.execute_on_record(kind, local_id, &sql, params![local_id])
            },
        }
    }

    /// Delete a record locally. Nothing is sent to the platform.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::NotFound`] if the record does not exist.
    pub fn forget(&self, kind: EntityKind, local_id: i64) -> Result<(), ShopSyncError> {
        let sql = format!("DELETE FROM {} WHERE local_id = ?1", kind.table());
        self.execute_on_record(kind, local_id, &sql, params![local_id])
    }

    /// Counts for the status view.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn status(&self, kind: EntityKind) -> Result<EntityStatus, ShopSyncError> {
        let sql = format!(
            "SELECT COUNT(*),
                    COALESCE(SUM(dirty = 1), 0),
                    COALESCE(SUM(dirty = 1 AND last_error IS NOT NULL), 0),
                    COALESCE(SUM(create_issued_at IS NOT NULL), 0)
             FROM {}",
            kind.table()
        );
        self.db
            .connection()
            .query_row(&sql, [], |row| {
                Ok(EntityStatus {
                    total: row.get(0)?,
                    pending: row.get(1)?,
                    failing: row.get(2)?,
                    unconfirmed: row.get(3)?,
                })
            })
            .map_err(|e| ShopSyncError::Database(format!("Failed to count {kind}: {e}")))
    }

    /// Records carrying a `last_error`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn errors(&self, kind: EntityKind, limit: usize) -> Result<Vec<ErrorRow>, ShopSyncError> {
        let sql = format!(
            "SELECT local_id, remote_id, dirty, last_error FROM {}
             WHERE last_error IS NOT NULL
             ORDER BY local_id ASC
             LIMIT ?1",
            kind.table()
        );
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ShopSyncError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok(ErrorRow {
                    local_id: row.get(0)?,
                    remote_id: row.get(1)?,
                    dirty: row.get(2)?,
                    last_error: row.get(3)?,
                })
            })
            .and_then(Iterator::collect)
            .map_err(|e| ShopSyncError::Database(format!("Failed to query {kind} errors: {e}")))?;

        Ok(rows)
    }

    fn execute_on_record(
        &self,
        kind: EntityKind,
        local_id: i64,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<(), ShopSyncError> {
        let changed = self
            .db
            .connection()
            .execute(sql, params)
            .map_err(|e| ShopSyncError::Database(format!("Failed to write {kind} {local_id}: {e}")))?;

        if changed == 0 {
            return Err(not_found(kind, local_id));
        }
        Ok(())
    }
}

/// `col = ?n` list for the entity columns, numbered from `first`.
fn assignments<F: Entity>(first: usize) -> String {
    F::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", first + i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn not_found(kind: EntityKind, local_id: i64) -> ShopSyncError {
    ShopSyncError::NotFound(format!("{} {local_id}", kind.singular()))
}
