//! Batch coordinator: push every dirty record of one entity type.
//!
//! Records are visited once each, in insertion order, sequentially. One
//! record's failure never stops the batch.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info};

use super::push::{PushAction, PushEngine, PushOutcome, PushResult};
use super::record::EntityKind;
use crate::error::ShopSyncError;

/// Options for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Visit at most this many dirty records.
    pub limit: Option<usize>,
    /// Plan each push without calls or writes.
    pub dry_run: bool,
}

/// A record that did not push successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub local_id: i64,
    pub message: String,
}

/// Aggregate result of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub entity: EntityKind,
    pub dry_run: bool,
    pub total: usize,
    pub success_count: usize,
    /// Failures plus skips.
    pub error_count: usize,
    /// Skips, also counted in `error_count`.
    pub skipped_count: usize,
    pub errors: Vec<BatchError>,
    pub results: Vec<PushResult>,
}

impl BatchResult {
    #[must_use]
    pub const fn empty(entity: EntityKind, dry_run: bool) -> Self {
        Self {
            entity,
            dry_run,
            total: 0,
            success_count: 0,
            error_count: 0,
            skipped_count: 0,
            errors: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Add one push result.
    pub fn add(&mut self, result: PushResult) {
        self.total += 1;
        if result.outcome.is_success() {
            self.success_count += 1;
        } else {
            self.error_count += 1;
            if result.outcome.is_skipped() {
                self.skipped_count += 1;
            }
            self.errors.push(BatchError {
                local_id: result.local_id,
                message: result.outcome.message().unwrap_or_default().to_string(),
            });
        }
        self.results.push(result);
    }

    /// Add a record whose push could not run at all.
    pub fn add_error(&mut self, local_id: i64, message: String) {
        self.total += 1;
        self.error_count += 1;
        self.errors.push(BatchError { local_id, message });
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Drives the push engine across dirty records.
pub struct BatchCoordinator<'a> {
    engine: &'a PushEngine<'a>,
    options: BatchOptions,
}

impl<'a> BatchCoordinator<'a> {
    #[must_use]
    pub const fn new(engine: &'a PushEngine<'a>) -> Self {
        Self {
            engine,
            options: BatchOptions {
                limit: None,
                dry_run: false,
            },
        }
    }

    #[must_use]
    pub const fn with_options(engine: &'a PushEngine<'a>, options: BatchOptions) -> Self {
        Self { engine, options }
    }

    /// Push every dirty record of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the dirty records cannot be listed. Failures
    /// on individual records are reported in the result.
    pub fn push_all_pending(&self, kind: EntityKind) -> Result<BatchResult, ShopSyncError> {
        self.run(kind, &HashSet::new())
    }

    /// Run [`push_all_pending`](Self::push_all_pending) for every entity type,
    /// parents first. A dry run treats records planned for create earlier in
    /// the run as synced parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the dirty records of a type cannot be listed.
    pub fn push_everything(&self) -> Result<Vec<BatchResult>, ShopSyncError> {
        let mut planned_creates = HashSet::new();
        let mut batches = Vec::with_capacity(EntityKind::ALL.len());

        for kind in EntityKind::ALL {
            let batch = self.run(kind, &planned_creates)?;
            if self.options.dry_run {
                planned_creates.extend(
                    batch
                        .results
                        .iter()
                        .filter(|result| {
                            matches!(
                                result.outcome,
                                PushOutcome::Planned {
                                    action: PushAction::Create,
                                    ..
                                }
                            )
                        })
                        .map(|result| (result.entity, result.local_id)),
                );
            }
            batches.push(batch);
        }

        Ok(batches)
    }

    fn run(
        &self,
        kind: EntityKind,
        planned_creates: &HashSet<(EntityKind, i64)>,
    ) -> Result<BatchResult, ShopSyncError> {
        let ids = self.engine.store().dirty_ids(kind, self.options.limit)?;
        let mut batch = BatchResult::empty(kind, self.options.dry_run);

        info!(entity = %kind, pending = ids.len(), dry_run = self.options.dry_run, "batch started");

        for local_id in ids {
            let result = if self.options.dry_run {
                self.engine.plan_one_after(kind, local_id, planned_creates)
            } else {
                self.engine.push_one(kind, local_id)
            };

            match result {
                Ok(result) => batch.add(result),
                Err(err) => {
                    error!(entity = %kind, local_id, "push aborted: {err}");
                    batch.add_error(local_id, err.to_string());
                },
            }
        }

        info!(
            entity = %kind,
            total = batch.total,
            succeeded = batch.success_count,
            errors = batch.error_count,
            skipped = batch.skipped_count,
            "batch finished"
        );
        Ok(batch)
    }
}
