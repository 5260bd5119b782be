//! Push engine: make one record's remote representation match the local one.
//!
//! The engine never returns `Err` for expected remote failures. Transport,
//! throttling, graph and validation errors, and every skip guard, come back as
//! a [`PushOutcome`]; `Err` means the local database failed or the record does
//! not exist.

use std::collections::HashSet;

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::entities::with_entity;
use super::identity::{RemoteId, RemoteIdentity};
use super::record::{format_timestamp, Entity, EntityKind, Record};
use super::store::RecordStore;
use crate::error::ShopSyncError;
use crate::remote::{ApiError, ErrorKind, GraphClient};
use crate::storage::Database;

/// Default claim lease.
const DEFAULT_LEASE_SECS: i64 = 300;

/// One mutation request and where to find the created id in its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub document: &'static str,
    /// Root field of the mutation, e.g. `customerCreate`.
    pub field: &'static str,
    /// JSON pointer to the created object's id inside the payload.
    pub id_pointer: &'static str,
    pub variables: Value,
}

impl Mutation {
    #[must_use]
    pub const fn new(
        document: &'static str,
        field: &'static str,
        id_pointer: &'static str,
        variables: Value,
    ) -> Self {
        Self {
            document,
            field,
            id_pointer,
            variables,
        }
    }

    fn created_id(&self, payload: &Value) -> Option<RemoteId> {
        payload
            .pointer(self.id_pointer)
            .and_then(Value::as_str)
            .and_then(|id| RemoteId::parse(id).ok())
    }
}

/// Outcome of checking a record's parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentCheck<P> {
    /// Every parent is synced; carries their remote ids.
    Ready(P),
    /// A parent is missing or not yet synced.
    Missing(String),
}

/// Create or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAction {
    Create,
    Update,
}

/// Why a push was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record's own id is reserved for fixtures.
    InvalidIdentity,
    /// A parent has no remote id yet.
    MissingParent,
    /// Another push holds the record, or it changed since it was read.
    Claimed,
    /// An earlier create was sent but never confirmed.
    UnconfirmedCreate,
}

impl SkipReason {
    /// Whether the reason is written to the record's `last_error`.
    const fn is_recorded(self) -> bool {
        matches!(self, Self::MissingParent | Self::UnconfirmedCreate)
    }
}

/// Result of one push attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    Created {
        remote_id: RemoteId,
        /// False if a local edit landed during the call; the record stays dirty.
        clean: bool,
    },
    Updated {
        remote_id: RemoteId,
        clean: bool,
    },
    Skipped {
        reason: SkipReason,
        message: String,
    },
    Failed {
        error: ErrorKind,
        message: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },
    /// Dry run: what a push would do.
    Planned {
        action: PushAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        remote_id: Option<RemoteId>,
    },
}

impl PushOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Created { .. } | Self::Updated { .. } | Self::Planned { .. }
        )
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Operator-facing message for skips and failures.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Skipped { message, .. } | Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A push outcome tagged with the record it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushResult {
    pub entity: EntityKind,
    pub local_id: i64,
    pub outcome: PushOutcome,
    /// Failure of a dependent mutation after a successful primary push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_error: Option<String>,
}

impl PushResult {
    #[must_use]
    pub const fn new(entity: EntityKind, local_id: i64, outcome: PushOutcome) -> Self {
        Self {
            entity,
            local_id,
            outcome,
            secondary_error: None,
        }
    }
}

/// Entity-specific push mapping.
pub trait Pushable: Entity {
    /// Remote ids of the parents a mutation refers to.
    type Parents;

    /// Check that every parent is synced.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent cannot be loaded.
    fn resolve_parents(
        store: &RecordStore<'_>,
        record: &Record<Self>,
    ) -> Result<ParentCheck<Self::Parents>, ShopSyncError>;

    /// Mutation creating the remote object.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables cannot be encoded.
    fn create_mutation(
        record: &Record<Self>,
        parents: &Self::Parents,
    ) -> Result<Mutation, ShopSyncError>;

    /// Mutation overwriting the remote object.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables cannot be encoded.
    fn update_mutation(
        record: &Record<Self>,
        remote_id: &RemoteId,
        parents: &Self::Parents,
    ) -> Result<Mutation, ShopSyncError>;

    /// Dependent mutations issued after a successful primary push, in order.
    /// `payload` is the primary mutation's payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables cannot be encoded.
    fn follow_ups(
        _record: &Record<Self>,
        _remote_id: &RemoteId,
        _parents: &Self::Parents,
        _action: PushAction,
        _payload: &Value,
    ) -> Result<Vec<Mutation>, ShopSyncError> {
        Ok(Vec::new())
    }

    /// Store extra ids returned by a successful create or update.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn record_pushed(
        _store: &RecordStore<'_>,
        _local_id: i64,
        _payload: &Value,
    ) -> Result<(), ShopSyncError> {
        Ok(())
    }

    /// Local records this record's parents are, for dry runs that create
    /// them first.
    fn parent_refs(_record: &Record<Self>) -> Vec<(EntityKind, i64)> {
        Vec::new()
    }
}

enum Decision<P> {
    Create(P),
    Update(RemoteId, P),
    Skip(SkipReason, String),
}

/// Pushes single records.
pub struct PushEngine<'a> {
    client: &'a dyn GraphClient,
    store: RecordStore<'a>,
    lease: Duration,
}

impl<'a> PushEngine<'a> {
    #[must_use]
    pub fn new(client: &'a dyn GraphClient, db: &'a Database) -> Self {
        Self {
            client,
            store: RecordStore::new(db),
            lease: Duration::seconds(DEFAULT_LEASE_SECS),
        }
    }

    /// Set how long a claim stays valid.
    #[must_use]
    pub const fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    #[must_use]
    pub const fn store(&self) -> RecordStore<'a> {
        self.store
    }

    /// Push one record of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the local database
    /// fails.
    pub fn push_one(&self, kind: EntityKind, local_id: i64) -> Result<PushResult, ShopSyncError> {
        with_entity!(kind, F => self.push::<F>(local_id))
    }

    /// Decide what pushing one record would do, without calls or writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the local database
    /// fails.
    pub fn plan_one(&self, kind: EntityKind, local_id: i64) -> Result<PushResult, ShopSyncError> {
        with_entity!(kind, F => self.plan::<F>(local_id))
    }

    /// Dry-run counterpart of [`push`](Self::push).
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the local database
    /// fails.
    pub fn plan<F: Pushable>(&self, local_id: i64) -> Result<PushResult, ShopSyncError> {
        self.plan_after::<F>(local_id, &HashSet::new())
    }

    /// [`plan_one`](Self::plan_one) inside a dry run that has already planned
    /// `planned_creates`. A record whose unsynced parents are all among them
    /// plans as ready instead of `MissingParent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the local database
    /// fails.
    pub fn plan_one_after(
        &self,
        kind: EntityKind,
        local_id: i64,
        planned_creates: &HashSet<(EntityKind, i64)>,
    ) -> Result<PushResult, ShopSyncError> {
        with_entity!(kind, F => self.plan_after::<F>(local_id, planned_creates))
    }

    fn plan_after<F: Pushable>(
        &self,
        local_id: i64,
        planned_creates: &HashSet<(EntityKind, i64)>,
    ) -> Result<PushResult, ShopSyncError> {
        let record = self.store.get::<F>(local_id)?;
        let planned = |remote_id: Option<RemoteId>| PushOutcome::Planned {
            action: if remote_id.is_some() {
                PushAction::Update
            } else {
                PushAction::Create
            },
            remote_id,
        };

        let outcome = match self.decide(&record)? {
            Decision::Skip(SkipReason::MissingParent, _)
                if self.parents_planned(&record, planned_creates)? =>
            {
                planned(record.sync.identity.remote_id().cloned())
            },
            Decision::Skip(reason, message) => PushOutcome::Skipped { reason, message },
            Decision::Create(_) => planned(None),
            Decision::Update(remote_id, _) => planned(Some(remote_id)),
        };

        Ok(PushResult::new(F::KIND, local_id, outcome))
    }

    /// Whether every parent is synced or planned for create.
    fn parents_planned<F: Pushable>(
        &self,
        record: &Record<F>,
        planned_creates: &HashSet<(EntityKind, i64)>,
    ) -> Result<bool, ShopSyncError> {
        let parents = F::parent_refs(record);
        if parents.is_empty() || planned_creates.is_empty() {
            return Ok(false);
        }

        for (kind, local_id) in parents {
            if planned_creates.contains(&(kind, local_id)) {
                continue;
            }
            let synced = with_entity!(kind, P => self
                .store
                .load::<P>(local_id)?
                .is_some_and(|parent| parent.sync.identity.is_synced()));
            if !synced {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Push one record and reconcile the result onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the local database
    /// fails.
    pub fn push<F: Pushable>(&self, local_id: i64) -> Result<PushResult, ShopSyncError> {
        let kind = F::KIND;
        let record = self.store.get::<F>(local_id)?;

        let (parents, existing) = match self.decide(&record)? {
            Decision::Skip(reason, message) => {
                if reason.is_recorded() {
                    self.store.record_skip(kind, local_id, &message)?;
                }
                info!(entity = %kind, local_id, reason = ?reason, "push skipped: {message}");
                return Ok(PushResult::new(
                    kind,
                    local_id,
                    PushOutcome::Skipped { reason, message },
                ));
            },
            Decision::Create(parents) => (parents, None),
            Decision::Update(remote_id, parents) => (parents, Some(remote_id)),
        };

        let mutation = match &existing {
            Some(remote_id) => F::update_mutation(&record, remote_id, &parents)?,
            None => F::create_mutation(&record, &parents)?,
        };
        let action = if existing.is_some() {
            PushAction::Update
        } else {
            PushAction::Create
        };

        let token = Uuid::new_v4().to_string();
        if !self
            .store
            .claim(kind, local_id, record.sync.version, &token, self.lease)?
        {
            let message =
                "record is being pushed by another run or was edited since it was read".to_string();
            info!(entity = %kind, local_id, "push skipped: claimed");
            return Ok(PushResult::new(
                kind,
                local_id,
                PushOutcome::Skipped {
                    reason: SkipReason::Claimed,
                    message,
                },
            ));
        }

        if action == PushAction::Create {
            self.store.mark_create_issued(kind, local_id, &token)?;
        }

        debug!(
            entity = %kind,
            local_id,
            action = ?action,
            mutation = mutation.field,
            "sending mutation"
        );
        let payload = self
            .client
            .execute(mutation.document, &mutation.variables)
            .and_then(|response| response.mutation_payload(mutation.field).cloned());

        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                let unconfirmed = action == PushAction::Create
                    && matches!(err, ApiError::Transport { timed_out: true, .. });
                return self.fail(kind, local_id, &err, unconfirmed);
            },
        };

        let remote_id = match existing {
            Some(remote_id) => remote_id,
            None => match mutation.created_id(&payload) {
                Some(remote_id) => remote_id,
                None => {
                    let err = ApiError::graph(format!(
                        "{} succeeded without returning an id",
                        mutation.field
                    ));
                    return self.fail(kind, local_id, &err, true);
                },
            },
        };

        let clean = self
            .store
            .record_success(kind, local_id, &remote_id, record.sync.version)?;
        F::record_pushed(&self.store, local_id, &payload)?;

        info!(
            entity = %kind,
            local_id,
            remote_id = %remote_id,
            action = ?action,
            clean,
            "push succeeded"
        );

        let failures: Vec<String> = F::follow_ups(&record, &remote_id, &parents, action, &payload)?
            .iter()
            .filter_map(|follow_up| self.run_follow_up(kind, local_id, follow_up))
            .collect();
        let secondary_error = (!failures.is_empty()).then(|| failures.join("; "));

        let outcome = match action {
            PushAction::Create => PushOutcome::Created { remote_id, clean },
            PushAction::Update => PushOutcome::Updated { remote_id, clean },
        };

        Ok(PushResult {
            entity: kind,
            local_id,
            outcome,
            secondary_error,
        })
    }

    fn decide<F: Pushable>(&self, record: &Record<F>) -> Result<Decision<F::Parents>, ShopSyncError> {
        if let RemoteIdentity::Reserved(value) = &record.sync.identity {
            return Ok(Decision::Skip(
                SkipReason::InvalidIdentity,
                format!("'{value}' is a reserved fixture id and is never pushed"),
            ));
        }

        if let Some(issued_at) = record.sync.create_issued_at {
            if !record.sync.identity.is_synced() {
                return Ok(Decision::Skip(
                    SkipReason::UnconfirmedCreate,
                    format!(
                        "create sent at {} was never confirmed; check the platform, then run \
                         `shopsync resolve {} {} --remote-id <id>` or `--clear`",
                        format_timestamp(issued_at),
                        F::KIND,
                        record.local_id
                    ),
                ));
            }
        }

        let parents = match F::resolve_parents(&self.store, record)? {
            ParentCheck::Ready(parents) => parents,
            ParentCheck::Missing(message) => {
                return Ok(Decision::Skip(SkipReason::MissingParent, message));
            },
        };

        Ok(match record.sync.identity.remote_id() {
            Some(remote_id) => Decision::Update(remote_id.clone(), parents),
            None => Decision::Create(parents),
        })
    }

    fn fail(
        &self,
        kind: EntityKind,
        local_id: i64,
        err: &ApiError,
        unconfirmed: bool,
    ) -> Result<PushResult, ShopSyncError> {
        let mut message = err.to_string();
        if unconfirmed {
            message.push_str(" (the create may have reached the platform; check before retrying)");
        }

        self.store
            .record_failure(kind, local_id, &message, unconfirmed)?;

        warn!(
            entity = %kind,
            local_id,
            error_kind = %err.kind(),
            retryable = err.is_retryable(),
            "push failed: {message}"
        );

        let retry_after_ms = match err {
            ApiError::RateLimited { retry_after, .. } => retry_after
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            _ => None,
        };

        Ok(PushResult::new(
            kind,
            local_id,
            PushOutcome::Failed {
                error: err.kind(),
                message,
                retryable: err.is_retryable(),
                retry_after_ms,
            },
        ))
    }

    /// Run a dependent mutation. Failure is logged and returned, never rolled
    /// back onto the primary result.
    fn run_follow_up(&self, kind: EntityKind, local_id: i64, mutation: &Mutation) -> Option<String> {
        let result = self
            .client
            .execute(mutation.document, &mutation.variables)
            .and_then(|response| response.mutation_payload(mutation.field).map(|_| ()));

        match result {
            Ok(()) => {
                debug!(entity = %kind, local_id, mutation = mutation.field, "follow-up succeeded");
                None
            },
            Err(err) => {
                let message = format!("{} failed: {err}", mutation.field);
                warn!(entity = %kind, local_id, "{message}; needs manual follow-up");
                Some(message)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::always;
    use serde_json::json;

    use super::*;
    use crate::remote::{FieldError, GraphResponse, MockGraphClient};
    use crate::sync::entities::{AddressFields, CustomerFields, InventoryLevelFields};

    fn customer(email: &str) -> CustomerFields {
        CustomerFields {
            email: email.to_string(),
            last_name: "Lovelace".to_string(),
            ..CustomerFields::default()
        }
    }

    fn synced_customer(store: &RecordStore<'_>, remote_id: &str) -> i64 {
        match store
            .upsert_pulled(&RemoteId::parse(remote_id).unwrap(), &customer("c@example.com"))
            .unwrap()
        {
            crate::sync::store::UpsertOutcome::Created(id) => id,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn address(customer_id: i64, is_default: bool) -> AddressFields {
        AddressFields {
            customer_id,
            address1: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            country_code: "US".to_string(),
            is_default,
            ..AddressFields::default()
        }
    }

    fn created(field: &str, object: &str, id: &str) -> GraphResponse {
        GraphResponse::with_data(json!({
            field: { object: { "id": id }, "userErrors": [] }
        }))
    }

    #[test]
    fn test_create_assigns_remote_id_and_clears_dirty() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client
            .expect_execute()
            .times(1)
            .withf(|document, variables| {
                document.contains("customerCreate") && variables["input"].get("id").is_none()
            })
            .returning(|_, _| Ok(created("customerCreate", "customer", "cust_900")));

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("ada@example.com")).unwrap();

        let result = engine.push::<CustomerFields>(id).unwrap();

        assert_eq!(
            result.outcome,
            PushOutcome::Created {
                remote_id: RemoteId::parse("cust_900").unwrap(),
                clean: true
            }
        );
        let record = engine.store().get::<CustomerFields>(id).unwrap();
        assert_eq!(record.sync.identity.as_column(), Some("cust_900"));
        assert!(!record.sync.dirty);
        assert!(record.sync.last_error.is_none());
        assert!(record.sync.last_synced_at.is_some());
        assert!(record.sync.create_issued_at.is_none());
        assert!(record.sync.claim_token.is_none());
    }

    #[test]
    fn test_synced_record_always_routes_to_update() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, _| document.contains("customerCreate"))
            .returning(|_, _| Ok(created("customerCreate", "customer", "cust_900")));
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, variables| {
                document.contains("customerUpdate") && variables["input"]["id"] == "cust_900"
            })
            .returning(|_, _| Ok(created("customerUpdate", "customer", "cust_900")));

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let id = store.insert(&customer("ada@example.com")).unwrap();

        engine.push::<CustomerFields>(id).unwrap();
        store.update(id, &customer("ada@lovelace.dev")).unwrap();
        let result = engine.push::<CustomerFields>(id).unwrap();

        assert!(matches!(result.outcome, PushOutcome::Updated { clean: true, .. }));
        let record = store.get::<CustomerFields>(id).unwrap();
        assert_eq!(record.sync.identity.as_column(), Some("cust_900"));
        assert!(!record.sync.dirty);
    }

    #[test]
    fn test_reserved_identity_is_never_sent() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().never();

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("fixture@example.com")).unwrap();
        db.connection()
            .execute(
                "UPDATE customers SET remote_id = 'test_customer_1' WHERE local_id = ?1",
                [id],
            )
            .unwrap();

        let result = engine.push::<CustomerFields>(id).unwrap();

        assert!(matches!(
            result.outcome,
            PushOutcome::Skipped {
                reason: SkipReason::InvalidIdentity,
                ..
            }
        ));
        assert!(engine.store().get::<CustomerFields>(id).unwrap().sync.dirty);
    }

    #[test]
    fn test_address_of_unsynced_customer_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().never();

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let customer_id = store.insert(&customer("ada@example.com")).unwrap();
        let address_id = store.insert(&address(customer_id, false)).unwrap();

        let result = engine.push::<AddressFields>(address_id).unwrap();

        assert!(matches!(
            result.outcome,
            PushOutcome::Skipped {
                reason: SkipReason::MissingParent,
                ..
            }
        ));
        let record = store.get::<AddressFields>(address_id).unwrap();
        assert!(record.sync.dirty);
        assert!(record.sync.last_error.unwrap().contains("customer"));
    }

    #[test]
    fn test_customer_then_placeholder_address() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, _| document.contains("customerCreate"))
            .returning(|_, _| Ok(created("customerCreate", "customer", "cust_900")));
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, variables| {
                document.contains("customerAddressCreate")
                    && variables["customerId"] == "cust_900"
                    && !variables.to_string().contains("temp_")
            })
            .returning(|_, _| Ok(created("customerAddressCreate", "address", "addr_55")));

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let customer_id = store.insert(&customer("ada@example.com")).unwrap();
        db.connection()
            .execute(
                "UPDATE customers SET remote_id = NULL WHERE local_id = ?1",
                [customer_id],
            )
            .unwrap();
        let address_id = store.insert(&address(customer_id, false)).unwrap();
        db.connection()
            .execute(
                "UPDATE addresses SET remote_id = 'temp_123' WHERE local_id = ?1",
                [address_id],
            )
            .unwrap();

        let customer_result = engine.push::<CustomerFields>(customer_id).unwrap();
        assert!(matches!(customer_result.outcome, PushOutcome::Created { .. }));
        let customer_record = store.get::<CustomerFields>(customer_id).unwrap();
        assert_eq!(customer_record.sync.identity.as_column(), Some("cust_900"));
        assert!(!customer_record.sync.dirty);

        let address_result = engine.push::<AddressFields>(address_id).unwrap();
        assert!(matches!(address_result.outcome, PushOutcome::Created { .. }));
        let address_record = store.get::<AddressFields>(address_id).unwrap();
        assert_eq!(address_record.sync.identity.as_column(), Some("addr_55"));
        assert!(!address_record.sync.dirty);
    }

    #[test]
    fn test_validation_failure_is_recorded() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().times(1).returning(|_, _| {
            Ok(GraphResponse::with_data(json!({
                "customerCreate": {
                    "customer": null,
                    "userErrors": [
                        { "field": ["input", "email"], "message": "has already been taken" }
                    ]
                }
            })))
        });

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("ada@example.com")).unwrap();

        let result = engine.push::<CustomerFields>(id).unwrap();

        match result.outcome {
            PushOutcome::Failed {
                error, retryable, ..
            } => {
                assert_eq!(error, ErrorKind::Validation);
                assert!(!retryable);
            },
            other => panic!("expected failure, got {other:?}"),
        }
        let record = engine.store().get::<CustomerFields>(id).unwrap();
        assert!(record.sync.dirty);
        assert_eq!(
            record.sync.last_error.as_deref(),
            Some("validation failed: email: has already been taken")
        );
        assert!(record.sync.create_issued_at.is_none());
        assert!(!record.sync.identity.is_synced());
    }

    #[test]
    fn test_rate_limit_is_retryable_with_delay() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().times(1).returning(|_, _| {
            Err(ApiError::rate_limited(
                "HTTP 429",
                Some(std::time::Duration::from_secs(2)),
            ))
        });

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("ada@example.com")).unwrap();

        let result = engine.push::<CustomerFields>(id).unwrap();

        assert!(matches!(
            result.outcome,
            PushOutcome::Failed {
                error: ErrorKind::RateLimited,
                retryable: true,
                retry_after_ms: Some(2000),
                ..
            }
        ));
        assert!(engine.store().get::<CustomerFields>(id).unwrap().sync.dirty);
    }

    #[test]
    fn test_timed_out_create_blocks_recreate_until_resolved() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(ApiError::Transport {
                    message: "operation timed out".to_string(),
                    timed_out: true,
                })
            });
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, variables| {
                document.contains("customerUpdate") && variables["input"]["id"] == "cust_901"
            })
            .returning(|_, _| Ok(created("customerUpdate", "customer", "cust_901")));

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let id = store.insert(&customer("ada@example.com")).unwrap();

        let first = engine.push::<CustomerFields>(id).unwrap();
        assert!(matches!(
            first.outcome,
            PushOutcome::Failed {
                retryable: true,
                ..
            }
        ));
        assert!(store.get::<CustomerFields>(id).unwrap().sync.create_issued_at.is_some());

        // No second create while the first is unconfirmed
        let second = engine.push::<CustomerFields>(id).unwrap();
        assert!(matches!(
            second.outcome,
            PushOutcome::Skipped {
                reason: SkipReason::UnconfirmedCreate,
                ..
            }
        ));

        store
            .resolve(
                EntityKind::Customers,
                id,
                &crate::sync::store::Resolution::Adopt(RemoteId::parse("cust_901").unwrap()),
            )
            .unwrap();

        let third = engine.push::<CustomerFields>(id).unwrap();
        assert!(matches!(third.outcome, PushOutcome::Updated { .. }));
        assert!(!store.get::<CustomerFields>(id).unwrap().sync.dirty);
    }

    #[test]
    fn test_plain_transport_failure_clears_create_marker() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client
            .expect_execute()
            .times(1)
            .returning(|_, _| Err(ApiError::transport("connection refused")));

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("ada@example.com")).unwrap();

        engine.push::<CustomerFields>(id).unwrap();

        let record = engine.store().get::<CustomerFields>(id).unwrap();
        assert!(record.sync.create_issued_at.is_none());
        assert!(record.sync.claim_token.is_none());
        assert!(record
            .sync
            .last_error
            .unwrap()
            .contains("connection refused"));
    }

    #[test]
    fn test_claimed_record_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().never();

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let id = store.insert(&customer("ada@example.com")).unwrap();
        let version = store.get::<CustomerFields>(id).unwrap().sync.version;
        assert!(store
            .claim(EntityKind::Customers, id, version, "other-run", Duration::seconds(300))
            .unwrap());

        let result = engine.push::<CustomerFields>(id).unwrap();

        assert!(matches!(
            result.outcome,
            PushOutcome::Skipped {
                reason: SkipReason::Claimed,
                ..
            }
        ));
    }

    #[test]
    fn test_default_address_follow_up_failure_keeps_primary_success() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, _| document.contains("customerAddressCreate"))
            .returning(|_, _| Ok(created("customerAddressCreate", "address", "addr_1")));
        client
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|document, variables| {
                document.contains("customerUpdateDefaultAddress")
                    && variables["addressId"] == "addr_1"
            })
            .returning(|_, _| {
                Ok(GraphResponse::with_data(json!({
                    "customerUpdateDefaultAddress": {
                        "customer": null,
                        "userErrors": [FieldError::new("addressId", "Address does not exist")]
                    }
                })))
            });

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let customer_id = synced_customer(&store, "cust_900");
        let address_id = store.insert(&address(customer_id, true)).unwrap();

        let result = engine.push::<AddressFields>(address_id).unwrap();

        assert!(matches!(result.outcome, PushOutcome::Created { .. }));
        assert!(result
            .secondary_error
            .unwrap()
            .contains("customerUpdateDefaultAddress"));
        let record = store.get::<AddressFields>(address_id).unwrap();
        assert!(!record.sync.dirty);
        assert!(record.sync.last_error.is_none());
    }

    #[test]
    fn test_inventory_update_sets_absolute_quantity() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client
            .expect_execute()
            .times(1)
            .withf(|document, variables| {
                let input = &variables["input"];
                document.contains("inventorySetQuantities")
                    && input["ignoreCompareQuantity"] == true
                    && input["name"] == "available"
                    && input["quantities"][0]["quantity"] == 3
            })
            .returning(|_, _| {
                Ok(GraphResponse::with_data(json!({
                    "inventorySetQuantities": {
                        "inventoryAdjustmentGroup": { "id": "gid://shopify/InventoryAdjustmentGroup/1" },
                        "userErrors": []
                    }
                })))
            });

        let engine = PushEngine::new(&client, &db);
        let store = engine.store();
        let level = InventoryLevelFields {
            inventory_item_id: "gid://shopify/InventoryItem/1".to_string(),
            location_id: "gid://shopify/Location/1".to_string(),
            sku: "TEA-1".to_string(),
            quantity: 40,
        };
        store
            .upsert_pulled(
                &RemoteId::parse("gid://shopify/InventoryLevel/1").unwrap(),
                &level,
            )
            .unwrap();
        let id = store.dirty_ids(EntityKind::Inventory, None).unwrap();
        assert!(id.is_empty());

        let local_id = store
            .find_by_remote_id(
                EntityKind::Inventory,
                &RemoteId::parse("gid://shopify/InventoryLevel/1").unwrap(),
            )
            .unwrap()
            .unwrap()
            .0;
        store
            .update(
                local_id,
                &InventoryLevelFields {
                    quantity: 3,
                    ..level
                },
            )
            .unwrap();

        let result = engine.push::<InventoryLevelFields>(local_id).unwrap();

        assert!(matches!(result.outcome, PushOutcome::Updated { .. }));
    }

    #[test]
    fn test_plan_makes_no_calls_or_writes() {
        let db = Database::open_in_memory().unwrap();
        let mut client = MockGraphClient::new();
        client.expect_execute().with(always(), always()).never();

        let engine = PushEngine::new(&client, &db);
        let id = engine.store().insert(&customer("ada@example.com")).unwrap();
        let before = engine.store().get::<CustomerFields>(id).unwrap();

        let result = engine.plan_one(EntityKind::Customers, id).unwrap();

        assert_eq!(
            result.outcome,
            PushOutcome::Planned {
                action: PushAction::Create,
                remote_id: None
            }
        );
        assert_eq!(engine.store().get::<CustomerFields>(id).unwrap(), before);
    }

    #[test]
    fn test_unknown_record_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let client = MockGraphClient::new();
        let engine = PushEngine::new(&client, &db);

        assert!(matches!(
            engine.push_one(EntityKind::Products, 42),
            Err(ShopSyncError::NotFound(_))
        ));
    }
}
