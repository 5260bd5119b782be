//! Bidirectional sync between the local store and the remote platform.
//!
//! Local records carry their sync state next to their business columns:
//! a [`RemoteIdentity`], a dirty flag, a version counter and a short-lived
//! push claim. The [`PushEngine`] sends one dirty record to the platform,
//! the [`BatchCoordinator`] walks every dirty record of a type, and the
//! [`PullEngine`] pages remote records into the store without overwriting
//! local edits that have not been pushed yet.

mod batch;
pub mod entities;
mod identity;
mod payload;
mod pull;
mod push;
mod record;
mod store;

pub use batch::{BatchCoordinator, BatchError, BatchOptions, BatchResult};
pub use identity::{RemoteId, RemoteIdentity, PLACEHOLDER_PREFIX, RESERVED_PREFIXES};
pub use pull::{PullEngine, PullStats, Pullable, Pulled};
pub use push::{Mutation, ParentCheck, PushAction, PushEngine, PushOutcome, PushResult, Pushable, SkipReason};
pub use record::{Entity, EntityKind, Record, SyncState};
pub use store::{EntityStatus, ErrorRow, RecordStore, Resolution, UpsertOutcome};
