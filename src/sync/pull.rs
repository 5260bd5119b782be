//! Pull engine: import remote records into local storage.
//!
//! Pages are fetched one at a time and fully processed before the next cursor
//! is requested. Records are matched by remote id, then by the entity's
//! natural key if it has one; a local row with unpushed edits is never
//! overwritten.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::entities::with_entity;
use super::identity::RemoteId;
use super::record::{Entity, EntityKind};
use super::store::{RecordStore, UpsertOutcome};
use crate::remote::{GraphClient, PageInfo};
use crate::storage::Database;

/// Default records per page.
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Cap on stored per-record error messages.
const MAX_ERROR_DETAILS: usize = 100;

/// A remote record decoded into local fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulled<F> {
    pub remote_id: RemoteId,
    pub fields: F,
}

/// Entity-specific pull mapping.
pub trait Pullable: Entity {
    /// Paged query taking `$first`, `$after` and `$query`.
    const QUERY: &'static str;

    /// JSON pointer to the connection inside `data`.
    const CONNECTION: &'static str;

    /// Decode one connection node. A node may yield several records, each of
    /// which may fail on its own.
    fn from_node(store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>>;
}

/// Decode a node into its typed shape.
///
/// # Errors
///
/// Returns the deserialization message.
pub fn decode_node<T: DeserializeOwned>(node: &Value) -> Result<T, String> {
    T::deserialize(node).map_err(|e| format!("malformed node: {e}"))
}

/// Parse a remote id from a payload.
///
/// # Errors
///
/// Returns a message if the id is empty or looks local.
pub fn parse_remote_id(value: &str) -> Result<RemoteId, String> {
    RemoteId::parse(value).map_err(|e| e.to_string())
}

/// Counters for one pull run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullStats {
    pub entity: EntityKind,
    /// Records decoded from the remote side, including malformed ones.
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    /// Records left alone because the local copy has unpushed edits.
    pub skipped: usize,
    pub errors: usize,
    pub pages: usize,
    /// Set when a page request failed and paging stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
}

impl PullStats {
    #[must_use]
    pub const fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            fetched: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: 0,
            pages: 0,
            failure: None,
            error_details: Vec::new(),
        }
    }

    /// No page failure and no bad record.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failure.is_none() && self.errors == 0
    }

    fn record_error(&mut self, message: String) {
        self.errors += 1;
        if self.error_details.len() < MAX_ERROR_DETAILS {
            self.error_details.push(message);
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    #[serde(default)]
    nodes: Vec<Value>,
    #[serde(default)]
    page_info: PageInfo,
}

/// Pages remote collections into the local store.
pub struct PullEngine<'a> {
    client: &'a dyn GraphClient,
    store: RecordStore<'a>,
    page_size: u32,
}

impl<'a> PullEngine<'a> {
    #[must_use]
    pub fn new(client: &'a dyn GraphClient, db: &'a Database) -> Self {
        Self {
            client,
            store: RecordStore::new(db),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Pull every record of `kind`, optionally narrowed by a platform search
    /// query.
    ///
    /// Page failures and bad records are reported in the returned stats.
    #[must_use]
    pub fn pull(&self, kind: EntityKind, filter: Option<&str>) -> PullStats {
        with_entity!(kind, F => self.pull_entity::<F>(filter))
    }

    /// Pull every record of one entity type.
    #[must_use]
    pub fn pull_entity<F: Pullable>(&self, filter: Option<&str>) -> PullStats {
        let kind = F::KIND;
        let mut stats = PullStats::new(kind);
        let mut cursor: Option<String> = None;

        loop {
            let variables = json!({
                "first": self.page_size,
                "after": cursor,
                "query": filter,
            });

            debug!(entity = %kind, page = stats.pages + 1, "fetching page");
            let page = self
                .client
                .execute(F::QUERY, &variables)
                .and_then(|response| response.data_at(F::CONNECTION).cloned())
                .map_err(|e| e.to_string())
                .and_then(|connection| {
                    Page::deserialize(connection).map_err(|e| format!("malformed page: {e}"))
                });

            let page = match page {
                Ok(page) => page,
                Err(message) => {
                    warn!(entity = %kind, pages = stats.pages, "pull stopped: {message}");
                    stats.failure = Some(message);
                    break;
                },
            };
            stats.pages += 1;

            for node in &page.nodes {
                for pulled in F::from_node(&self.store, node) {
                    stats.fetched += 1;
                    self.apply(&mut stats, pulled);
                }
            }

            match page.page_info.end_cursor {
                Some(next) if page.page_info.has_next_page => cursor = Some(next),
                _ => break,
            }
        }

        info!(
            entity = %kind,
            fetched = stats.fetched,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            "pull finished"
        );
        stats
    }

    fn apply<F: Pullable>(&self, stats: &mut PullStats, pulled: Result<Pulled<F>, String>) {
        let pulled = match pulled {
            Ok(pulled) => pulled,
            Err(message) => {
                warn!(entity = %F::KIND, "skipping remote record: {message}");
                stats.record_error(message);
                return;
            },
        };

        match self.store.upsert_pulled(&pulled.remote_id, &pulled.fields) {
            Ok(UpsertOutcome::Created(_)) => stats.created += 1,
            Ok(UpsertOutcome::Updated(_)) => stats.updated += 1,
            Ok(UpsertOutcome::SkippedDirty(local_id)) => {
                debug!(
                    entity = %F::KIND,
                    local_id,
                    remote_id = %pulled.remote_id,
                    "local edits pending; remote copy not applied"
                );
                stats.skipped += 1;
            },
            Err(err) => {
                let message = format!("{}: {err}", pulled.remote_id);
                warn!(entity = %F::KIND, "failed to store remote record: {message}");
                stats.record_error(message);
            },
        }
    }
}
