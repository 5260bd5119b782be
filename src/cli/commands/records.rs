//! Record maintenance commands: errors, requeue, resolve, forget.

use colored::Colorize;
use serde_json::json;

use super::Context;
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::error::ShopSyncError;
use crate::output::{format_errors, to_json};
use crate::sync::{EntityKind, RecordStore, RemoteId, Resolution};

fn confirm(
    entity: EntityKind,
    local_id: i64,
    action: &str,
    detail: Option<&str>,
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "entity": entity,
            "local_id": local_id,
            "action": action,
            "remote_id": detail,
        })),
        OutputFormat::Pretty => {
            let mut line = format!("{} {} #{}", action.green().bold(), entity.singular(), local_id);
            if let Some(detail) = detail {
                line.push_str(&format!(" as {}", detail.cyan()));
            }
            Ok(line)
        },
    }
}

/// Execute errors command
///
/// # Errors
///
/// Returns an error if the store cannot be queried.
pub fn errors(
    ctx: &Context,
    entity: EntityKind,
    limit: usize,
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    let rows = RecordStore::new(&ctx.db).errors(entity, limit)?;
    format_errors(entity, &rows, format)
}

/// Execute requeue command
///
/// # Errors
///
/// Returns an error if the record does not exist.
pub fn requeue(
    ctx: &Context,
    entity: EntityKind,
    local_id: i64,
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    RecordStore::new(&ctx.db).requeue(entity, local_id)?;
    confirm(entity, local_id, "requeued", None, format)
}

/// Execute resolve command
///
/// # Errors
///
/// Returns an error if the record does not exist or the remote id is
/// invalid or already taken.
pub fn resolve(ctx: &Context, args: &ResolveArgs, format: OutputFormat) -> Result<String, ShopSyncError> {
    let resolution = match (&args.remote_id, args.clear) {
        (Some(remote_id), false) => Resolution::Adopt(RemoteId::parse(remote_id)?),
        (None, true) => Resolution::Clear,
        _ => {
            return Err(ShopSyncError::InvalidInput(
                "pass exactly one of --remote-id or --clear".to_string(),
            ))
        },
    };

    RecordStore::new(&ctx.db).resolve(args.entity, args.local_id, &resolution)?;

    match &resolution {
        Resolution::Adopt(remote_id) => {
            confirm(args.entity, args.local_id, "adopted", Some(remote_id.as_str()), format)
        },
        Resolution::Clear => confirm(args.entity, args.local_id, "cleared", None, format),
    }
}

/// Execute forget command
///
/// # Errors
///
/// Returns an error if the record does not exist.
pub fn forget(
    ctx: &Context,
    entity: EntityKind,
    local_id: i64,
    format: OutputFormat,
) -> Result<String, ShopSyncError> {
    RecordStore::new(&ctx.db).forget(entity, local_id)?;
    confirm(entity, local_id, "forgot", None, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;
    use crate::sync::entities::CustomerFields;

    fn context_with_customer() -> (Context, i64) {
        let ctx = Context::new(Config::default(), Database::open_in_memory().unwrap(), None);
        let id = RecordStore::new(&ctx.db)
            .insert(&CustomerFields {
                email: "a@example.com".to_string(),
                ..CustomerFields::default()
            })
            .unwrap();
        (ctx, id)
    }

    fn resolve_args(local_id: i64, remote_id: Option<&str>, clear: bool) -> ResolveArgs {
        ResolveArgs {
            entity: EntityKind::Customers,
            local_id,
            remote_id: remote_id.map(ToString::to_string),
            clear,
        }
    }

    #[test]
    fn test_resolve_adopts_remote_id() {
        let (ctx, id) = context_with_customer();

        let output = resolve(&ctx, &resolve_args(id, Some("cust_900"), false), OutputFormat::Json).unwrap();

        assert!(output.contains("\"action\": \"adopted\""));
        let record = RecordStore::new(&ctx.db).get::<CustomerFields>(id).unwrap();
        assert_eq!(record.sync.identity.remote_id().map(RemoteId::as_str), Some("cust_900"));
    }

    #[test]
    fn test_resolve_rejects_placeholder() {
        let (ctx, id) = context_with_customer();

        let result = resolve(&ctx, &resolve_args(id, Some("temp_123"), false), OutputFormat::Pretty);

        assert!(matches!(result, Err(ShopSyncError::InvalidInput(_))));
    }

    #[test]
    fn test_forget_then_requeue_is_not_found() {
        let (ctx, id) = context_with_customer();

        forget(&ctx, EntityKind::Customers, id, OutputFormat::Pretty).unwrap();
        let result = requeue(&ctx, EntityKind::Customers, id, OutputFormat::Pretty);

        assert!(matches!(result, Err(ShopSyncError::NotFound(_))));
    }

    #[test]
    fn test_errors_empty() {
        let (ctx, _) = context_with_customer();

        let output = errors(&ctx, EntityKind::Customers, 10, OutputFormat::Pretty).unwrap();

        assert!(output.contains("No errors"));
    }
}
