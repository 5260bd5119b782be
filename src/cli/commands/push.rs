//! Push commands.

use serde_json::Value;

use super::{CommandOutput, Context};
use crate::cli::args::{BatchArgs, OutputFormat};
use crate::error::ShopSyncError;
use crate::output::{format_batches, format_push_result};
use crate::remote::{ApiError, GraphClient, GraphResponse};
use crate::sync::{BatchCoordinator, BatchOptions, BatchResult, EntityKind, PushEngine};

/// Client used for dry runs, which never send a request.
struct Offline;

impl GraphClient for Offline {
    fn execute(&self, _document: &str, _variables: &Value) -> Result<GraphResponse, ApiError> {
        Err(ApiError::transport("dry run does not contact the platform"))
    }
}

/// Run `f` with a push engine backed by the real client, or by [`Offline`]
/// for dry runs.
fn with_engine<T>(
    ctx: &Context,
    dry_run: bool,
    f: impl FnOnce(&PushEngine<'_>) -> Result<T, ShopSyncError>,
) -> Result<T, ShopSyncError> {
    let lease = ctx.claim_lease()?;
    if dry_run {
        let engine = PushEngine::new(&Offline, &ctx.db).with_lease(lease);
        f(&engine)
    } else {
        let client = ctx.client()?;
        let engine = PushEngine::new(&client, &ctx.db).with_lease(lease);
        f(&engine)
    }
}

const fn options(args: BatchArgs) -> BatchOptions {
    BatchOptions {
        limit: args.limit,
        dry_run: args.dry_run,
    }
}

fn render(batches: &[BatchResult], format: OutputFormat) -> Result<CommandOutput, ShopSyncError> {
    let failed = !batches.iter().all(BatchResult::is_success);
    Ok(CommandOutput::new(format_batches(batches, format)?, failed))
}

/// Execute push command for one entity type
///
/// # Errors
///
/// Returns an error if the client cannot be built or the dirty records
/// cannot be listed.
pub fn push(
    ctx: &Context,
    entity: EntityKind,
    args: BatchArgs,
    format: OutputFormat,
) -> Result<CommandOutput, ShopSyncError> {
    let batch = with_engine(ctx, args.dry_run, |engine| {
        BatchCoordinator::with_options(engine, options(args)).push_all_pending(entity)
    })?;
    render(&[batch], format)
}

/// Execute push-all command
///
/// # Errors
///
/// Returns an error if the client cannot be built or the dirty records
/// cannot be listed.
pub fn push_all(ctx: &Context, args: BatchArgs, format: OutputFormat) -> Result<CommandOutput, ShopSyncError> {
    let batches = with_engine(ctx, args.dry_run, |engine| {
        BatchCoordinator::with_options(engine, options(args)).push_everything()
    })?;
    render(&batches, format)
}

/// Execute push-one command
///
/// # Errors
///
/// Returns an error if the client cannot be built or the record does not
/// exist.
pub fn push_one(
    ctx: &Context,
    entity: EntityKind,
    local_id: i64,
    dry_run: bool,
    format: OutputFormat,
) -> Result<CommandOutput, ShopSyncError> {
    let result = with_engine(ctx, dry_run, |engine| {
        if dry_run {
            engine.plan_one(entity, local_id)
        } else {
            engine.push_one(entity, local_id)
        }
    })?;
    let failed = !result.outcome.is_success();
    Ok(CommandOutput::new(format_push_result(&result, format)?, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;
    use crate::sync::entities::CustomerFields;
    use crate::sync::RecordStore;

    fn context() -> Context {
        Context::new(Config::default(), Database::open_in_memory().unwrap(), None)
    }

    #[test]
    fn test_dry_run_needs_no_credentials() {
        let ctx = context();
        RecordStore::new(&ctx.db)
            .insert(&CustomerFields {
                email: "a@example.com".to_string(),
                ..CustomerFields::default()
            })
            .unwrap();

        let args = BatchArgs {
            dry_run: true,
            limit: None,
        };
        let output = push(&ctx, EntityKind::Customers, args, OutputFormat::Json).unwrap();

        assert!(!output.failed);
        assert!(output.text.contains("\"status\": \"planned\""));
        assert!(output.text.contains("\"action\": \"create\""));
    }

    #[test]
    fn test_real_push_requires_credentials() {
        let ctx = context();

        let result = push_all(&ctx, BatchArgs::default(), OutputFormat::Pretty);

        assert!(matches!(result, Err(ShopSyncError::Config(_))));
    }

    #[test]
    fn test_push_one_dry_run_missing_record() {
        let ctx = context();

        let result = push_one(&ctx, EntityKind::Products, 99, true, OutputFormat::Pretty);

        assert!(matches!(result, Err(ShopSyncError::NotFound(_))));
    }
}
