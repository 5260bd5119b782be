//! Pull command.

use super::{CommandOutput, Context};
use crate::cli::args::OutputFormat;
use crate::error::ShopSyncError;
use crate::output::format_pull_stats;
use crate::sync::{EntityKind, PullEngine};

/// Execute pull command
///
/// # Errors
///
/// Returns an error if the client cannot be built. Page failures and bad
/// records are reported in the output and flag the command as failed.
pub fn pull(
    ctx: &Context,
    entity: EntityKind,
    query: Option<&str>,
    format: OutputFormat,
) -> Result<CommandOutput, ShopSyncError> {
    let client = ctx.client()?;
    let engine = PullEngine::new(&client, &ctx.db).with_page_size(ctx.config.sync.effective_page_size());

    let stats = engine.pull(entity, query.filter(|q| !q.trim().is_empty()));
    let failed = !stats.is_clean();
    Ok(CommandOutput::new(format_pull_stats(&[stats], format)?, failed))
}
