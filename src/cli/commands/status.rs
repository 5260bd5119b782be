//! Status command.

use super::Context;
use crate::cli::args::OutputFormat;
use crate::error::ShopSyncError;
use crate::output::format_status;
use crate::sync::{EntityKind, RecordStore};

/// Execute status command
///
/// # Errors
///
/// Returns an error if the store cannot be queried.
pub fn status(ctx: &Context, format: OutputFormat) -> Result<String, ShopSyncError> {
    let store = RecordStore::new(&ctx.db);
    let rows = EntityKind::ALL
        .iter()
        .map(|&kind| store.status(kind).map(|status| (kind, status)))
        .collect::<Result<Vec<_>, _>>()?;
    format_status(&rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;
    use crate::sync::entities::ProductFields;

    #[test]
    fn test_status_counts_pending() {
        let ctx = Context::new(Config::default(), Database::open_in_memory().unwrap(), None);
        RecordStore::new(&ctx.db)
            .insert(&ProductFields {
                title: "Coffee".to_string(),
                ..ProductFields::default()
            })
            .unwrap();

        let output = status(&ctx, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let products = value["entities"]
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["entity"] == "products")
            .unwrap();

        assert_eq!(value["count"], 5);
        assert_eq!(products["total"], 1);
        assert_eq!(products["pending"], 1);
    }
}
