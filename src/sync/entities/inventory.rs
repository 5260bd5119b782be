//! Inventory levels: the `available` quantity of one item at one location.
//!
//! Pushes set an absolute quantity and ignore the platform's current value, so
//! the local count always wins.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde::Deserialize;
use serde_json::{json, Value};

use super::text;
use crate::error::ShopSyncError;
use crate::remote::documents::{INVENTORY_ACTIVATE, INVENTORY_PAGE, INVENTORY_SET_QUANTITIES};
use crate::sync::identity::{RemoteId, RemoteIdentity};
use crate::sync::payload::InventorySetQuantitiesInput;
use crate::sync::pull::{decode_node, parse_remote_id, Pullable, Pulled};
use crate::sync::push::{Mutation, ParentCheck, Pushable};
use crate::sync::record::{Entity, EntityKind, Record};
use crate::sync::store::RecordStore;

const AVAILABLE: &str = "available";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryLevelFields {
    /// Remote id of the inventory item.
    pub inventory_item_id: String,
    /// Remote id of the location.
    pub location_id: String,
    pub sku: String,
    pub quantity: i64,
}

/// Remote ids of the item and the location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelParents {
    item: RemoteId,
    location: RemoteId,
}

fn synced(value: &str, what: &str) -> Result<RemoteId, String> {
    match RemoteIdentity::from_column(Some(value)) {
        RemoteIdentity::Synced(id) => Ok(id),
        _ => Err(format!("{what} '{value}' is not a platform id")),
    }
}

impl Entity for InventoryLevelFields {
    const KIND: EntityKind = EntityKind::Inventory;
    const COLUMNS: &'static [&'static str] =
        &["inventory_item_id", "location_id", "sku", "quantity"];

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            inventory_item_id: row.get(offset)?,
            location_id: row.get(offset + 1)?,
            sku: row.get(offset + 2)?,
            quantity: row.get(offset + 3)?,
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.inventory_item_id),
            text(&self.location_id),
            text(&self.sku),
            SqlValue::Integer(self.quantity),
        ]
    }

    fn natural_key(&self) -> Option<(&'static str, Vec<SqlValue>)> {
        Some((
            "inventory_item_id = ?1 AND location_id = ?2",
            vec![text(&self.inventory_item_id), text(&self.location_id)],
        ))
    }
}

impl Pushable for InventoryLevelFields {
    type Parents = LevelParents;

    fn resolve_parents(
        _store: &RecordStore<'_>,
        record: &Record<Self>,
    ) -> Result<ParentCheck<LevelParents>, ShopSyncError> {
        let item = synced(&record.fields.inventory_item_id, "inventory item");
        let location = synced(&record.fields.location_id, "location");

        Ok(match (item, location) {
            (Ok(item), Ok(location)) => ParentCheck::Ready(LevelParents { item, location }),
            (Err(message), _) | (_, Err(message)) => ParentCheck::Missing(message),
        })
    }

    fn create_mutation(
        record: &Record<Self>,
        parents: &LevelParents,
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            INVENTORY_ACTIVATE,
            "inventoryActivate",
            "/inventoryLevel/id",
            json!({
                "inventoryItemId": parents.item,
                "locationId": parents.location,
                "available": record.fields.quantity,
            }),
        ))
    }

    fn update_mutation(
        record: &Record<Self>,
        _remote_id: &RemoteId,
        parents: &LevelParents,
    ) -> Result<Mutation, ShopSyncError> {
        let input = InventorySetQuantitiesInput::available(
            parents.item.as_str(),
            parents.location.as_str(),
            record.fields.quantity,
        );
        Ok(Mutation::new(
            INVENTORY_SET_QUANTITIES,
            "inventorySetQuantities",
            "/inventoryAdjustmentGroup/id",
            json!({ "input": input }),
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryItemNode {
    id: String,
    #[serde(default)]
    sku: Option<String>,
    inventory_levels: LevelConnection,
}

#[derive(Deserialize)]
struct LevelConnection {
    #[serde(default)]
    nodes: Vec<LevelNode>,
}

#[derive(Deserialize)]
struct LevelNode {
    id: String,
    location: LocationNode,
    #[serde(default)]
    quantities: Vec<QuantityNode>,
}

#[derive(Deserialize)]
struct LocationNode {
    id: String,
}

#[derive(Deserialize)]
struct QuantityNode {
    name: String,
    quantity: i64,
}

impl Pullable for InventoryLevelFields {
    const QUERY: &'static str = INVENTORY_PAGE;
    const CONNECTION: &'static str = "/inventoryItems";

    /// One inventory item node yields a level per location.
    fn from_node(_store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>> {
        let item = match decode_node::<InventoryItemNode>(node) {
            Ok(item) => item,
            Err(err) => return vec![Err(err)],
        };
        let sku = item.sku.unwrap_or_default();

        item.inventory_levels
            .nodes
            .into_iter()
            .map(|level| {
                let quantity = level
                    .quantities
                    .iter()
                    .find(|q| q.name == AVAILABLE)
                    .map(|q| q.quantity)
                    .ok_or_else(|| format!("level {} has no available quantity", level.id))?;
                Ok(Pulled {
                    remote_id: parse_remote_id(&level.id)?,
                    fields: Self {
                        inventory_item_id: item.id.clone(),
                        location_id: level.location.id,
                        sku: sku.clone(),
                        quantity,
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::sync::store::UpsertOutcome;

    fn level(quantity: i64) -> InventoryLevelFields {
        InventoryLevelFields {
            inventory_item_id: "gid://shopify/InventoryItem/1".to_string(),
            location_id: "gid://shopify/Location/1".to_string(),
            sku: "TEA-1".to_string(),
            quantity,
        }
    }

    #[test]
    fn test_unsynced_item_is_missing_parent() {
        let db = Database::open_in_memory().unwrap();
        let store = RecordStore::new(&db);
        let id = store
            .insert(&InventoryLevelFields {
                inventory_item_id: "temp_item".to_string(),
                ..level(1)
            })
            .unwrap();
        let record = store.get::<InventoryLevelFields>(id).unwrap();

        assert!(matches!(
            InventoryLevelFields::resolve_parents(&store, &record).unwrap(),
            ParentCheck::Missing(message) if message.contains("temp_item")
        ));
    }

    #[test]
    fn test_create_activates_with_absolute_quantity() {
        let db = Database::open_in_memory().unwrap();
        let store = RecordStore::new(&db);
        let id = store.insert(&level(12)).unwrap();
        let record = store.get::<InventoryLevelFields>(id).unwrap();
        let ParentCheck::Ready(parents) =
            InventoryLevelFields::resolve_parents(&store, &record).unwrap()
        else {
            panic!("parents should resolve");
        };

        let mutation = InventoryLevelFields::create_mutation(&record, &parents).unwrap();

        assert_eq!(mutation.field, "inventoryActivate");
        assert_eq!(mutation.variables["available"], 12);
        assert_eq!(mutation.variables["locationId"], "gid://shopify/Location/1");
    }

    #[test]
    fn test_pull_matches_local_level_by_item_and_location() {
        let db = Database::open_in_memory().unwrap();
        let store = RecordStore::new(&db);
        let local_id = store.insert(&level(5)).unwrap();
        // Pushed earlier, so the row is clean but still has its placeholder
        db.connection()
            .execute(
                "UPDATE inventory_levels SET dirty = 0 WHERE local_id = ?1",
                [local_id],
            )
            .unwrap();

        let outcome = store
            .upsert_pulled(
                &RemoteId::parse("gid://shopify/InventoryLevel/1").unwrap(),
                &level(9),
            )
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated(local_id));
        let record = store.get::<InventoryLevelFields>(local_id).unwrap();
        assert_eq!(record.fields.quantity, 9);
        assert_eq!(
            record.sync.identity.as_column(),
            Some("gid://shopify/InventoryLevel/1")
        );
    }

    #[test]
    fn test_from_node_yields_level_per_location() {
        let db = Database::open_in_memory().unwrap();
        let store = RecordStore::new(&db);
        let node = json!({
            "id": "gid://shopify/InventoryItem/1",
            "sku": "TEA-1",
            "inventoryLevels": { "nodes": [
                {
                    "id": "gid://shopify/InventoryLevel/1",
                    "location": { "id": "gid://shopify/Location/1" },
                    "quantities": [{ "name": "available", "quantity": 4 }]
                },
                {
                    "id": "gid://shopify/InventoryLevel/2",
                    "location": { "id": "gid://shopify/Location/2" },
                    "quantities": []
                }
            ]}
        });

        let pulled = InventoryLevelFields::from_node(&store, &node);

        assert_eq!(pulled.len(), 2);
        let first = pulled[0].as_ref().unwrap();
        assert_eq!(first.fields.quantity, 4);
        assert_eq!(first.fields.sku, "TEA-1");
        assert!(pulled[1].is_err());
    }
}
