//! Customers.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde::Deserialize;
use serde_json::{json, Value};

use super::text;
use crate::error::ShopSyncError;
use crate::remote::documents::{CUSTOMERS_PAGE, CUSTOMER_CREATE, CUSTOMER_UPDATE};
use crate::sync::identity::RemoteId;
use crate::sync::payload::CustomerInput;
use crate::sync::pull::{decode_node, parse_remote_id, Pullable, Pulled};
use crate::sync::push::{Mutation, ParentCheck, Pushable};
use crate::sync::record::{split_tags, Entity, EntityKind, Record};
use crate::sync::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFields {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub note: String,
    pub tags: Vec<String>,
}

impl CustomerFields {
    fn input(&self, id: Option<&RemoteId>) -> CustomerInput {
        CustomerInput {
            id: id.map(ToString::to_string),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            note: self.note.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl Entity for CustomerFields {
    const KIND: EntityKind = EntityKind::Customers;
    const COLUMNS: &'static [&'static str] =
        &["email", "first_name", "last_name", "phone", "note", "tags"];

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let tags: String = row.get(offset + 5)?;
        Ok(Self {
            email: row.get(offset)?,
            first_name: row.get(offset + 1)?,
            last_name: row.get(offset + 2)?,
            phone: row.get(offset + 3)?,
            note: row.get(offset + 4)?,
            tags: split_tags(&tags),
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.email),
            text(&self.first_name),
            text(&self.last_name),
            text(&self.phone),
            text(&self.note),
            text(&self.tags.join(",")),
        ]
    }
}

impl Pushable for CustomerFields {
    type Parents = ();

    fn resolve_parents(
        _store: &RecordStore<'_>,
        _record: &Record<Self>,
    ) -> Result<ParentCheck<()>, ShopSyncError> {
        Ok(ParentCheck::Ready(()))
    }

    fn create_mutation(record: &Record<Self>, _parents: &()) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            CUSTOMER_CREATE,
            "customerCreate",
            "/customer/id",
            json!({ "input": record.fields.input(None) }),
        ))
    }

    fn update_mutation(
        record: &Record<Self>,
        remote_id: &RemoteId,
        _parents: &(),
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            CUSTOMER_UPDATE,
            "customerUpdate",
            "/customer/id",
            json!({ "input": record.fields.input(Some(remote_id)) }),
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl Pullable for CustomerFields {
    const QUERY: &'static str = CUSTOMERS_PAGE;
    const CONNECTION: &'static str = "/customers";

    fn from_node(_store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>> {
        let pulled = decode_node::<CustomerNode>(node).and_then(|node| {
            Ok(Pulled {
                remote_id: parse_remote_id(&node.id)?,
                fields: Self {
                    email: node.email.unwrap_or_default(),
                    first_name: node.first_name.unwrap_or_default(),
                    last_name: node.last_name.unwrap_or_default(),
                    phone: node.phone.unwrap_or_default(),
                    note: node.note.unwrap_or_default(),
                    tags: node.tags,
                },
            })
        });
        vec![pulled]
    }
}
