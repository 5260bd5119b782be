//! Products.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde::Deserialize;
use serde_json::{json, Value};

use super::text;
use crate::error::ShopSyncError;
use crate::remote::documents::{PRODUCTS_PAGE, PRODUCT_CREATE, PRODUCT_UPDATE};
use crate::sync::identity::RemoteId;
use crate::sync::payload::ProductInput;
use crate::sync::pull::{decode_node, parse_remote_id, Pullable, Pulled};
use crate::sync::push::{Mutation, ParentCheck, Pushable};
use crate::sync::record::{split_tags, Entity, EntityKind, Record};
use crate::sync::store::RecordStore;

/// Product publication status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    #[default]
    Draft,
    Archived,
}

impl ProductStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draft => "DRAFT",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = ShopSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DRAFT" => Ok(Self::Draft),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(ShopSyncError::InvalidInput(format!(
                "unknown product status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub title: String,
    pub handle: String,
    pub description_html: String,
    pub vendor: String,
    pub product_type: String,
    pub status: ProductStatus,
    pub tags: Vec<String>,
}

impl ProductFields {
    fn input(&self, id: Option<&RemoteId>) -> ProductInput {
        ProductInput {
            id: id.map(ToString::to_string),
            title: self.title.clone(),
            handle: self.handle.clone(),
            description_html: self.description_html.clone(),
            vendor: self.vendor.clone(),
            product_type: self.product_type.clone(),
            status: self.status.as_str().to_string(),
            tags: self.tags.clone(),
        }
    }
}

impl Entity for ProductFields {
    const KIND: EntityKind = EntityKind::Products;
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "handle",
        "description_html",
        "vendor",
        "product_type",
        "status",
        "tags",
    ];

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let status: String = row.get(offset + 5)?;
        let tags: String = row.get(offset + 6)?;
        Ok(Self {
            title: row.get(offset)?,
            handle: row.get(offset + 1)?,
            description_html: row.get(offset + 2)?,
            vendor: row.get(offset + 3)?,
            product_type: row.get(offset + 4)?,
            status: status.parse().unwrap_or_default(),
            tags: split_tags(&tags),
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.title),
            text(&self.handle),
            text(&self.description_html),
            text(&self.vendor),
            text(&self.product_type),
            text(self.status.as_str()),
            text(&self.tags.join(",")),
        ]
    }
}

impl Pushable for ProductFields {
    type Parents = ();

    fn resolve_parents(
        _store: &RecordStore<'_>,
        _record: &Record<Self>,
    ) -> Result<ParentCheck<()>, ShopSyncError> {
        Ok(ParentCheck::Ready(()))
    }

    fn create_mutation(record: &Record<Self>, _parents: &()) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            PRODUCT_CREATE,
            "productCreate",
            "/product/id",
            json!({ "product": record.fields.input(None) }),
        ))
    }

    fn update_mutation(
        record: &Record<Self>,
        remote_id: &RemoteId,
        _parents: &(),
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            PRODUCT_UPDATE,
            "productUpdate",
            "/product/id",
            json!({ "product": record.fields.input(Some(remote_id)) }),
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(default)]
    description_html: Option<String>,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl Pullable for ProductFields {
    const QUERY: &'static str = PRODUCTS_PAGE;
    const CONNECTION: &'static str = "/products";

    fn from_node(_store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>> {
        let pulled = decode_node::<ProductNode>(node).and_then(|node| {
            let status = match node.status.as_deref() {
                Some(status) => status
                    .parse::<ProductStatus>()
                    .map_err(|e| e.to_string())?,
                None => ProductStatus::default(),
            };
            Ok(Pulled {
                remote_id: parse_remote_id(&node.id)?,
                fields: Self {
                    title: node.title.unwrap_or_default(),
                    handle: node.handle.unwrap_or_default(),
                    description_html: node.description_html.unwrap_or_default(),
                    vendor: node.vendor.unwrap_or_default(),
                    product_type: node.product_type.unwrap_or_default(),
                    status,
                    tags: node.tags,
                },
            })
        });
        vec![pulled]
    }
}
