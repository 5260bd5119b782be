//! Subscription selling plans.
//!
//! A local plan maps to one remote selling plan group holding one recurring
//! plan. The group id is the record's remote id; the inner plan id is kept in
//! `plan_remote_id`.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Row};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{text, ProductFields};
use crate::error::ShopSyncError;
use crate::remote::documents::{
    SELLING_PLANS_PAGE, SELLING_PLAN_GROUP_ADD_PRODUCTS, SELLING_PLAN_GROUP_CREATE,
    SELLING_PLAN_GROUP_REMOVE_PRODUCTS, SELLING_PLAN_GROUP_UPDATE,
};
use crate::sync::identity::RemoteId;
use crate::sync::payload::{
    BillingPolicyInput, DeliveryPolicyInput, PricingPolicyInput, RecurringPolicyInput,
    SellingPlanGroupInput, SellingPlanInput,
};
use crate::sync::pull::{decode_node, parse_remote_id, Pullable, Pulled};
use crate::sync::push::{Mutation, ParentCheck, PushAction, Pushable};
use crate::sync::record::{Entity, EntityKind, Record};
use crate::sync::store::RecordStore;

/// Billing and delivery cadence unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BillingInterval {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl BillingInterval {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ShopSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAY" => Ok(Self::Day),
            "WEEK" => Ok(Self::Week),
            "MONTH" => Ok(Self::Month),
            "YEAR" => Ok(Self::Year),
            other => Err(ShopSyncError::InvalidInput(format!(
                "unknown billing interval '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SellingPlanFields {
    pub name: String,
    pub merchant_code: String,
    pub description: String,
    pub billing_interval: BillingInterval,
    pub interval_count: i64,
    /// Percentage off the product price.
    pub discount_percentage: f64,
    /// Remote id of the plan inside the group, learned from push responses.
    pub plan_remote_id: Option<String>,
    /// Local ids of linked products.
    pub product_ids: Vec<i64>,
}

impl SellingPlanFields {
    fn cadence_label(&self) -> String {
        let unit = self.billing_interval.as_str().to_lowercase();
        if self.interval_count == 1 {
            format!("Every {unit}")
        } else {
            format!("Every {} {unit}s", self.interval_count)
        }
    }

    fn plan_input(&self, id: Option<String>) -> SellingPlanInput {
        let recurring = RecurringPolicyInput {
            interval: self.billing_interval.as_str(),
            interval_count: self.interval_count,
        };
        SellingPlanInput {
            id,
            name: self.cadence_label(),
            options: vec![self.cadence_label()],
            category: "SUBSCRIPTION",
            billing_policy: BillingPolicyInput {
                recurring: recurring.clone(),
            },
            delivery_policy: DeliveryPolicyInput { recurring },
            pricing_policies: vec![PricingPolicyInput::percentage(self.discount_percentage)],
        }
    }

    /// Group input carrying `plan`, if any. A plan with an id is updated in
    /// place; one without is created.
    fn group_input(&self, plan: Option<SellingPlanInput>) -> SellingPlanGroupInput {
        let (to_create, to_update) = match plan {
            Some(plan) if plan.id.is_some() => (Vec::new(), vec![plan]),
            Some(plan) => (vec![plan], Vec::new()),
            None => (Vec::new(), Vec::new()),
        };

        SellingPlanGroupInput {
            name: self.name.clone(),
            merchant_code: self.merchant_code.clone(),
            description: self.description.clone(),
            options: vec!["Delivery frequency".to_string()],
            selling_plans_to_create: to_create,
            selling_plans_to_update: to_update,
        }
    }

    /// Group input for an update. Without a known plan id the plans are left
    /// alone; the follow-up settles them once the group's plans are known.
    fn update_input(&self) -> SellingPlanGroupInput {
        self.group_input(
            self.plan_remote_id
                .as_ref()
                .map(|id| self.plan_input(Some(id.clone()))),
        )
    }
}

/// Id of the group's first plan in a create or update payload.
fn plan_id(payload: &Value) -> Option<&str> {
    payload
        .pointer("/sellingPlanGroup/sellingPlans/nodes/0/id")
        .and_then(Value::as_str)
}

/// Products attached to the group according to an update payload.
fn linked_products(payload: &Value) -> Option<Vec<&str>> {
    let nodes = payload
        .pointer("/sellingPlanGroup/products/nodes")?
        .as_array()?;
    Some(
        nodes
            .iter()
            .filter_map(|node| node.get("id").and_then(Value::as_str))
            .collect(),
    )
}

impl Entity for SellingPlanFields {
    const KIND: EntityKind = EntityKind::SellingPlans;
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "merchant_code",
        "description",
        "billing_interval",
        "interval_count",
        "discount_percentage",
        "plan_remote_id",
    ];

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let interval: String = row.get(offset + 3)?;
        Ok(Self {
            name: row.get(offset)?,
            merchant_code: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            billing_interval: interval.parse().unwrap_or_default(),
            interval_count: row.get(offset + 4)?,
            discount_percentage: row.get(offset + 5)?,
            plan_remote_id: row.get(offset + 6)?,
            product_ids: Vec::new(),
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.name),
            text(&self.merchant_code),
            text(&self.description),
            text(self.billing_interval.as_str()),
            SqlValue::Integer(self.interval_count),
            SqlValue::Real(self.discount_percentage),
            self.plan_remote_id
                .as_deref()
                .map_or(SqlValue::Null, text),
        ]
    }

    fn load_links(&mut self, conn: &Connection, local_id: i64) -> rusqlite::Result<()> {
        let mut stmt = conn.prepare(
            "SELECT product_id FROM selling_plan_products
             WHERE selling_plan_id = ?1 ORDER BY product_id",
        )?;
        self.product_ids = stmt
            .query_map([local_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(())
    }

    fn save_links(&self, conn: &Connection, local_id: i64) -> rusqlite::Result<()> {
        conn.execute(
            "DELETE FROM selling_plan_products WHERE selling_plan_id = ?1",
            [local_id],
        )?;
        for product_id in &self.product_ids {
            conn.execute(
                "INSERT OR IGNORE INTO selling_plan_products (selling_plan_id, product_id)
                 VALUES (?1, ?2)",
                params![local_id, product_id],
            )?;
        }
        Ok(())
    }
}

impl Pushable for SellingPlanFields {
    /// Remote ids of every linked product.
    type Parents = Vec<RemoteId>;

    fn resolve_parents(
        store: &RecordStore<'_>,
        record: &Record<Self>,
    ) -> Result<ParentCheck<Vec<RemoteId>>, ShopSyncError> {
        let mut remote_ids = Vec::with_capacity(record.fields.product_ids.len());

        for &product_id in &record.fields.product_ids {
            let remote_id = store
                .load::<ProductFields>(product_id)?
                .and_then(|product| product.sync.identity.remote_id().cloned());
            match remote_id {
                Some(remote_id) => remote_ids.push(remote_id),
                None => {
                    return Ok(ParentCheck::Missing(format!(
                        "product {product_id} has no remote id yet; push products first"
                    )));
                },
            }
        }

        Ok(ParentCheck::Ready(remote_ids))
    }

    fn create_mutation(
        record: &Record<Self>,
        products: &Vec<RemoteId>,
    ) -> Result<Mutation, ShopSyncError> {
        let fields = &record.fields;
        Ok(Mutation::new(
            SELLING_PLAN_GROUP_CREATE,
            "sellingPlanGroupCreate",
            "/sellingPlanGroup/id",
            json!({
                "input": fields.group_input(Some(fields.plan_input(None))),
                "resources": { "productIds": products },
            }),
        ))
    }

    fn update_mutation(
        record: &Record<Self>,
        remote_id: &RemoteId,
        _products: &Vec<RemoteId>,
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            SELLING_PLAN_GROUP_UPDATE,
            "sellingPlanGroupUpdate",
            "/sellingPlanGroup/id",
            json!({ "id": remote_id, "input": record.fields.update_input() }),
        ))
    }

    /// After an update: write the plan if its id was unknown, then attach
    /// and detach products until the remote links match the local ones.
    /// Create already attaches products through `resources`.
    fn follow_ups(
        record: &Record<Self>,
        remote_id: &RemoteId,
        products: &Vec<RemoteId>,
        action: PushAction,
        payload: &Value,
    ) -> Result<Vec<Mutation>, ShopSyncError> {
        if action == PushAction::Create {
            return Ok(Vec::new());
        }

        let fields = &record.fields;
        let mut mutations = Vec::new();

        if fields.plan_remote_id.is_none() {
            let existing = plan_id(payload).map(str::to_string);
            mutations.push(Mutation::new(
                SELLING_PLAN_GROUP_UPDATE,
                "sellingPlanGroupUpdate",
                "/sellingPlanGroup/id",
                json!({
                    "id": remote_id,
                    "input": fields.group_input(Some(fields.plan_input(existing))),
                }),
            ));
        }

        // Unknown remote links: attach everything, detach nothing.
        let linked = linked_products(payload);
        let to_add: Vec<&RemoteId> = products
            .iter()
            .filter(|product| {
                !linked
                    .as_ref()
                    .is_some_and(|linked| linked.contains(&product.as_str()))
            })
            .collect();
        let to_remove: Vec<&str> = linked
            .unwrap_or_default()
            .into_iter()
            .filter(|id| !products.iter().any(|product| product.as_str() == *id))
            .collect();

        if !to_add.is_empty() {
            mutations.push(Mutation::new(
                SELLING_PLAN_GROUP_ADD_PRODUCTS,
                "sellingPlanGroupAddProducts",
                "/sellingPlanGroup/id",
                json!({ "id": remote_id, "productIds": to_add }),
            ));
        }
        if !to_remove.is_empty() {
            mutations.push(Mutation::new(
                SELLING_PLAN_GROUP_REMOVE_PRODUCTS,
                "sellingPlanGroupRemoveProducts",
                "/removedProductIds",
                json!({ "id": remote_id, "productIds": to_remove }),
            ));
        }

        Ok(mutations)
    }

    fn record_pushed(
        store: &RecordStore<'_>,
        local_id: i64,
        payload: &Value,
    ) -> Result<(), ShopSyncError> {
        let Some(plan_id) = plan_id(payload) else {
            warn!(local_id, "selling plan group has no plan yet");
            return Ok(());
        };

        store
            .database()
            .connection()
            .execute(
                "UPDATE selling_plans SET plan_remote_id = ?1 WHERE local_id = ?2",
                params![plan_id, local_id],
            )
            .map_err(|e| {
                ShopSyncError::Database(format!("Failed to store plan id of {local_id}: {e}"))
            })?;
        Ok(())
    }

    fn parent_refs(record: &Record<Self>) -> Vec<(EntityKind, i64)> {
        record
            .fields
            .product_ids
            .iter()
            .map(|&product_id| (EntityKind::Products, product_id))
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupNode {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    merchant_code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    selling_plans: Nodes<PlanNode>,
    products: Nodes<ProductRef>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Nodes<T> {
    #[serde(default)]
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanNode {
    id: String,
    #[serde(default)]
    billing_policy: Option<BillingPolicyNode>,
    #[serde(default)]
    pricing_policies: Vec<PricingPolicyNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillingPolicyNode {
    interval: Option<String>,
    interval_count: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingPolicyNode {
    #[serde(default)]
    adjustment_value: Option<AdjustmentValueNode>,
}

#[derive(Deserialize)]
struct AdjustmentValueNode {
    #[serde(default)]
    percentage: Option<f64>,
}

#[derive(Deserialize)]
struct ProductRef {
    id: String,
}

impl Pullable for SellingPlanFields {
    const QUERY: &'static str = SELLING_PLANS_PAGE;
    const CONNECTION: &'static str = "/sellingPlanGroups";

    fn from_node(store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>> {
        vec![decode_node::<GroupNode>(node).and_then(|group| pulled_group(store, group))]
    }
}

fn pulled_group(store: &RecordStore<'_>, group: GroupNode) -> Result<Pulled<SellingPlanFields>, String> {
    let remote_id = parse_remote_id(&group.id)?;
    let plan = group
        .selling_plans
        .nodes
        .into_iter()
        .next()
        .ok_or_else(|| format!("selling plan group {remote_id} has no plans"))?;

    let policy = plan
        .billing_policy
        .ok_or_else(|| format!("selling plan {} is not recurring", plan.id))?;
    let billing_interval = policy
        .interval
        .as_deref()
        .unwrap_or_default()
        .parse::<BillingInterval>()
        .map_err(|e| e.to_string())?;
    let discount_percentage = plan
        .pricing_policies
        .into_iter()
        .find_map(|p| p.adjustment_value.and_then(|v| v.percentage))
        .unwrap_or(0.0);

    let mut product_ids = Vec::new();
    for product in group.products.nodes {
        let found = parse_remote_id(&product.id).and_then(|id| {
            store
                .find_by_remote_id(EntityKind::Products, &id)
                .map_err(|e| e.to_string())
        })?;
        match found {
            Some((local_id, _)) => product_ids.push(local_id),
            None => warn!(
                group = %remote_id,
                product = %product.id,
                "linked product is not stored locally; link ignored"
            ),
        }
    }

    Ok(Pulled {
        remote_id,
        fields: SellingPlanFields {
            name: group.name.unwrap_or_default(),
            merchant_code: group.merchant_code.unwrap_or_default(),
            description: group.description.unwrap_or_default(),
            billing_interval,
            interval_count: policy.interval_count.unwrap_or(1),
            discount_percentage,
            plan_remote_id: Some(plan.id),
            product_ids,
        },
    })
}
