//! Customer addresses. Pushed only once the owning customer is synced.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde::Deserialize;
use serde_json::{json, Value};

use super::text;
use super::CustomerFields;
use crate::error::ShopSyncError;
use crate::remote::documents::{
    ADDRESS_CREATE, ADDRESS_SET_DEFAULT, ADDRESS_UPDATE, CUSTOMER_ADDRESSES_PAGE,
};
use crate::sync::identity::RemoteId;
use crate::sync::payload::MailingAddressInput;
use crate::sync::pull::{decode_node, parse_remote_id, Pullable, Pulled};
use crate::sync::push::{Mutation, ParentCheck, PushAction, Pushable};
use crate::sync::record::{Entity, EntityKind, Record};
use crate::sync::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    /// Local id of the owning customer.
    pub customer_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub province_code: String,
    pub zip: String,
    pub country_code: String,
    pub phone: String,
    /// The customer's default address.
    pub is_default: bool,
}

impl AddressFields {
    fn input(&self) -> MailingAddressInput {
        MailingAddressInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            address1: self.address1.clone(),
            address2: self.address2.clone(),
            city: self.city.clone(),
            province_code: self.province_code.clone(),
            zip: self.zip.clone(),
            country_code: self.country_code.clone(),
            phone: self.phone.clone(),
        }
    }
}

impl Entity for AddressFields {
    const KIND: EntityKind = EntityKind::Addresses;
    const COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "first_name",
        "last_name",
        "company",
        "address1",
        "address2",
        "city",
        "province_code",
        "zip",
        "country_code",
        "phone",
        "is_default",
    ];

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            customer_id: row.get(offset)?,
            first_name: row.get(offset + 1)?,
            last_name: row.get(offset + 2)?,
            company: row.get(offset + 3)?,
            address1: row.get(offset + 4)?,
            address2: row.get(offset + 5)?,
            city: row.get(offset + 6)?,
            province_code: row.get(offset + 7)?,
            zip: row.get(offset + 8)?,
            country_code: row.get(offset + 9)?,
            phone: row.get(offset + 10)?,
            is_default: row.get(offset + 11)?,
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.customer_id),
            text(&self.first_name),
            text(&self.last_name),
            text(&self.company),
            text(&self.address1),
            text(&self.address2),
            text(&self.city),
            text(&self.province_code),
            text(&self.zip),
            text(&self.country_code),
            text(&self.phone),
            SqlValue::Integer(i64::from(self.is_default)),
        ]
    }
}

impl Pushable for AddressFields {
    /// Remote id of the owning customer.
    type Parents = RemoteId;

    fn resolve_parents(
        store: &RecordStore<'_>,
        record: &Record<Self>,
    ) -> Result<ParentCheck<RemoteId>, ShopSyncError> {
        let customer_id = record.fields.customer_id;
        let Some(customer) = store.load::<CustomerFields>(customer_id)? else {
            return Ok(ParentCheck::Missing(format!(
                "customer {customer_id} does not exist"
            )));
        };

        Ok(match customer.sync.identity.remote_id() {
            Some(remote_id) => ParentCheck::Ready(remote_id.clone()),
            None => ParentCheck::Missing(format!(
                "customer {customer_id} has no remote id yet; push customers first"
            )),
        })
    }

    fn create_mutation(
        record: &Record<Self>,
        customer: &RemoteId,
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            ADDRESS_CREATE,
            "customerAddressCreate",
            "/address/id",
            json!({
                "customerId": customer,
                "address": record.fields.input(),
            }),
        ))
    }

    fn update_mutation(
        record: &Record<Self>,
        remote_id: &RemoteId,
        customer: &RemoteId,
    ) -> Result<Mutation, ShopSyncError> {
        Ok(Mutation::new(
            ADDRESS_UPDATE,
            "customerAddressUpdate",
            "/address/id",
            json!({
                "customerId": customer,
                "addressId": remote_id,
                "address": record.fields.input(),
            }),
        ))
    }

    fn follow_ups(
        record: &Record<Self>,
        remote_id: &RemoteId,
        customer: &RemoteId,
        _action: PushAction,
        _payload: &Value,
    ) -> Result<Vec<Mutation>, ShopSyncError> {
        if !record.fields.is_default {
            return Ok(Vec::new());
        }

        Ok(vec![Mutation::new(
            ADDRESS_SET_DEFAULT,
            "customerUpdateDefaultAddress",
            "/customer/id",
            json!({ "customerId": customer, "addressId": remote_id }),
        )])
    }

    fn parent_refs(record: &Record<Self>) -> Vec<(EntityKind, i64)> {
        vec![(EntityKind::Customers, record.fields.customer_id)]
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerAddressesNode {
    id: String,
    #[serde(default)]
    default_address: Option<IdNode>,
    #[serde(default)]
    addresses: Vec<AddressNode>,
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressNode {
    id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    address2: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    province_code: Option<String>,
    #[serde(default)]
    zip: Option<String>,
    #[serde(default, rename = "countryCodeV2")]
    country_code: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

impl Pullable for AddressFields {
    const QUERY: &'static str = CUSTOMER_ADDRESSES_PAGE;
    const CONNECTION: &'static str = "/customers";

    /// One customer node yields all of its addresses.
    fn from_node(store: &RecordStore<'_>, node: &Value) -> Vec<Result<Pulled<Self>, String>> {
        let node = match decode_node::<CustomerAddressesNode>(node) {
            Ok(node) => node,
            Err(err) => return vec![Err(err)],
        };

        let customer_id = parse_remote_id(&node.id).and_then(|remote_id| {
            match store.find_by_remote_id(EntityKind::Customers, &remote_id) {
                Ok(Some((local_id, _))) => Ok(local_id),
                Ok(None) => Err(format!("customer {remote_id} is not stored locally")),
                Err(err) => Err(err.to_string()),
            }
        });
        let default_id = node.default_address.map(|a| a.id);

        node.addresses
            .into_iter()
            .map(|address| {
                let customer_id = customer_id.clone()?;
                Ok(Pulled {
                    remote_id: parse_remote_id(&address.id)?,
                    fields: Self {
                        customer_id,
                        is_default: default_id.as_deref() == Some(address.id.as_str()),
                        first_name: address.first_name.unwrap_or_default(),
                        last_name: address.last_name.unwrap_or_default(),
                        company: address.company.unwrap_or_default(),
                        address1: address.address1.unwrap_or_default(),
                        address2: address.address2.unwrap_or_default(),
                        city: address.city.unwrap_or_default(),
                        province_code: address.province_code.unwrap_or_default(),
                        zip: address.zip.unwrap_or_default(),
                        country_code: address.country_code.unwrap_or_default(),
                        phone: address.phone.unwrap_or_default(),
                    },
                })
            })
            .collect()
    }
}
