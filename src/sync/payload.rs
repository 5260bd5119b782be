//! Typed mutation inputs.
//!
//! Local is the source of truth for pushed fields: optional values are sent as
//! `""` or `0` so the platform overwrites whatever it holds.

use serde::Serialize;

/// `CustomerInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub note: String,
    pub tags: Vec<String>,
}

/// `MailingAddressInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddressInput {
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
}

/// `ProductCreateInput` / `ProductUpdateInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub handle: String,
    pub description_html: String,
    pub vendor: String,
    pub product_type: String,
    pub status: String,
    pub tags: Vec<String>,
}

/// `InventorySetQuantitiesInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySetQuantitiesInput {
    pub name: &'static str,
    pub reason: &'static str,
    pub ignore_compare_quantity: bool,
    pub quantities: Vec<InventoryQuantityInput>,
}

impl InventorySetQuantitiesInput {
    /// Absolute set of the `available` quantity, ignoring whatever the
    /// platform currently holds.
    #[must_use]
    pub fn available(inventory_item_id: &str, location_id: &str, quantity: i64) -> Self {
        Self {
            name: "available",
            reason: "correction",
            ignore_compare_quantity: true,
            quantities: vec![InventoryQuantityInput {
                inventory_item_id: inventory_item_id.to_string(),
                location_id: location_id.to_string(),
                quantity,
            }],
        }
    }
}

/// `InventoryQuantityInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuantityInput {
    pub inventory_item_id: String,
    pub location_id: String,
    pub quantity: i64,
}

/// `SellingPlanGroupInput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellingPlanGroupInput {
    pub name: String,
    pub merchant_code: String,
    pub description: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selling_plans_to_create: Vec<SellingPlanInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selling_plans_to_update: Vec<SellingPlanInput>,
}

/// `SellingPlanInput` for a recurring plan with a percentage discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellingPlanInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub options: Vec<String>,
    pub category: &'static str,
    pub billing_policy: BillingPolicyInput,
    pub delivery_policy: DeliveryPolicyInput,
    pub pricing_policies: Vec<PricingPolicyInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingPolicyInput {
    pub recurring: RecurringPolicyInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryPolicyInput {
    pub recurring: RecurringPolicyInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPolicyInput {
    pub interval: &'static str,
    pub interval_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingPolicyInput {
    pub fixed: FixedPricingPolicyInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedPricingPolicyInput {
    pub adjustment_type: &'static str,
    pub adjustment_value: AdjustmentValueInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentValueInput {
    pub percentage: f64,
}

impl PricingPolicyInput {
    #[must_use]
    pub const fn percentage(percentage: f64) -> Self {
        Self {
            fixed: FixedPricingPolicyInput {
                adjustment_type: "PERCENTAGE",
                adjustment_value: AdjustmentValueInput { percentage },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_customer_input_omits_id_on_create() {
        let input = CustomerInput {
            id: None,
            email: "ada@example.com".to_string(),
            first_name: String::new(),
            last_name: "Lovelace".to_string(),
            phone: String::new(),
            note: String::new(),
            tags: vec![],
        };

        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("id").is_none());
        // Absent optional fields are still sent, as empty strings
        assert_eq!(value["firstName"], json!(""));
        assert_eq!(value["phone"], json!(""));
    }

    #[test]
    fn test_inventory_set_quantities_shape() {
        let input = InventorySetQuantitiesInput::available(
            "gid://shopify/InventoryItem/1",
            "gid://shopify/Location/2",
            7,
        );

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "name": "available",
                "reason": "correction",
                "ignoreCompareQuantity": true,
                "quantities": [{
                    "inventoryItemId": "gid://shopify/InventoryItem/1",
                    "locationId": "gid://shopify/Location/2",
                    "quantity": 7
                }]
            })
        );
    }
}
