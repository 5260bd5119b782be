//! Entity field sets and their wire mappings.

mod address;
mod customer;
mod inventory;
mod product;
mod selling_plan;

pub use address::AddressFields;
pub use customer::CustomerFields;
pub use inventory::InventoryLevelFields;
pub use product::{ProductFields, ProductStatus};
pub use selling_plan::{BillingInterval, SellingPlanFields};

/// Run `$body` with `$ty` bound to the field type of `$kind`.
macro_rules! with_entity {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            $crate::sync::EntityKind::Customers => {
                type $ty = $crate::sync::entities::CustomerFields;
                $body
            },
            $crate::sync::EntityKind::Addresses => {
                type $ty = $crate::sync::entities::AddressFields;
                $body
            },
            $crate::sync::EntityKind::Products => {
                type $ty = $crate::sync::entities::ProductFields;
                $body
            },
            $crate::sync::EntityKind::SellingPlans => {
                type $ty = $crate::sync::entities::SellingPlanFields;
                $body
            },
            $crate::sync::EntityKind::Inventory => {
                type $ty = $crate::sync::entities::InventoryLevelFields;
                $body
            },
        }
    };
}

pub(crate) use with_entity;

use rusqlite::types::Value as SqlValue;

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}
