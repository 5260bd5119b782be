//! Remote identity of a local record.
//!
//! The `remote_id` column is parsed once into [`RemoteIdentity`]; the push
//! engine branches on the variant rather than on string prefixes.

use std::fmt;

use serde::Serialize;

use crate::error::ShopSyncError;

/// Prefix of locally generated stand-in ids.
pub const PLACEHOLDER_PREFIX: &str = "temp_";

/// Prefixes marking fixture records that must never reach the platform.
pub const RESERVED_PREFIXES: [&str; 2] = ["test_", "seed_"];

/// A platform-assigned identifier.
///
/// Only built from platform responses, pulled payloads, operator input or
/// rows that already hold one; never from a placeholder or reserved value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Validate and wrap a platform identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ShopSyncError::InvalidInput`] for empty values and for
    /// values carrying the placeholder or a reserved prefix.
    pub fn parse(value: &str) -> Result<Self, ShopSyncError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ShopSyncError::InvalidInput(
                "remote id must not be empty".to_string(),
            ));
        }
        if is_placeholder(value) || is_reserved(value) {
            return Err(ShopSyncError::InvalidInput(format!(
                "'{value}' is a local identifier, not a remote id"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with(PLACEHOLDER_PREFIX)
}

fn is_reserved(value: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

/// Where a local record stands relative to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteIdentity {
    /// Never pushed and no placeholder recorded.
    Unassigned,
    /// Locally generated stand-in, replaced by the first successful create.
    Placeholder(String),
    /// Test or seed fixture; never pushed.
    Reserved(String),
    /// Known to the platform under this id.
    Synced(RemoteId),
}

impl RemoteIdentity {
    /// Generate a fresh placeholder for a locally created record.
    #[must_use]
    pub fn new_placeholder() -> Self {
        Self::Placeholder(format!(
            "{PLACEHOLDER_PREFIX}{}",
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Parse the stored `remote_id` column.
    #[must_use]
    pub fn from_column(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Unassigned;
        };

        if is_placeholder(value) {
            Self::Placeholder(value.to_string())
        } else if is_reserved(value) {
            Self::Reserved(value.to_string())
        } else {
            Self::Synced(RemoteId(value.to_string()))
        }
    }

    /// Value to store in the `remote_id` column.
    #[must_use]
    pub fn as_column(&self) -> Option<&str> {
        match self {
            Self::Unassigned => None,
            Self::Placeholder(value) | Self::Reserved(value) => Some(value),
            Self::Synced(id) => Some(id.as_str()),
        }
    }

    /// The platform id, if the record has been synced.
    #[must_use]
    pub const fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            Self::Synced(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_column() {
        assert_eq!(RemoteIdentity::from_column(None), RemoteIdentity::Unassigned);
        assert_eq!(RemoteIdentity::from_column(Some("  ")), RemoteIdentity::Unassigned);
        assert_eq!(
            RemoteIdentity::from_column(Some("temp_123")),
            RemoteIdentity::Placeholder("temp_123".to_string())
        );
        assert_eq!(
            RemoteIdentity::from_column(Some("seed_customer_1")),
            RemoteIdentity::Reserved("seed_customer_1".to_string())
        );
        assert!(RemoteIdentity::from_column(Some("cust_900")).is_synced());
    }

    #[test]
    fn test_placeholder_is_never_a_remote_id() {
        let placeholder = RemoteIdentity::new_placeholder();
        let value = placeholder.as_column().unwrap();

        assert!(value.starts_with(PLACEHOLDER_PREFIX));
        assert!(placeholder.remote_id().is_none());
        assert!(RemoteId::parse(value).is_err());
    }

    #[test]
    fn test_remote_id_parse() {
        assert_eq!(
            RemoteId::parse(" gid://shopify/Customer/1 ").unwrap().as_str(),
            "gid://shopify/Customer/1"
        );
        assert!(RemoteId::parse("").is_err());
        assert!(RemoteId::parse("test_fixture").is_err());
    }

    #[test]
    fn test_as_column_round_trips_synced() {
        let identity = RemoteIdentity::from_column(Some("gid://shopify/Product/7"));
        assert_eq!(identity.as_column(), Some("gid://shopify/Product/7"));
    }
}
