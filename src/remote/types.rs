//! GraphQL response envelope.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::error::{ApiError, FieldError};

/// Error code the platform uses for throttled queries.
const THROTTLED_CODE: &str = "THROTTLED";

/// Longest wait ever suggested to a caller.
pub(crate) const MAX_RETRY_WAIT: Duration = Duration::from_secs(3600);

/// Convert a wait in seconds to a [`Duration`], capped at
/// [`MAX_RETRY_WAIT`]. Negative and non-finite values give `None`.
pub(crate) fn retry_wait(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs.min(MAX_RETRY_WAIT.as_secs_f64())))
}

/// One entry of the top-level `errors` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphErrorEntry {
    /// Error message.
    pub message: String,
    /// Platform-specific details, including `code`.
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphErrorEntry {
    /// The `extensions.code` value, if present.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

/// Parsed body of a 200-class response.
///
/// A successful HTTP exchange may still carry logical errors: callers inspect
/// both the top-level `errors` list and per-mutation `userErrors` through
/// [`data_at`](Self::data_at) and [`mutation_payload`](Self::mutation_payload).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphResponse {
    /// Response data.
    #[serde(default)]
    pub data: Option<Value>,
    /// Top-level errors.
    #[serde(default)]
    pub errors: Vec<GraphErrorEntry>,
    /// Cost and throttle information.
    #[serde(default)]
    pub extensions: Option<Value>,
}

/// Relay-style pagination info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows.
    #[serde(default)]
    pub has_next_page: bool,
    /// Cursor to request the next page.
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl GraphResponse {
    /// Build a response carrying only `data`.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Build a response carrying only top-level errors.
    #[must_use]
    pub fn with_errors(errors: Vec<GraphErrorEntry>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Classify the top-level `errors` list, if any.
    #[must_use]
    pub fn top_level_error(&self) -> Option<ApiError> {
        if self.errors.is_empty() {
            return None;
        }

        let message = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        if self.errors.iter().any(|e| e.code() == Some(THROTTLED_CODE)) {
            return Some(ApiError::rate_limited(message, self.throttle_delay()));
        }

        Some(ApiError::graph(message))
    }

    /// Estimate how long until the query budget refills enough to retry,
    /// from `extensions.cost.throttleStatus`.
    fn throttle_delay(&self) -> Option<Duration> {
        let cost = self.extensions.as_ref()?.get("cost")?;
        let requested = cost.get("requestedQueryCost")?.as_f64()?;
        let status = cost.get("throttleStatus")?;
        let available = status.get("currentlyAvailable")?.as_f64()?;
        let restore_rate = status.get("restoreRate")?.as_f64()?;

        if restore_rate <= 0.0 || available >= requested {
            return None;
        }

        retry_wait((requested - available) / restore_rate)
    }

    /// Return the value at a JSON pointer inside `data`, after checking for
    /// top-level errors.
    ///
    /// # Errors
    ///
    /// Returns the classified top-level error, or [`ApiError::Graph`] if the
    /// pointer does not resolve.
    pub fn data_at(&self, pointer: &str) -> Result<&Value, ApiError> {
        if let Some(err) = self.top_level_error() {
            return Err(err);
        }

        self.data
            .as_ref()
            .and_then(|data| data.pointer(pointer))
            .filter(|value| !value.is_null())
            .ok_or_else(|| ApiError::graph(format!("response is missing data at {pointer}")))
    }

    /// Return the payload object of a mutation, after checking top-level
    /// errors and the mutation's `userErrors`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when `userErrors` is non-empty, or
    /// the failure from [`data_at`](Self::data_at).
    pub fn mutation_payload(&self, field: &str) -> Result<&Value, ApiError> {
        let payload = self.data_at(&format!("/{field}"))?;

        let user_errors: Vec<FieldError> = match payload.get("userErrors") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                .map_err(|e| ApiError::graph(format!("unreadable userErrors: {e}")))?,
            _ => Vec::new(),
        };

        if user_errors.is_empty() {
            Ok(payload)
        } else {
            Err(ApiError::Validation {
                errors: user_errors,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_mutation_payload_success() {
        let response = GraphResponse::with_data(json!({
            "customerCreate": {
                "customer": { "id": "gid://shopify/Customer/900" },
                "userErrors": []
            }
        }));

        let payload = response.mutation_payload("customerCreate").unwrap();
        assert_eq!(
            payload.pointer("/customer/id").and_then(Value::as_str),
            Some("gid://shopify/Customer/900")
        );
    }

    #[test]
    fn test_mutation_payload_user_errors() {
        let response = GraphResponse::with_data(json!({
            "customerCreate": {
                "customer": null,
                "userErrors": [
                    { "field": ["input", "email"], "message": "has already been taken" }
                ]
            }
        }));

        let err = response.mutation_payload("customerCreate").unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
        assert!(err.to_string().contains("email: has already been taken"));
    }

    #[test]
    fn test_throttled_is_rate_limited() {
        let body = json!({
            "errors": [{ "message": "Throttled", "extensions": { "code": "THROTTLED" } }],
            "extensions": {
                "cost": {
                    "requestedQueryCost": 52,
                    "throttleStatus": {
                        "maximumAvailable": 1000,
                        "currentlyAvailable": 2,
                        "restoreRate": 50
                    }
                }
            }
        });
        let response: GraphResponse = serde_json::from_value(body).unwrap();

        match response.mutation_payload("customerCreate").unwrap_err() {
            ApiError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(1)));
            },
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_tiny_restore_rate_caps_the_wait() {
        let body = json!({
            "errors": [{ "message": "Throttled", "extensions": { "code": "THROTTLED" } }],
            "extensions": {
                "cost": {
                    "requestedQueryCost": 1000,
                    "throttleStatus": {
                        "currentlyAvailable": 0,
                        "restoreRate": 1e-300
                    }
                }
            }
        });
        let response: GraphResponse = serde_json::from_value(body).unwrap();

        match response.top_level_error() {
            Some(ApiError::RateLimited { retry_after, .. }) => {
                assert_eq!(retry_after, Some(MAX_RETRY_WAIT));
            },
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_wait_bounds() {
        assert_eq!(retry_wait(1.5), Some(Duration::from_millis(1500)));
        assert_eq!(retry_wait(1e30), Some(MAX_RETRY_WAIT));
        assert_eq!(retry_wait(-1.0), None);
        assert_eq!(retry_wait(f64::NAN), None);
    }

    #[test]
    fn test_other_top_level_errors_are_graph_errors() {
        let response = GraphResponse::with_errors(vec![GraphErrorEntry {
            message: "Field 'nope' doesn't exist on type 'Customer'".to_string(),
            extensions: Some(json!({ "code": "undefinedField" })),
        }]);

        let err = response.data_at("/customers").unwrap_err();
        assert!(matches!(err, ApiError::Graph { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_data_is_graph_error() {
        let response = GraphResponse::with_data(json!({ "customers": null }));
        assert!(matches!(
            response.data_at("/customers"),
            Err(ApiError::Graph { .. })
        ));
    }

    #[test]
    fn test_page_info_deserialize() {
        let info: PageInfo =
            serde_json::from_value(json!({ "hasNextPage": true, "endCursor": "abc" })).unwrap();
        assert!(info.has_next_page);
        assert_eq!(info.end_cursor.as_deref(), Some("abc"));
    }
}
