//! Failure taxonomy for remote API calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A field-level validation error returned in a mutation's `userErrors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path to the offending input field, e.g. `["input", "email"]`.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable message from the platform.
    pub message: String,
}

impl FieldError {
    /// Create a field error for a single field name.
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(vec![field.to_string()]),
            message: message.into(),
        }
    }

    /// The field path without the leading input wrapper (`input.email` -> `email`).
    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        let path = self.field.as_ref()?;
        let trimmed: Vec<&str> = path
            .iter()
            .map(String::as_str)
            .skip_while(|segment| matches!(*segment, "input" | "product" | "address"))
            .collect();
        if trimmed.is_empty() {
            path.last().cloned()
        } else {
            Some(trimmed.join("."))
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.field_name() {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by [`GraphClient::execute`](super::GraphClient::execute)
/// and by response inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Timeout, connection refused, 5xx or an interrupted body. Always retryable.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the read timeout elapsed.
        timed_out: bool,
    },

    /// The platform throttled the request. Retryable after backoff.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Error message.
        message: String,
        /// Delay suggested by the platform, if any.
        retry_after: Option<Duration>,
    },

    /// Malformed query, permission or authentication failure. Needs a code or
    /// credential change before retrying.
    #[error("graph error: {message}")]
    Graph {
        /// Error message.
        message: String,
    },

    /// Field-level validation failure. Needs a payload correction.
    #[error("validation failed: {}", join_field_errors(.errors))]
    Validation {
        /// Individual field errors.
        errors: Vec<FieldError>,
    },
}

/// Discriminant of [`ApiError`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure.
    Transport,
    /// Rate limited.
    RateLimited,
    /// Query or permission failure.
    Graph,
    /// Field validation failure.
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::Graph => "graph",
            Self::Validation => "validation",
        };
        write!(f, "{s}")
    }
}

impl ApiError {
    /// Create a non-timeout transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a graph error.
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
        }
    }

    /// Create a rate-limit error.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    /// Returns the error's category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Graph { .. } => ErrorKind::Graph,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Returns true if the same request may succeed when repeated unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiError::transport("connection refused").is_retryable());
        assert!(ApiError::rate_limited("Throttled", None).is_retryable());
        assert!(!ApiError::graph("Access denied").is_retryable());
        assert!(!ApiError::Validation { errors: vec![] }.is_retryable());
    }

    #[test]
    fn test_validation_display_concatenates_fields() {
        let err = ApiError::Validation {
            errors: vec![
                FieldError {
                    field: Some(vec!["input".to_string(), "email".to_string()]),
                    message: "has already been taken".to_string(),
                },
                FieldError::new("phone", "is invalid"),
            ],
        };

        assert_eq!(
            err.to_string(),
            "validation failed: email: has already been taken; phone: is invalid"
        );
    }

    #[test]
    fn test_field_error_without_field() {
        let err = FieldError {
            field: None,
            message: "Something went wrong".to_string(),
        };
        assert_eq!(err.to_string(), "Something went wrong");
    }

    #[test]
    fn test_field_error_only_wrapper() {
        let err = FieldError {
            field: Some(vec!["input".to_string()]),
            message: "is invalid".to_string(),
        };
        assert_eq!(err.to_string(), "input: is invalid");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ApiError::transport("x").kind().to_string(), "transport");
        assert_eq!(
            ApiError::rate_limited("x", None).kind(),
            ErrorKind::RateLimited
        );
    }
}
