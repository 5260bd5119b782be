//! HTTP transport for GraphQL documents.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{retry_wait, GraphResponse};
use crate::config::ApiConfig;
use crate::error::ShopSyncError;

/// Executes query and mutation documents against the remote platform.
///
/// Implementations perform exactly one request per call: no retries, no
/// local state changes.
#[cfg_attr(test, mockall::automock)]
pub trait GraphClient {
    /// Send a document with its variables and return the parsed body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for transport failures, throttling and non-2xx
    /// responses. A 2xx body carrying logical errors is returned as `Ok`.
    fn execute(&self, document: &str, variables: &Value) -> Result<GraphResponse, ApiError>;
}

/// Settings for [`HttpGraphClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full GraphQL endpoint URL.
    pub endpoint: String,
    /// Admin API access token.
    pub access_token: String,
    /// Read timeout for a single request.
    pub timeout: Duration,
    /// Minimum spacing between consecutive requests.
    pub min_interval: Duration,
}

impl ClientConfig {
    /// Build client settings from the `api` config section and a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop domain or token is missing.
    pub fn from_api_config(api: &ApiConfig, access_token: Option<String>) -> Result<Self, ShopSyncError> {
        let shop = api
            .shop_domain
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ShopSyncError::Config("api.shop_domain is not set".to_string()))?;

        let access_token = access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            ShopSyncError::Config(
                "No access token: pass --token or set SHOPSYNC_ACCESS_TOKEN".to_string(),
            )
        })?;

        Ok(Self {
            endpoint: endpoint_url(shop, &api.api_version),
            access_token,
            timeout: Duration::from_secs(api.timeout_secs),
            min_interval: Duration::from_millis(api.min_request_interval_ms),
        })
    }
}

/// Build the GraphQL endpoint for a shop.
///
/// A bare domain gets the `https://` scheme; a value that already carries a
/// scheme is used as the base as-is.
#[must_use]
pub fn endpoint_url(shop_domain: &str, api_version: &str) -> String {
    let base = shop_domain.trim().trim_end_matches('/');
    let base = if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("https://{base}")
    };
    format!("{base}/admin/api/{api_version}/graphql.json")
}

/// Blocking `reqwest` implementation of [`GraphClient`].
pub struct HttpGraphClient {
    config: ClientConfig,
    http: Client,
    last_request: Mutex<Option<Instant>>,
}

impl HttpGraphClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ShopSyncError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shopsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShopSyncError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            last_request: Mutex::new(None),
        })
    }

    /// Returns the endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Sleep until `min_interval` has passed since the previous request.
    fn pace(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                std::thread::sleep(self.config.min_interval - elapsed);
            }
        }

        *last = Some(Instant::now());
    }
}

impl GraphClient for HttpGraphClient {
    fn execute(&self, document: &str, variables: &Value) -> Result<GraphResponse, ApiError> {
        self.pace();

        debug!(endpoint = %self.config.endpoint, "sending GraphQL request");

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().map_err(transport_error)?;

        if let Some(err) = classify_status(status, retry_after, &body) {
            warn!(status, error = %err, "GraphQL request failed");
            return Err(err);
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::graph(format!("unreadable response body: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        timed_out: err.is_timeout(),
        message: err.to_string(),
    }
}

/// Parse a `Retry-After` header given in seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<f64>().ok().and_then(retry_wait)
}

/// Map a non-2xx HTTP status to an [`ApiError`].
fn classify_status(status: u16, retry_after: Option<Duration>, body: &str) -> Option<ApiError> {
    match status {
        200..=299 => None,
        429 => Some(ApiError::rate_limited(
            format!("HTTP 429: {}", snippet(body)),
            retry_after,
        )),
        500..=599 => Some(ApiError::transport(format!(
            "HTTP {status}: {}",
            snippet(body)
        ))),
        _ => Some(ApiError::graph(format!("HTTP {status}: {}", snippet(body)))),
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}
