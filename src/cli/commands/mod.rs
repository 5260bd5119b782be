//! Command implementations for shopsync.
//!
//! Every command returns its rendered output; `main` prints it and maps
//! [`CommandOutput::failed`] to the exit status.

mod completions;
mod pull;
mod push;
mod records;
mod status;

pub use completions::completions;
pub use pull::pull;
pub use push::{push, push_all, push_one};
pub use records::{errors, forget, requeue, resolve};
pub use status::status;

use crate::config::Config;
use crate::error::ShopSyncError;
use crate::remote::{ClientConfig, HttpGraphClient};
use crate::storage::Database;

/// Everything a command needs: settings, the open store and the token.
pub struct Context {
    pub config: Config,
    pub db: Database,
    token: Option<String>,
}

impl Context {
    #[must_use]
    pub const fn new(config: Config, db: Database, token: Option<String>) -> Self {
        Self { config, db, token }
    }

    /// Build the HTTP client. Only commands that talk to the platform call
    /// this, so local commands work without a shop domain or token.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop domain or token is missing.
    pub fn client(&self) -> Result<HttpGraphClient, ShopSyncError> {
        let config = ClientConfig::from_api_config(&self.config.api, self.token.clone())?;
        HttpGraphClient::new(config)
    }

    /// Claim lease from the `sync` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured lease is not positive or out of
    /// range.
    pub fn claim_lease(&self) -> Result<chrono::Duration, ShopSyncError> {
        let secs = self.config.sync.claim_lease_secs;
        chrono::Duration::try_seconds(secs)
            .filter(|lease| *lease > chrono::Duration::zero())
            .ok_or_else(|| ShopSyncError::Config(format!("sync.claim_lease_secs out of range: {secs}")))
    }
}

/// Rendered command output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    /// Some records failed or were skipped.
    pub failed: bool,
}

impl CommandOutput {
    #[must_use]
    pub const fn new(text: String, failed: bool) -> Self {
        Self { text, failed }
    }
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        Self::new(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(config: Config) -> Context {
        Context::new(config, Database::open_in_memory().unwrap(), None)
    }

    #[test]
    fn test_client_requires_shop_domain() {
        let ctx = context(Config::default());

        assert!(matches!(ctx.client(), Err(ShopSyncError::Config(_))));
    }

    #[test]
    fn test_client_requires_token() {
        let mut config = Config::default();
        config.api.shop_domain = Some("example.myshopify.com".to_string());
        let ctx = context(config);

        let err = ctx.client().err().unwrap();
        assert!(err.to_string().contains("SHOPSYNC_ACCESS_TOKEN"));
    }

    #[test]
    fn test_claim_lease() {
        let mut config = Config::default();
        assert_eq!(context(config.clone()).claim_lease().unwrap(), chrono::Duration::seconds(300));

        config.sync.claim_lease_secs = 0;
        assert!(context(config).claim_lease().is_err());
    }
}
