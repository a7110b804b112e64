//! Email provider implementations

pub mod mock;
pub mod ses;

pub use mock::MockProvider;
pub use ses::SesProvider;

use crate::config::ProviderConfig;
use crate::error::EmailResult;
use crate::models::ProviderMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for delivery backends.
///
/// Providers receive a fully rendered message and hold no state between
/// calls beyond their own client configuration. No retries happen here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send a rendered message; `Ok(true)` once the backend accepted it
    async fn send_email(&self, message: &ProviderMessage) -> EmailResult<bool>;

    /// Check that the backend is reachable with the configured credentials
    async fn health_check(&self) -> EmailResult<()>;

    /// Get provider name
    fn name(&self) -> &'static str;
}

/// Build the provider selected by `config`.
pub async fn from_config(config: &ProviderConfig) -> EmailResult<Arc<dyn EmailProvider>> {
    match config {
        ProviderConfig::Ses(options) => Ok(Arc::new(SesProvider::from_options(options).await)),
    }
}
