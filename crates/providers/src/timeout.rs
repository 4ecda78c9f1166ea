//! Provider timeout: bounds every completion call by a deadline.
//!
//! An upstream that never answers would otherwise hold the chat request open
//! indefinitely. Expiry surfaces as `ProviderError::Timeout`, which callers
//! treat like any other generation failure.

use async_trait::async_trait;
use medtutor_core::error::ProviderError;
use medtutor_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Wraps a provider and fails its calls once `timeout` has elapsed.
pub struct TimeoutProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Provider for TimeoutProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = %self.inner.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Provider timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.inner.name(),
                    self.timeout.as_secs()
                )))
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        tokio::time::timeout(self.timeout, self.inner.list_models())
            .await
            .map_err(|_| ProviderError::Timeout("list_models timed out".into()))?
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        tokio::time::timeout(self.timeout, self.inner.health_check())
            .await
            .map_err(|_| ProviderError::Timeout("health check timed out".into()))?
    }
}
