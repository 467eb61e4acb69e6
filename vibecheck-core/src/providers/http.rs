//! Shared HTTP configuration for evidence providers.

use reqwest::Client;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::error::Result;

/// Configuration for HTTP-backed providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key (may be empty for keyless endpoints)
    pub api_key: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Default model, for model-backed providers
    pub default_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: None,
            timeout_secs: 10,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Gemini configuration from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    pub fn gemini_from_env() -> Option<Self> {
        std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key).with_timeout(30))
    }

    /// Semantic Scholar configuration; the key is optional.
    pub fn scholar_from_env() -> Self {
        Self::new(std::env::var("SEMANTIC_SCHOLAR_API_KEY").unwrap_or_default()).with_timeout(5)
    }
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);

    // Proxy auto-detection can panic in some sandboxed environments.
    // Retry without proxy support in that case.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(_)) | Err(_) => Ok(Client::builder().no_proxy().timeout(timeout).build()?),
    }
}
