use async_trait::async_trait;
use seoforge_types::ProviderError;
#[cfg(feature = "providers")]
use seoforge_types::ProviderErrorKind;

use crate::{Request, Response};

// ---------------------------------------------------------------------------
// GenerationProvider
// ---------------------------------------------------------------------------

/// A backend that turns a prompt into text.
///
/// Implementations report failures as a [`ProviderError`] carrying a
/// structural [`seoforge_types::ProviderErrorKind`]; retry decisions are made
/// by the caller.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: &Request) -> Result<Response, ProviderError>;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Transport error mapping shared by the HTTP adapters
// ---------------------------------------------------------------------------

/// Map a failure below the HTTP layer (no status received) to a provider error.
#[cfg(feature = "providers")]
pub fn transport_error(provider: &str, err: &reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else if let Some(status) = err.status() {
        ProviderErrorKind::from_http_status(status.as_u16())
    } else {
        ProviderErrorKind::Connection
    };
    ProviderError::new(provider, kind, err.to_string())
}
