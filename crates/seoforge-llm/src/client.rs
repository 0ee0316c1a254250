use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use seoforge_types::{ProviderError, ProviderErrorKind, Result};

use crate::retry::{execute_with_retry, RetryPolicy};
use crate::{GenerationProvider, Request, Response};

pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_STRUCTURED_TEMPERATURE: f32 = 0.5;

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut Request) {}
    fn after(&self, _request: &Request, _response: &mut Response) {}
}

// ---------------------------------------------------------------------------
// Built-in middleware: LoggingMiddleware
// ---------------------------------------------------------------------------

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut Request) {
        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            "Generation request"
        );
    }

    fn after(&self, _request: &Request, response: &mut Response) {
        tracing::debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish = ?response.finish_reason,
            "Generation response"
        );
    }
}

// ---------------------------------------------------------------------------
// Built-in middleware: UsageTrackingMiddleware
// ---------------------------------------------------------------------------

/// Accumulates token usage across calls. Clones share the same counters.
#[derive(Clone)]
pub struct UsageTrackingMiddleware {
    total_input: Arc<AtomicU64>,
    total_output: Arc<AtomicU64>,
    calls: Arc<AtomicU64>,
}

impl UsageTrackingMiddleware {
    pub fn new() -> Self {
        Self {
            total_input: Arc::new(AtomicU64::new(0)),
            total_output: Arc::new(AtomicU64::new(0)),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input.load(Ordering::Relaxed)
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for UsageTrackingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for UsageTrackingMiddleware {
    fn after(&self, _request: &Request, response: &mut Response) {
        self.total_input
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.total_output
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// GenerationClient
// ---------------------------------------------------------------------------

/// Wraps a [`GenerationProvider`] with defaults, middleware and retry.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    model: String,
    retry: RetryPolicy,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl GenerationClient {
    pub fn new(provider: impl GenerationProvider + 'static) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<dyn GenerationProvider>) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            retry: RetryPolicy::default(),
            middleware: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(m));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate free text. Defaults: 4000 tokens, temperature 0.7.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = self.build_request(
            prompt,
            system,
            max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature.unwrap_or(DEFAULT_TEMPERATURE),
        );
        Ok(self.complete(request).await?.text)
    }

    /// Generate output the caller will parse. Same behaviour as [`generate`](Self::generate)
    /// with a lower default temperature (0.5).
    pub async fn generate_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = self.build_request(
            prompt,
            system,
            max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature.unwrap_or(DEFAULT_STRUCTURED_TEMPERATURE),
        );
        Ok(self.complete(request).await?.text)
    }

    /// Send a fully built request through middleware and retry.
    pub async fn complete(&self, request: Request) -> Result<Response> {
        let mut req = request;
        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp =
            execute_with_retry(|| self.attempt(&req), &self.retry, self.provider.name()).await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }
        Ok(resp)
    }

    async fn attempt(&self, request: &Request) -> std::result::Result<Response, ProviderError> {
        let response = self.provider.generate(request).await?;
        if response.text.trim().is_empty() {
            return Err(ProviderError::new(
                self.provider.name(),
                ProviderErrorKind::EmptyResponse,
                "provider returned no text",
            ));
        }
        Ok(response)
    }

    fn build_request(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Request {
        Request {
            model: self.model.clone(),
            system: system.map(String::from),
            prompt: prompt.to_string(),
            max_tokens,
            temperature,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
