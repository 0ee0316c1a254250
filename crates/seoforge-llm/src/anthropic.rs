use async_trait::async_trait;
use serde_json::json;

use crate::provider::transport_error;
use crate::{FinishReason, GenerationProvider, Request, Response, Usage};
use seoforge_types::{ProviderError, ProviderErrorKind, SeoforgeError};

const PROVIDER: &str = "anthropic";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

// ---------------------------------------------------------------------------
// AnthropicAdapter
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            default_model: ANTHROPIC_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    pub fn from_env() -> Result<Self, SeoforgeError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| SeoforgeError::Config("ANTHROPIC_API_KEY is not set".into()))?;
        Ok(Self::new(key))
    }
}

// ---------------------------------------------------------------------------
// Request translation
// ---------------------------------------------------------------------------

fn build_request_body(request: &Request) -> serde_json::Value {
    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "messages": [{ "role": "user", "content": request.prompt }],
    });

    if let Some(system) = &request.system {
        body["system"] = json!(system);
    }

    body
}

// ---------------------------------------------------------------------------
// Response translation
// ---------------------------------------------------------------------------

fn parse_response(body: &serde_json::Value) -> Response {
    let id = body["id"].as_str().unwrap_or("").to_string();
    let model = body["model"].as_str().unwrap_or("").to_string();

    let finish_reason = match body["stop_reason"].as_str() {
        Some("max_tokens") => FinishReason::MaxTokens,
        Some("stop_sequence") => FinishReason::StopSequence,
        _ => FinishReason::EndTurn,
    };

    let text = body["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = Usage::new(
        body["usage"]["input_tokens"].as_u64().unwrap_or(0),
        body["usage"]["output_tokens"].as_u64().unwrap_or(0),
    );

    Response {
        id,
        text,
        model,
        usage,
        finish_reason,
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let mut kind = ProviderErrorKind::from_http_status(status.as_u16());
    if kind == ProviderErrorKind::Unknown {
        // Anthropic reports a typed error even when the status is unusual.
        kind = match parsed.as_ref().and_then(|v| v["error"]["type"].as_str()) {
            Some("invalid_request_error") => ProviderErrorKind::InvalidRequest,
            Some("authentication_error") => ProviderErrorKind::AuthFailure,
            Some("permission_error") => ProviderErrorKind::PermissionDenied,
            Some("not_found_error") => ProviderErrorKind::NotFound,
            Some("rate_limit_error") => ProviderErrorKind::RateLimited,
            Some("api_error") | Some("overloaded_error") => ProviderErrorKind::ServerError,
            _ => ProviderErrorKind::Unknown,
        };
    }
    ProviderError::new(PROVIDER, kind, extract_error_message(body))
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// GenerationProvider implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl GenerationProvider for AnthropicAdapter {
    async fn generate(&self, request: &Request) -> Result<Response, ProviderError> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        let status = resp.status();
        let response_body = resp
            .text()
            .await
            .map_err(|e| transport_error(PROVIDER, &e))?;

        if !status.is_success() {
            return Err(map_error(status, &response_body));
        }

        let json: serde_json::Value = serde_json::from_str(&response_body).map_err(|e| {
            ProviderError::new(
                PROVIDER,
                ProviderErrorKind::Unknown,
                format!("Failed to parse response JSON: {e}"),
            )
        })?;

        Ok(parse_response(&json))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
