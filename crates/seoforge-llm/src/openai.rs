use async_trait::async_trait;
use serde_json::json;

use crate::provider::transport_error;
use crate::{FinishReason, GenerationProvider, Request, Response, Usage};
use seoforge_types::{ProviderError, ProviderErrorKind, SeoforgeError};

const PROVIDER: &str = "openai";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

// ---------------------------------------------------------------------------
// OpenAiAdapter
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OpenAiAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    default_model: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com".to_string(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, SeoforgeError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| SeoforgeError::Config("OPENAI_API_KEY is not set".into()))?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    fn build_request_body(&self, request: &Request) -> serde_json::Value {
        let mut input = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            input.push(json!({ "role": "system", "content": system }));
        }
        input.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": request.model,
            "input": input,
            "max_output_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    fn parse_response(&self, body: serde_json::Value) -> Response {
        let id = body["id"].as_str().unwrap_or("").to_string();
        let model = body["model"].as_str().unwrap_or("").to_string();

        let finish_reason = match body["status"].as_str() {
            Some("incomplete") => FinishReason::MaxTokens,
            _ => FinishReason::EndTurn,
        };

        let mut text_parts: Vec<&str> = Vec::new();
        if let Some(output) = body["output"].as_array() {
            for item in output.iter().filter(|i| i["type"] == "message") {
                if let Some(content) = item["content"].as_array() {
                    text_parts.extend(
                        content
                            .iter()
                            .filter(|b| b["type"] == "output_text")
                            .filter_map(|b| b["text"].as_str()),
                    );
                }
            }
        }

        let usage = Usage::new(
            body["usage"]["input_tokens"].as_u64().unwrap_or(0),
            body["usage"]["output_tokens"].as_u64().unwrap_or(0),
        );

        Response {
            id,
            text: text_parts.join(""),
            model,
            usage,
            finish_reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v["error"]["code"].as_str())
        .unwrap_or("");

    let kind = match code {
        "model_not_found" => ProviderErrorKind::NotFound,
        "invalid_api_key" => ProviderErrorKind::AuthFailure,
        "rate_limit_exceeded" => ProviderErrorKind::RateLimited,
        // insufficient_quota also arrives as a 429 but will not clear on retry.
        "insufficient_quota" => ProviderErrorKind::PermissionDenied,
        _ => ProviderErrorKind::from_http_status(status.as_u16()),
    };
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
impl GenerationProvider for OpenAiAdapter {
    async fn generate(&self, request: &Request) -> Result<Response, ProviderError> {
        let body = self.build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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

        Ok(self.parse_response(json))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> Request {
        Request {
            model: OPENAI_DEFAULT_MODEL.into(),
            system: Some("You are helpful.".into()),
            prompt: "Hello".into(),
            max_tokens: 4000,
            temperature: 0.7,
        }
    }

    #[test]
    fn build_request_body_produces_correct_structure() {
        let adapter = OpenAiAdapter::new("test-key".into());
        let body = adapter.build_request_body(&make_request());

        assert_eq!(body["model"], OPENAI_DEFAULT_MODEL);
        assert_eq!(body["max_output_tokens"], 4000);
        let input = body["input"].as_array().unwrap();
        assert_eq!(input.len(), 2);
        assert_eq!(input[0]["role"], "system");
        assert_eq!(input[1]["role"], "user");
        assert_eq!(input[1]["content"], "Hello");
    }

    #[test]
    fn build_request_body_without_system() {
        let adapter = OpenAiAdapter::new("test-key".into());
        let mut req = make_request();
        req.system = None;
        let body = adapter.build_request_body(&req);
        assert_eq!(body["input"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parse_response_handles_complete_response() {
        let adapter = OpenAiAdapter::new("test-key".into());
        let response_json = json!({
            "id": "resp_abc123",
            "output": [
                {
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "Hello! How can I help you?" }
                    ]
                }
            ],
            "usage": { "input_tokens": 100, "output_tokens": 50 },
            "model": "gpt-4o",
            "status": "completed"
        });

        let resp = adapter.parse_response(response_json);
        assert_eq!(resp.id, "resp_abc123");
        assert_eq!(resp.text, "Hello! How can I help you?");
        assert_eq!(resp.finish_reason, FinishReason::EndTurn);
        assert_eq!(resp.usage.total_tokens, 150);
    }

    #[test]
    fn parse_response_handles_incomplete_status() {
        let adapter = OpenAiAdapter::new("test-key".into());
        let resp = adapter.parse_response(json!({
            "id": "resp_inc",
            "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "Partial" }] }],
            "status": "incomplete"
        }));
        assert_eq!(resp.finish_reason, FinishReason::MaxTokens);
        assert_eq!(resp.text, "Partial");
    }

    #[test]
    fn error_mapping_uses_code_before_status() {
        let err = map_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error": {"message": "The model does not exist", "code": "model_not_found"}}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::NotFound);
        assert!(err.is_terminal());

        let err = map_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "You exceeded your current quota", "code": "insufficient_quota"}}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::PermissionDenied);
        assert!(err.is_terminal());
    }

    #[test]
    fn error_mapping_by_status() {
        let err = map_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "rate limited"}}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert!(!err.is_terminal());

        let err = map_error(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err.kind, ProviderErrorKind::ServerError);
        assert_eq!(err.message, "upstream");
    }

    #[test]
    fn with_base_url_sets_custom_url() {
        let adapter = OpenAiAdapter::new("key".into())
            .with_base_url("https://custom.api.com".into())
            .with_default_model("gpt-4o".into());
        assert_eq!(adapter.base_url, "https://custom.api.com");
        assert_eq!(adapter.default_model(), "gpt-4o");
    }
}
