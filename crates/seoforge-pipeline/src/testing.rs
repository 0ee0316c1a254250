//! Scripted providers shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use seoforge_llm::{
    FinishReason, GenerationClient, GenerationProvider, Request, Response, RetryPolicy, Usage,
};
use seoforge_types::ProviderError;

type Responder = dyn Fn(&Request) -> Result<String, ProviderError> + Send + Sync;

/// Answers every request through a closure and records what it was asked.
pub struct ScriptedLlm {
    responder: Box<Responder>,
    pub calls: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<Request>>>,
}

impl ScriptedLlm {
    pub fn new(
        responder: impl Fn(&Request) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wrap in a client that never retries.
    pub fn into_client(self) -> (GenerationClient, Arc<AtomicUsize>, Arc<Mutex<Vec<Request>>>) {
        let calls = self.calls.clone();
        let requests = self.requests.clone();
        let client = GenerationClient::new(self).with_retry_policy(RetryPolicy::no_retry());
        (client, calls, requests)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedLlm {
    async fn generate(&self, request: &Request) -> Result<Response, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.responder)(request)?;
        Ok(Response {
            id: "scripted".into(),
            text,
            model: request.model.clone(),
            usage: Usage::new(10, 10),
            finish_reason: FinishReason::EndTurn,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

/// A client whose every call returns `text`.
pub fn constant_client(text: &'static str) -> GenerationClient {
    ScriptedLlm::new(move |_| Ok(text.to_string())).into_client().0
}
