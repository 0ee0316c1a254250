//! Text-generation client for the seoforge pipeline.
//!
//! Provides the `GenerationProvider` trait, HTTP adapters for OpenAI and
//! Anthropic, the middleware chain, and `GenerationClient`, which classifies
//! provider failures and retries the transient ones with bounded backoff.

#[cfg(feature = "providers")]
mod anthropic;
mod client;
#[cfg(feature = "providers")]
mod openai;
mod provider;
pub mod retry;
mod types;

#[cfg(feature = "providers")]
pub use anthropic::{AnthropicAdapter, ANTHROPIC_DEFAULT_MODEL};
pub use client::*;
#[cfg(feature = "providers")]
pub use openai::{OpenAiAdapter, OPENAI_DEFAULT_MODEL};
pub use provider::*;
pub use retry::{execute_with_retry, BackoffPolicy, RetryPolicy};
pub use types::*;
