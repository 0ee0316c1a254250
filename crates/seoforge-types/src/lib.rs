//! Shared types, errors, job model, and checkpoint encoding for the seoforge pipeline.
//!
//! This crate provides the foundational types used across all other seoforge crates:
//! - `SeoforgeError`: unified error taxonomy
//! - `ProviderError`: classified failure from an external provider
//! - `Job` / `JobStatus`: the unit of work and its state machine
//! - `ResearchResult`, `Outline`, `Article`: the stage artifacts
//! - `Checkpoint`: schema-versioned encoding of persisted artifacts

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod article;
pub mod checkpoint;
pub mod job;
pub mod outline;
pub mod research;

pub use article::{
    count_words, Article, ArticleSection, ExternalReference, FaqItem, KeywordAnalysis, LinkSuggestion,
    QualityScore, ResearchSummary, SeoMetadata, UniquenessIndicators, ValidationReport,
};
pub use checkpoint::{Checkpoint, CheckpointPayload, CHECKPOINT_SCHEMA_VERSION};
pub use job::{ArticleRequest, Job, JobId, JobStatus};
pub use outline::{Outline, OutlineSection};
pub use research::{ContentIndicators, ResearchResult, SerpResult, ThemeAnalysis};

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Structural category of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    NotFound,
    AuthFailure,
    InvalidRequest,
    PermissionDenied,
    RateLimited,
    ServerError,
    Timeout,
    Connection,
    EmptyResponse,
    /// The category could not be determined structurally.
    Unknown,
}

impl ProviderErrorKind {
    /// Map an HTTP status code returned by a provider API to a category.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 413 | 422 => ProviderErrorKind::InvalidRequest,
            401 => ProviderErrorKind::AuthFailure,
            403 => ProviderErrorKind::PermissionDenied,
            404 => ProviderErrorKind::NotFound,
            408 | 504 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimited,
            500..=599 => ProviderErrorKind::ServerError,
            _ => ProviderErrorKind::Unknown,
        }
    }

    /// Structural verdict, or `None` when the category is [`Unknown`](Self::Unknown).
    fn structural_class(self) -> Option<ErrorClass> {
        match self {
            ProviderErrorKind::NotFound
            | ProviderErrorKind::AuthFailure
            | ProviderErrorKind::InvalidRequest
            | ProviderErrorKind::PermissionDenied => Some(ErrorClass::Terminal),
            ProviderErrorKind::RateLimited
            | ProviderErrorKind::ServerError
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::Connection
            | ProviderErrorKind::EmptyResponse => Some(ErrorClass::Retryable),
            ProviderErrorKind::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::NotFound => "not_found",
            ProviderErrorKind::AuthFailure => "auth_failure",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::PermissionDenied => "permission_denied",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::ServerError => "server_error",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Connection => "connection",
            ProviderErrorKind::EmptyResponse => "empty_response",
            ProviderErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a failed provider call may succeed if issued again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Terminal,
}

/// Message fragments that mark an otherwise unclassified failure as terminal.
pub const TERMINAL_MESSAGE_MARKERS: &[&str] = &[
    "not found",
    "notfound",
    "model_not_found",
    "invalid api key",
    "authentication",
    "invalid request",
    "permission denied",
    "model not available",
    "non-retryable",
];

/// A failure reported by a research or generation provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider} returned {kind}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Classify this failure.
    ///
    /// The structural category decides first. Only [`ProviderErrorKind::Unknown`]
    /// falls back to a case-insensitive match against [`TERMINAL_MESSAGE_MARKERS`];
    /// unknown failures without a marker are retryable.
    pub fn classify(&self) -> ErrorClass {
        if let Some(class) = self.kind.structural_class() {
            return class;
        }
        let message = self.message.to_lowercase();
        if TERMINAL_MESSAGE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            ErrorClass::Terminal
        } else {
            ErrorClass::Retryable
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.classify() == ErrorClass::Terminal
    }
}

// ---------------------------------------------------------------------------
// Stage: identifies where in the pipeline a failure happened
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Analysis,
    Outline,
    Generation,
    Validation,
    Scoring,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Research => "research",
            Stage::Analysis => "analysis",
            Stage::Outline => "outline",
            Stage::Generation => "generation",
            Stage::Validation => "validation",
            Stage::Scoring => "scoring",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SeoforgeError
// ---------------------------------------------------------------------------

/// Unified error type for all seoforge subsystems.
#[derive(Debug, thiserror::Error)]
pub enum SeoforgeError {
    // === Input ===
    #[error("Invalid request: {0}")]
    Validation(String),

    // === Provider ===
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Non-retryable provider error: {0}")]
    TerminalProvider(ProviderError),

    #[error("Provider call failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: ProviderError },

    // === Structured output ===
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    // === Job store ===
    #[error("Job store error: {0}")]
    Persistence(String),

    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Job {id} cannot be run from status {status}")]
    NotResumable { id: JobId, status: JobStatus },

    // === Pipeline ===
    #[error("{stage} stage failed: {message}")]
    Pipeline { stage: Stage, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SeoforgeError {
    /// Wrap `cause` with the stage it happened in.
    pub fn in_stage(stage: Stage, cause: &SeoforgeError) -> Self {
        match cause {
            // Already wrapped; keep the innermost stage.
            SeoforgeError::Pipeline { stage, message } => SeoforgeError::Pipeline {
                stage: *stage,
                message: message.clone(),
            },
            other => SeoforgeError::Pipeline {
                stage,
                message: other.to_string(),
            },
        }
    }

    /// Returns `true` if the error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SeoforgeError::Provider(e) => e.classify() == ErrorClass::Retryable,
            _ => false,
        }
    }

    /// Returns `true` if the error is permanent and retrying will not help.
    pub fn is_terminal(&self) -> bool {
        match self {
            SeoforgeError::Provider(e) => e.is_terminal(),
            SeoforgeError::TerminalProvider(_)
            | SeoforgeError::Validation(_)
            | SeoforgeError::NotResumable { .. }
            | SeoforgeError::JobNotFound(_) => true,
            _ => false,
        }
    }
}

/// A convenience alias for `Result<T, SeoforgeError>`.
pub type Result<T> = std::result::Result<T, SeoforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_err(kind: ProviderErrorKind, message: &str) -> ProviderError {
        ProviderError::new("test", kind, message)
    }

    #[test]
    fn provider_error_display() {
        let err = provider_err(ProviderErrorKind::RateLimited, "slow down");
        assert_eq!(err.to_string(), "test returned rate_limited: slow down");
    }

    #[test]
    fn terminal_categories_classify_terminal() {
        for kind in [
            ProviderErrorKind::NotFound,
            ProviderErrorKind::AuthFailure,
            ProviderErrorKind::InvalidRequest,
            ProviderErrorKind::PermissionDenied,
        ] {
            assert_eq!(provider_err(kind, "x").classify(), ErrorClass::Terminal, "{kind}");
        }
    }

    #[test]
    fn retryable_categories_classify_retryable() {
        for kind in [
            ProviderErrorKind::RateLimited,
            ProviderErrorKind::ServerError,
            ProviderErrorKind::Timeout,
            ProviderErrorKind::Connection,
            ProviderErrorKind::EmptyResponse,
        ] {
            assert_eq!(provider_err(kind, "x").classify(), ErrorClass::Retryable, "{kind}");
        }
    }

    #[test]
    fn structural_category_wins_over_message() {
        // A rate limit whose message happens to mention "not found" is still retryable.
        let err = provider_err(ProviderErrorKind::RateLimited, "Quota bucket NOT FOUND");
        assert_eq!(err.classify(), ErrorClass::Retryable);
        let err = provider_err(ProviderErrorKind::AuthFailure, "try again later");
        assert_eq!(err.classify(), ErrorClass::Terminal);
    }

    #[test]
    fn unknown_category_falls_back_to_message_markers() {
        for message in [
            "Model Not Found",
            "INVALID API KEY provided",
            "Authentication required",
            "Invalid Request: bad temperature",
            "Permission Denied for org",
            "model not available in region",
            "Non-Retryable error: quota disabled",
        ] {
            assert_eq!(
                provider_err(ProviderErrorKind::Unknown, message).classify(),
                ErrorClass::Terminal,
                "{message}"
            );
        }
    }

    #[test]
    fn unknown_category_without_marker_is_retryable() {
        let err = provider_err(ProviderErrorKind::Unknown, "rate limit exceeded");
        assert_eq!(err.classify(), ErrorClass::Retryable);
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ProviderErrorKind::from_http_status(400), ProviderErrorKind::InvalidRequest);
        assert_eq!(ProviderErrorKind::from_http_status(401), ProviderErrorKind::AuthFailure);
        assert_eq!(ProviderErrorKind::from_http_status(403), ProviderErrorKind::PermissionDenied);
        assert_eq!(ProviderErrorKind::from_http_status(404), ProviderErrorKind::NotFound);
        assert_eq!(ProviderErrorKind::from_http_status(429), ProviderErrorKind::RateLimited);
        assert_eq!(ProviderErrorKind::from_http_status(503), ProviderErrorKind::ServerError);
        assert_eq!(ProviderErrorKind::from_http_status(504), ProviderErrorKind::Timeout);
        assert_eq!(ProviderErrorKind::from_http_status(302), ProviderErrorKind::Unknown);
    }

    #[test]
    fn error_display_pipeline() {
        let err = SeoforgeError::Pipeline {
            stage: Stage::Generation,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "generation stage failed: boom");
    }

    #[test]
    fn error_display_retries_exhausted() {
        let err = SeoforgeError::RetriesExhausted {
            attempts: 3,
            last: provider_err(ProviderErrorKind::Timeout, "deadline"),
        };
        assert_eq!(
            err.to_string(),
            "Provider call failed after 3 attempts: test returned timeout: deadline"
        );
    }

    #[test]
    fn in_stage_keeps_innermost_stage() {
        let inner = SeoforgeError::Pipeline {
            stage: Stage::Outline,
            message: "bad".into(),
        };
        let wrapped = SeoforgeError::in_stage(Stage::Generation, &inner);
        assert!(matches!(wrapped, SeoforgeError::Pipeline { stage: Stage::Outline, .. }));
    }

    #[test]
    fn in_stage_wraps_cause_message() {
        let cause = SeoforgeError::TerminalProvider(provider_err(
            ProviderErrorKind::AuthFailure,
            "invalid api key",
        ));
        let wrapped = SeoforgeError::in_stage(Stage::Research, &cause);
        assert_eq!(
            wrapped.to_string(),
            "research stage failed: Non-retryable provider error: test returned auth_failure: invalid api key"
        );
    }

    #[test]
    fn retryable_and_terminal_helpers() {
        let retryable = SeoforgeError::Provider(provider_err(ProviderErrorKind::ServerError, "500"));
        assert!(retryable.is_retryable());
        assert!(!retryable.is_terminal());

        let terminal = SeoforgeError::TerminalProvider(provider_err(ProviderErrorKind::NotFound, "x"));
        assert!(!terminal.is_retryable());
        assert!(terminal.is_terminal());

        assert!(SeoforgeError::Validation("bad".into()).is_terminal());
        assert!(!SeoforgeError::Persistence("disk".into()).is_retryable());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SeoforgeError = io_err.into();
        assert!(matches!(err, SeoforgeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SeoforgeError = json_err.into();
        assert!(matches!(err, SeoforgeError::Json(_)));
    }

    #[test]
    fn stage_serializes_to_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::Research).unwrap(), "\"research\"");
        assert_eq!(Stage::Scoring.to_string(), "scoring");
    }
}
