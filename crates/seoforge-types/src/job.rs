use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Article, SeoforgeError};

/// Opaque job identifier (UUID v4).
pub type JobId = Uuid;

pub const MIN_TOPIC_CHARS: usize = 3;
pub const MAX_TOPIC_CHARS: usize = 500;
pub const MIN_WORD_COUNT: u32 = 500;
pub const MAX_WORD_COUNT: u32 = 10_000;
pub const DEFAULT_WORD_COUNT: u32 = 1500;
pub const DEFAULT_LANGUAGE: &str = "en";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
///
/// `Pending → Researching → Analyzing → Outlining → Generating → Validating →
/// Completed`, with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Researching,
    Analyzing,
    Outlining,
    Generating,
    Validating,
    Completed,
    Failed,
}

impl JobStatus {
    /// Progress value recorded when the job enters this status.
    ///
    /// `Validating` is entered at 80 and advanced to 90 for scoring. `Failed`
    /// has no entry value; the last progress is kept.
    pub fn entry_progress(&self) -> Option<f64> {
        match self {
            JobStatus::Pending => Some(0.0),
            JobStatus::Researching => Some(10.0),
            JobStatus::Analyzing => Some(20.0),
            JobStatus::Outlining => Some(35.0),
            JobStatus::Generating => Some(50.0),
            JobStatus::Validating => Some(80.0),
            JobStatus::Completed => Some(100.0),
            JobStatus::Failed => None,
        }
    }

    /// Step description recorded alongside [`entry_progress`](Self::entry_progress).
    pub fn entry_step(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Job created",
            JobStatus::Researching => "Fetching search results",
            JobStatus::Analyzing => "Analyzing competitive landscape",
            JobStatus::Outlining => "Creating article outline",
            JobStatus::Generating => "Generating article content",
            JobStatus::Validating => "Validating SEO criteria",
            JobStatus::Completed => "Article generation complete",
            JobStatus::Failed => "Failed",
        }
    }

    /// Only pending and failed jobs may be (re)started.
    pub fn is_resumable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Researching => "researching",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Outlining => "outlining",
            JobStatus::Generating => "generating",
            JobStatus::Validating => "validating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = SeoforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "researching" => Ok(JobStatus::Researching),
            "analyzing" => Ok(JobStatus::Analyzing),
            "outlining" => Ok(JobStatus::Outlining),
            "generating" => Ok(JobStatus::Generating),
            "validating" => Ok(JobStatus::Validating),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(SeoforgeError::Validation(format!(
                "unknown job status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleRequest
// ---------------------------------------------------------------------------

/// Caller input for a new article job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRequest {
    pub topic: String,
    #[serde(default = "default_word_count")]
    pub target_word_count: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_word_count() -> u32 {
    DEFAULT_WORD_COUNT
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl ArticleRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_word_count: DEFAULT_WORD_COUNT,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_word_count(mut self, words: u32) -> Self {
        self.target_word_count = words;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Trim and bounds-check the request, returning the normalised form.
    pub fn validate(self) -> Result<Self, SeoforgeError> {
        let topic = self.topic.trim().to_string();
        let topic_chars = topic.chars().count();
        if topic_chars < MIN_TOPIC_CHARS {
            return Err(SeoforgeError::Validation(format!(
                "topic must be at least {MIN_TOPIC_CHARS} characters"
            )));
        }
        if topic_chars > MAX_TOPIC_CHARS {
            return Err(SeoforgeError::Validation(format!(
                "topic must be at most {MAX_TOPIC_CHARS} characters"
            )));
        }
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&self.target_word_count) {
            return Err(SeoforgeError::Validation(format!(
                "target word count {} outside {MIN_WORD_COUNT}..={MAX_WORD_COUNT}",
                self.target_word_count
            )));
        }
        let language = self.language.trim().to_string();
        let language_chars = language.chars().count();
        if !(2..=10).contains(&language_chars) {
            return Err(SeoforgeError::Validation(format!(
                "language code '{language}' must be 2-10 characters"
            )));
        }
        Ok(Self {
            topic,
            target_word_count: self.target_word_count,
            language,
        })
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Caller-facing view of a job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f64,
    pub current_step: String,
    pub topic: String,
    pub target_word_count: u32,
    pub language: String,
    pub research_collected: bool,
    pub outline_generated: bool,
    pub content_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn request(&self) -> ArticleRequest {
        ArticleRequest {
            topic: self.topic.clone(),
            target_word_count: self.target_word_count,
            language: self.language.clone(),
        }
    }
}
