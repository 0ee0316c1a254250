//! Resumable SEO article pipeline.
//!
//! A job moves through research, analysis, outlining, content generation,
//! validation and scoring. Each stage's artifact is checkpointed in a
//! [`JobStore`], so a failed job can be rerun without repeating the
//! stages that already succeeded.
//!
//! - [`Orchestrator`] drives jobs and exposes the stand-alone operations
//! - [`research`] / [`analyzer`] gather and enrich search results
//! - [`outline`] / [`content`] produce the outline and article via the LLM
//! - [`validation`] / [`quality`] are deterministic checks over the article
//! - [`store`] persists jobs in memory or as JSON files

pub mod analyzer;
pub mod config;
pub mod content;
pub mod events;
pub mod orchestrator;
pub mod outline;
pub mod quality;
pub mod research;
pub mod store;
pub mod text;
pub mod validation;

#[cfg(test)]
mod testing;

pub use analyzer::{ContentRecommendations, SerpAnalyzer};
pub use config::{LlmProviderKind, Settings};
pub use content::ContentGenerator;
pub use events::{EventEmitter, NoopSink, ProgressEvent, ProgressSink};
pub use orchestrator::{generation_client, research_service, Orchestrator};
pub use outline::OutlineGenerator;
pub use quality::QualityScorer;
pub use research::{ResearchProvider, ResearchService, SerpApiProvider, SyntheticResearch};
pub use store::{FileJobStore, JobRecord, JobStore, MemoryJobStore, ResumableData};
pub use validation::{SeoCheck, SeoValidator};
