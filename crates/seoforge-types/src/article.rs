use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::checkpoint::CheckpointPayload;
use crate::SeoforgeError;

/// Whitespace-delimited word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub heading: String,
    pub level: u8,
    pub content: String,
    pub word_count: usize,
}

impl ArticleSection {
    pub fn new(heading: impl Into<String>, level: u8, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            heading: heading.into(),
            level,
            word_count: count_words(&content),
            content,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub title_tag: String,
    pub meta_description: String,
    pub og_title: String,
    pub og_description: String,
    pub focus_keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub primary_keyword: String,
    pub primary_count: usize,
    /// Percentage of words, two decimals.
    pub primary_density: f64,
    #[serde(default)]
    pub secondary_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub lsi_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub anchor_text: String,
    #[serde(alias = "suggested_target_topic")]
    pub target_topic: String,
    #[serde(default)]
    pub context: String,
    #[serde(default = "default_relevance")]
    pub relevance_score: f64,
}

fn default_relevance() -> f64 {
    0.7
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub source_name: String,
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub citation_context: String,
    #[serde(default)]
    pub credibility_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// Outcome of the nine structural SEO checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub score: f64,
    pub checks: BTreeMap<String, bool>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> usize {
        self.checks.values().filter(|ok| **ok).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UniquenessIndicators {
    pub vocabulary_richness: f64,
    pub sentence_variety: f64,
    pub cliche_count: usize,
    pub variety_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall_score: f64,
    pub readability_score: f64,
    pub seo_score: f64,
    pub uniqueness_indicators: UniquenessIndicators,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    pub needs_revision: bool,
    /// Model-written revision advice, present only when revision is needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub query: String,
    pub results_analyzed: usize,
    #[serde(default)]
    pub top_themes: Vec<String>,
    pub questions_found: usize,
}

/// The finished content artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub sections: Vec<ArticleSection>,
    pub full_content: String,
    pub word_count: usize,
    pub seo_metadata: SeoMetadata,
    pub keyword_analysis: KeywordAnalysis,
    #[serde(default)]
    pub internal_links: Vec<LinkSuggestion>,
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityScore>,
    #[serde(default)]
    pub generation_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_summary: Option<ResearchSummary>,
}

impl CheckpointPayload for Article {
    const KIND: &'static str = "result";

    fn check_schema(&self) -> Result<(), SeoforgeError> {
        if self.title.trim().is_empty() {
            return Err(SeoforgeError::Parse {
                what: "article".into(),
                message: "empty title".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_counts_words() {
        let s = ArticleSection::new("Intro", 2, "one two\nthree   four");
        assert_eq!(s.word_count, 4);
    }

    #[test]
    fn report_counts_passed_checks() {
        let mut checks = BTreeMap::new();
        checks.insert("a".to_string(), true);
        checks.insert("b".to_string(), false);
        checks.insert("c".to_string(), true);
        let report = ValidationReport {
            checks,
            ..Default::default()
        };
        assert_eq!(report.passed(), 2);
    }

    #[test]
    fn link_relevance_defaults() {
        let link: LinkSuggestion =
            serde_json::from_str(r#"{"anchor_text":"a","suggested_target_topic":"t"}"#).unwrap();
        assert_eq!(link.target_topic, "t");
        assert_eq!(link.relevance_score, 0.7);
        assert!(link.context.is_empty());
    }
}
