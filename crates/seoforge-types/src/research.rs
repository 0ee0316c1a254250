use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::checkpoint::CheckpointPayload;
use crate::SeoforgeError;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpResult {
    pub rank: u32,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A recurring theme across competitor titles and snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeAnalysis {
    pub theme: String,
    pub frequency: u32,
    #[serde(default)]
    pub related_keywords: Vec<String>,
    #[serde(default)]
    pub example_headings: Vec<String>,
}

/// Counts of title patterns among the ranked results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentIndicators {
    pub listicles: u32,
    pub how_to: u32,
    pub ultimate_guide: u32,
    pub comparison: u32,
    pub year_specific: u32,
    pub question_based: u32,
}

/// Output of the research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub total_results: u32,
    pub results: Vec<SerpResult>,
    #[serde(default)]
    pub common_themes: Vec<ThemeAnalysis>,
    #[serde(default)]
    pub common_questions: Vec<String>,
    #[serde(default)]
    pub avg_title_length: f64,
    #[serde(default)]
    pub content_indicators: ContentIndicators,
    #[serde(default)]
    pub top_domains: Vec<String>,
}

impl ResearchResult {
    /// Ranks must be exactly `1..=N` with no duplicates.
    pub fn check_ranks(&self) -> Result<(), SeoforgeError> {
        let mut seen = HashSet::with_capacity(self.results.len());
        let n = self.results.len() as u32;
        for r in &self.results {
            if r.rank == 0 || r.rank > n || !seen.insert(r.rank) {
                return Err(SeoforgeError::Parse {
                    what: "research result".into(),
                    message: format!("rank {} is not unique within 1..={n}", r.rank),
                });
            }
        }
        Ok(())
    }
}

impl CheckpointPayload for ResearchResult {
    const KIND: &'static str = "research";

    fn check_schema(&self) -> Result<(), SeoforgeError> {
        if self.query.trim().is_empty() {
            return Err(SeoforgeError::Parse {
                what: "research result".into(),
                message: "empty query".into(),
            });
        }
        self.check_ranks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rank: u32) -> SerpResult {
        SerpResult {
            rank,
            url: format!("https://example.com/{rank}"),
            title: format!("Result {rank}"),
            snippet: String::new(),
            domain: Some("example.com".into()),
        }
    }

    fn research(ranks: &[u32]) -> ResearchResult {
        ResearchResult {
            query: "rust".into(),
            total_results: ranks.len() as u32,
            results: ranks.iter().map(|r| result(*r)).collect(),
            common_themes: vec![],
            common_questions: vec![],
            avg_title_length: 0.0,
            content_indicators: ContentIndicators::default(),
            top_domains: vec![],
        }
    }

    #[test]
    fn contiguous_ranks_accepted_in_any_order() {
        assert!(research(&[2, 1, 3]).check_schema().is_ok());
        assert!(research(&[]).check_schema().is_ok());
    }

    #[test]
    fn duplicate_rank_rejected() {
        assert!(research(&[1, 1, 2]).check_schema().is_err());
    }

    #[test]
    fn out_of_range_rank_rejected() {
        assert!(research(&[1, 4]).check_schema().is_err());
        assert!(research(&[0]).check_schema().is_err());
    }

    #[test]
    fn empty_query_rejected() {
        let mut r = research(&[1]);
        r.query = "  ".into();
        assert!(r.check_schema().is_err());
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"query":"q","total_results":1,"results":[{"rank":1,"url":"u","title":"t"}]}"#;
        let parsed: ResearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content_indicators, ContentIndicators::default());
        assert!(parsed.results[0].domain.is_none());
    }
}
