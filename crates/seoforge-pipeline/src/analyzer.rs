//! Competitive analysis of research results: recurring themes, title
//! patterns, and the content recommendations derived from them.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use seoforge_llm::GenerationClient;
use seoforge_types::{ContentIndicators, ResearchResult, SerpResult, ThemeAnalysis};

use crate::text::most_common;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z]+\b").expect("valid word pattern"));
static LISTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s+(best|top|ways|tips|tools|reasons)").expect("valid listicle pattern")
});
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"20\d{2}").expect("valid year pattern"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "this", "that", "these",
    "those", "it", "its", "your", "you", "we", "our", "their", "them", "what", "which", "who",
    "how", "when", "where", "why", "all", "each", "every", "both", "few", "more", "most",
    "other", "some", "such", "no", "not", "only", "own", "same", "so", "than", "too", "very",
    "just", "about", "into", "over", "after", "before", "between", "under", "again", "further",
    "then", "once", "here", "there", "any", "out",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

const MAX_THEMES: usize = 10;
const MAX_LLM_QUESTIONS: usize = 8;

/// Format and section guidance for the outline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecommendations {
    pub suggested_format: String,
    pub include_list_format: bool,
    pub include_how_to_section: bool,
    pub include_comparisons: bool,
    pub use_current_year: bool,
    pub address_questions: bool,
    pub top_themes_to_cover: Vec<String>,
}

#[derive(Clone, Default)]
pub struct SerpAnalyzer {
    client: Option<GenerationClient>,
}

impl SerpAnalyzer {
    /// With a client, questions are generated when the results carry none.
    pub fn new(client: Option<GenerationClient>) -> Self {
        Self { client }
    }

    pub async fn analyze(&self, mut research: ResearchResult) -> ResearchResult {
        tracing::info!(
            query = %research.query,
            results = research.results.len(),
            "Analyzing search results"
        );

        research.common_themes = extract_themes(&research.results);
        research.content_indicators = content_patterns(&research.results);

        if research.common_questions.is_empty() {
            if let Some(client) = &self.client {
                research.common_questions = extract_questions(client, &research).await;
            }
        }

        tracing::info!(
            themes = research.common_themes.len(),
            questions = research.common_questions.len(),
            "Analysis complete"
        );
        research
    }

    pub fn recommendations(&self, research: &ResearchResult) -> ContentRecommendations {
        content_recommendations(research)
    }
}

/// Stop-word filtered unigram and bigram themes with frequency of at least 2.
pub fn extract_themes(results: &[SerpResult]) -> Vec<ThemeAnalysis> {
    let all_text = results
        .iter()
        .map(|r| format!("{} {}", r.title, r.snippet))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let words: Vec<&str> = WORD
        .find_iter(&all_text)
        .map(|m| m.as_str())
        .filter(|w| w.len() > 3 && !STOP_SET.contains(w))
        .collect();

    let word_freq = most_common(words.iter());
    let bigram_freq = most_common(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));

    let mut themes = Vec::new();
    for (word, count) in word_freq.iter().take(10) {
        if *count < 2 {
            continue;
        }
        let related = bigram_freq
            .iter()
            .take(20)
            .filter(|(bg, _)| bg.contains(word.as_str()))
            .take(3)
            .map(|(bg, _)| bg.clone())
            .collect();
        themes.push(ThemeAnalysis {
            theme: word.clone(),
            frequency: *count as u32,
            related_keywords: related,
            example_headings: headings_with_theme(results, word),
        });
    }

    for (phrase, count) in bigram_freq.iter().take(5) {
        if *count < 2 {
            continue;
        }
        themes.push(ThemeAnalysis {
            theme: phrase.clone(),
            frequency: *count as u32,
            related_keywords: Vec::new(),
            example_headings: headings_with_theme(results, phrase),
        });
    }

    themes.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    themes.truncate(MAX_THEMES);
    themes
}

fn headings_with_theme(results: &[SerpResult], theme: &str) -> Vec<String> {
    let theme = theme.to_lowercase();
    results
        .iter()
        .filter(|r| r.title.to_lowercase().contains(&theme))
        .take(3)
        .map(|r| r.title.clone())
        .collect()
}

/// Count title patterns across the results.
pub fn content_patterns(results: &[SerpResult]) -> ContentIndicators {
    let mut c = ContentIndicators::default();
    for result in results {
        let title = result.title.to_lowercase();
        if LISTICLE.is_match(&title) {
            c.listicles += 1;
        }
        if title.contains("how to") {
            c.how_to += 1;
        }
        if ["ultimate", "complete", "comprehensive", "definitive"]
            .iter()
            .any(|w| title.contains(w))
        {
            c.ultimate_guide += 1;
        }
        if [" vs ", "compared", "comparison", "versus"]
            .iter()
            .any(|w| title.contains(w))
        {
            c.comparison += 1;
        }
        if YEAR.is_match(&title) {
            c.year_specific += 1;
        }
        if ["what", "why", "how", "when", "where", "which"]
            .iter()
            .any(|q| title.starts_with(q))
        {
            c.question_based += 1;
        }
    }
    c
}

pub fn content_recommendations(research: &ResearchResult) -> ContentRecommendations {
    let c = &research.content_indicators;
    let suggested_format = if c.listicles >= 5 {
        "listicle"
    } else if c.how_to >= 4 {
        "how_to_guide"
    } else if c.comparison >= 4 {
        "comparison"
    } else {
        "comprehensive_guide"
    };
    ContentRecommendations {
        suggested_format: suggested_format.to_string(),
        include_list_format: c.listicles >= 3,
        include_how_to_section: c.how_to >= 2,
        include_comparisons: c.comparison >= 2,
        use_current_year: c.year_specific >= 3,
        address_questions: !research.common_questions.is_empty(),
        top_themes_to_cover: research
            .common_themes
            .iter()
            .take(5)
            .map(|t| t.theme.clone())
            .collect(),
    }
}

// Best effort: any failure yields no questions.
async fn extract_questions(client: &GenerationClient, research: &ResearchResult) -> Vec<String> {
    let listing = research
        .results
        .iter()
        .take(5)
        .map(|r| format!("- {}: {}", r.title, r.snippet))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "Based on these search results for \"{}\", identify 5-8 common questions users might have:\n\n\
         Results:\n{listing}\n\n\
         Return only the questions, one per line, without numbering.",
        research.query
    );

    match client.generate(&prompt, None, Some(500), Some(0.3)).await {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(MAX_LLM_QUESTIONS)
            .map(str::to_string)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Question extraction failed");
            Vec::new()
        }
    }
}
