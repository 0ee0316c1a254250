//! Content quality scoring: readability, vocabulary variety and an overall
//! weighted score that decides whether an article needs revision.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use seoforge_llm::GenerationClient;
use seoforge_types::{Article, QualityScore, UniquenessIndicators};

use crate::text::round_to;

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence pattern"));

pub const REVISION_THRESHOLD: f64 = 60.0;
/// SEO component used when the article carries no validation report.
pub const DEFAULT_SEO_SCORE: f64 = 80.0;

const CLICHES: [&str; 9] = [
    "in today's world",
    "at the end of the day",
    "it goes without saying",
    "needless to say",
    "in conclusion",
    "last but not least",
    "each and every",
    "first and foremost",
    "when all is said and done",
];

#[derive(Clone, Default)]
pub struct QualityScorer {
    client: Option<GenerationClient>,
}

impl QualityScorer {
    /// The client is only used for revision notes on weak articles.
    pub fn new(client: Option<GenerationClient>) -> Self {
        Self { client }
    }

    pub fn score(&self, article: &Article) -> QualityScore {
        tracing::info!(title = %article.title, "Scoring content quality");

        let readability = readability_score(&article.full_content);
        let seo = article
            .validation
            .as_ref()
            .map_or(DEFAULT_SEO_SCORE, |v| v.score);
        let uniqueness = assess_uniqueness(&article.full_content);
        let suggestions = improvement_suggestions(article, readability, seo);

        let overall = readability * 0.4 + seo * 0.4 + uniqueness.variety_score * 0.2;
        let needs_revision = overall < REVISION_THRESHOLD;

        let score = QualityScore {
            overall_score: round_to(overall, 1),
            readability_score: round_to(readability, 1),
            seo_score: round_to(seo, 1),
            uniqueness_indicators: uniqueness,
            improvement_suggestions: suggestions,
            needs_revision,
            revision_notes: None,
        };
        tracing::info!(
            overall_score = score.overall_score,
            needs_revision,
            "Quality scoring complete"
        );
        score
    }

    /// Score the article and, when it needs revision, attach the model's
    /// revision notes.
    pub async fn assess(&self, article: &Article) -> QualityScore {
        let mut score = self.score(article);
        score.revision_notes = self.suggest_revisions(article, &score).await;
        score
    }

    /// Ask the model for concrete revisions. Only runs for articles that need
    /// revision; any failure yields `None`.
    pub async fn suggest_revisions(&self, article: &Article, score: &QualityScore) -> Option<String> {
        let client = self.client.as_ref()?;
        if !score.needs_revision {
            return None;
        }

        let issues = score
            .improvement_suggestions
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Review this article and suggest specific revisions to improve quality.

Current scores:
- Overall: {}/100
- Readability: {}/100
- SEO: {}/100

Issues identified:
{issues}

Article title: {}
Word count: {}

Provide 3-5 specific, actionable revisions to improve this content:",
            score.overall_score,
            score.readability_score,
            score.seo_score,
            article.title,
            article.word_count,
        );

        match client.generate(&prompt, None, Some(500), Some(0.5)).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Revision suggestions failed");
                None
            }
        }
    }
}

/// Sentences are the trimmed pieces between runs of `.`, `!` or `?` that have
/// more than two words.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() > 2)
        .collect()
}

pub fn count_syllables(word: &str) -> usize {
    let word = word.trim().to_lowercase();
    if word.chars().count() <= 3 {
        return 1;
    }
    let mut count = 0usize;
    let mut prev_vowel = false;
    for c in word.chars() {
        let is_vowel = "aeiouy".contains(c);
        if is_vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = is_vowel;
    }
    if word.ends_with('e') {
        count = count.saturating_sub(1);
    }
    count.max(1)
}

/// Flesch reading ease mapped onto a 0-100 score favouring the 50-70 band.
pub fn readability_score(content: &str) -> f64 {
    let sentences = split_sentences(content);
    let words: Vec<&str> = content.split_whitespace().collect();
    if sentences.is_empty() || words.is_empty() {
        return 50.0;
    }

    let word_count = words.len() as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let avg_sentence = word_count / sentences.len() as f64;
    let avg_syllables = syllables as f64 / word_count;

    let flesch = (206.835 - 1.015 * avg_sentence - 84.6 * avg_syllables).clamp(0.0, 100.0);
    let mut score = if (50.0..=70.0).contains(&flesch) {
        90.0 + (flesch - 60.0)
    } else if flesch > 70.0 {
        85.0 - (flesch - 70.0) * 0.3
    } else {
        60.0 + (flesch / 50.0) * 20.0
    };

    let long = sentences
        .iter()
        .filter(|s| s.split_whitespace().count() > 30)
        .count();
    if long as f64 > sentences.len() as f64 * 0.2 {
        score -= 10.0;
    }

    let paragraphs = content.split("\n\n").filter(|p| !p.trim().is_empty()).count();
    let avg_paragraph = if paragraphs > 0 {
        word_count / paragraphs as f64
    } else {
        0.0
    };
    if (50.0..=150.0).contains(&avg_paragraph) {
        score += 5.0;
    } else if avg_paragraph > 200.0 {
        score -= 5.0;
    }

    score.clamp(0.0, 100.0)
}

/// Vocabulary richness, sentence-length spread and cliché use of the lowercased text.
pub fn assess_uniqueness(content: &str) -> UniquenessIndicators {
    let content = content.to_lowercase();
    let words: Vec<&str> = content.split_whitespace().collect();

    let vocabulary = if words.is_empty() {
        0.0
    } else {
        let unique: HashSet<&str> = words.iter().copied().collect();
        (unique.len() as f64 / words.len() as f64 * 200.0).min(100.0)
    };

    let lengths: Vec<f64> = split_sentences(&content)
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect();
    let sentence_variety = if lengths.is_empty() {
        0.0
    } else {
        let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
        let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
        (variance.sqrt() * 10.0).min(100.0)
    };

    let cliche_count = CLICHES.iter().filter(|c| content.contains(*c)).count();
    let variety = ((vocabulary + sentence_variety) / 2.0 - cliche_count as f64 * 5.0).clamp(0.0, 100.0);

    UniquenessIndicators {
        vocabulary_richness: round_to(vocabulary, 1),
        sentence_variety: round_to(sentence_variety, 1),
        cliche_count,
        variety_score: round_to(variety, 1),
    }
}

/// Up to five suggestions, in priority order.
pub fn improvement_suggestions(article: &Article, readability: f64, seo: f64) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();

    if readability < 60.0 {
        out.push("Simplify sentence structure - use shorter sentences");
        out.push("Break up long paragraphs into smaller chunks");
    } else if readability < 75.0 {
        out.push("Consider varying sentence length for better flow");
    }

    if seo < 70.0 {
        out.push("Review keyword placement in headings and intro");
    }

    if article.word_count < 1000 {
        out.push("Consider expanding content depth in key sections");
    } else if article.word_count > 3000 {
        out.push("Consider adding a table of contents for navigation");
    }

    let sections = article.sections.len();
    if sections < 4 {
        out.push("Add more sections to improve content depth");
    } else if sections > 10 {
        out.push("Consider consolidating some sections for focus");
    }

    if article.internal_links.len() < 3 {
        out.push("Add more internal linking opportunities");
    }
    if article.external_references.len() < 2 {
        out.push("Include more authoritative external references");
    }

    out.into_iter().take(5).map(str::to_string).collect()
}
