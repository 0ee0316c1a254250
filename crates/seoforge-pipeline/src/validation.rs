//! SEO validation: nine structural checks over a generated article.
//!
//! Each check records issues and suggestions when it fails. The report score is
//! the share of passing checks as a percentage with one decimal, and an article
//! is valid at 70 or above.

use std::collections::{BTreeMap, HashMap};

use seoforge_types::{Article, ValidationReport};

use crate::text::{display_number, round_to};

pub const MIN_WORD_COUNT: usize = 300;
pub const MAX_WORD_COUNT: usize = 15_000;
pub const MIN_KEYWORD_DENSITY: f64 = 0.5;
pub const MAX_KEYWORD_DENSITY: f64 = 3.0;
pub const MIN_TITLE_LENGTH: usize = 30;
pub const MAX_TITLE_LENGTH: usize = 60;
pub const MIN_META_DESC_LENGTH: usize = 120;
pub const MAX_META_DESC_LENGTH: usize = 160;
pub const MIN_H2_HEADINGS: usize = 2;
pub const MIN_INTERNAL_LINKS: usize = 2;
pub const MIN_EXTERNAL_REFS: usize = 1;
pub const VALID_SCORE: f64 = 70.0;

const INTRO_WORDS: usize = 200;
const REPEATED_PHRASE_MIN: usize = 4;
const MAX_REPEATED_PHRASES: usize = 5;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Findings {
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Findings {
    fn flag(&mut self, issue: impl Into<String>, suggestion: impl Into<String>) {
        self.issues.push(issue.into());
        self.suggestions.push(suggestion.into());
    }
}

// ---------------------------------------------------------------------------
// SeoCheck trait
// ---------------------------------------------------------------------------

pub trait SeoCheck: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns whether the article passes, recording findings when it does not.
    fn apply(&self, article: &Article, findings: &mut Findings) -> bool;
}

// ---------------------------------------------------------------------------
// Built-in checks
// ---------------------------------------------------------------------------

struct WordCountCheck;
impl SeoCheck for WordCountCheck {
    fn name(&self) -> &'static str {
        "word_count_adequate"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let words = article.word_count;
        if words < MIN_WORD_COUNT {
            findings.flag(
                format!("Word count ({words}) is below minimum ({MIN_WORD_COUNT})"),
                "Add more comprehensive content to each section",
            );
            false
        } else if words > MAX_WORD_COUNT {
            findings.flag(
                format!("Word count ({words}) exceeds maximum ({MAX_WORD_COUNT})"),
                "Consider splitting into multiple articles",
            );
            false
        } else {
            true
        }
    }
}

struct TitleTagCheck;
impl SeoCheck for TitleTagCheck {
    fn name(&self) -> &'static str {
        "title_tag_optimized"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let title = &article.seo_metadata.title_tag;
        let len = title.chars().count();
        let mut valid = true;

        if len < MIN_TITLE_LENGTH {
            findings.flag(
                format!("Title tag too short ({len} chars)"),
                "Expand title to 50-60 characters",
            );
            valid = false;
        } else if len > MAX_TITLE_LENGTH {
            findings.flag(
                format!("Title tag too long ({len} chars) - may be truncated"),
                "Shorten title to under 60 characters",
            );
            valid = false;
        }

        if !contains_keyword(title, &article.keyword_analysis.primary_keyword) {
            findings.flag(
                "Primary keyword not found in title tag",
                "Include the primary keyword near the beginning of the title",
            );
            valid = false;
        }
        valid
    }
}

struct MetaDescriptionCheck;
impl SeoCheck for MetaDescriptionCheck {
    fn name(&self) -> &'static str {
        "meta_description_optimized"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let description = &article.seo_metadata.meta_description;
        let len = description.chars().count();
        let mut valid = true;

        if len < MIN_META_DESC_LENGTH {
            findings.flag(
                format!("Meta description too short ({len} chars)"),
                "Expand meta description to 150-160 characters",
            );
            valid = false;
        } else if len > MAX_META_DESC_LENGTH {
            findings.flag(
                format!("Meta description too long ({len} chars)"),
                "Shorten meta description to under 160 characters",
            );
            valid = false;
        }

        if !contains_keyword(description, &article.keyword_analysis.primary_keyword) {
            findings.flag(
                "Primary keyword not found in meta description",
                "Include the primary keyword naturally in the meta description",
            );
            valid = false;
        }
        valid
    }
}

struct KeywordDensityCheck;
impl SeoCheck for KeywordDensityCheck {
    fn name(&self) -> &'static str {
        "keyword_density_optimal"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let density = article.keyword_analysis.primary_density;
        if density < MIN_KEYWORD_DENSITY {
            findings.flag(
                format!("Keyword density ({}%) is too low", display_number(density)),
                "Increase natural usage of primary keyword throughout content",
            );
            false
        } else if density > MAX_KEYWORD_DENSITY {
            findings.flag(
                format!(
                    "Keyword density ({}%) is too high - potential keyword stuffing",
                    display_number(density)
                ),
                "Reduce keyword usage to avoid over-optimization penalty",
            );
            false
        } else {
            true
        }
    }
}

struct HeadingStructureCheck;
impl SeoCheck for HeadingStructureCheck {
    fn name(&self) -> &'static str {
        "heading_structure_valid"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let mut valid = true;

        let h2_count = article.sections.iter().filter(|s| s.level == 2).count();
        if h2_count < MIN_H2_HEADINGS {
            findings.flag(
                format!("Only {h2_count} H2 headings - need at least {MIN_H2_HEADINGS}"),
                "Add more H2 sections to improve content structure",
            );
            valid = false;
        }

        let mut last_level = 1u8;
        for section in &article.sections {
            if section.level > last_level + 1 {
                findings.flag(
                    format!(
                        "Heading hierarchy jump from H{last_level} to H{}",
                        section.level
                    ),
                    "Ensure proper heading hierarchy (H1 -> H2 -> H3)",
                );
                valid = false;
                break;
            }
            last_level = section.level;
        }
        valid
    }
}

struct KeywordInIntroCheck;
impl SeoCheck for KeywordInIntroCheck {
    fn name(&self) -> &'static str {
        "keyword_in_intro"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let intro = article
            .sections
            .first()
            .map(|s| {
                s.content
                    .to_lowercase()
                    .split_whitespace()
                    .take(INTRO_WORDS)
                    .collect::<Vec<_>>()
                    .join(" ")
            });

        match intro {
            Some(intro) if intro.contains(&article.keyword_analysis.primary_keyword.to_lowercase()) => {
                true
            }
            _ => {
                findings.flag(
                    "Primary keyword not found in first 200 words",
                    "Include the primary keyword in the introduction",
                );
                false
            }
        }
    }
}

struct InternalLinksCheck;
impl SeoCheck for InternalLinksCheck {
    fn name(&self) -> &'static str {
        "internal_links_present"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let n = article.internal_links.len();
        if n < MIN_INTERNAL_LINKS {
            findings.flag(
                format!(
                    "Only {n} internal link suggestions - recommend at least {MIN_INTERNAL_LINKS}"
                ),
                "Add more internal linking opportunities",
            );
            return false;
        }
        true
    }
}

struct ExternalRefsCheck;
impl SeoCheck for ExternalRefsCheck {
    fn name(&self) -> &'static str {
        "external_refs_present"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        if article.external_references.len() < MIN_EXTERNAL_REFS {
            findings.flag(
                "No external references - content may lack credibility signals",
                "Add citations to authoritative external sources",
            );
            return false;
        }
        true
    }
}

struct UniquenessCheck;
impl SeoCheck for UniquenessCheck {
    fn name(&self) -> &'static str {
        "content_appears_unique"
    }

    fn apply(&self, article: &Article, findings: &mut Findings) -> bool {
        let all_content = article
            .sections
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let words: Vec<&str> = all_content.split_whitespace().collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for window in words.windows(4) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
        let repetitive = counts.values().filter(|&&c| c >= REPEATED_PHRASE_MIN).count();

        if repetitive > MAX_REPEATED_PHRASES {
            findings.flag(
                "Content contains repetitive phrases",
                "Vary language and sentence structure more",
            );
            return false;
        }
        true
    }
}

fn contains_keyword(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(&keyword.to_lowercase())
}

// ---------------------------------------------------------------------------
// SeoValidator
// ---------------------------------------------------------------------------

pub struct SeoValidator {
    checks: Vec<Box<dyn SeoCheck>>,
}

impl Default for SeoValidator {
    fn default() -> Self {
        Self {
            checks: vec![
                Box::new(WordCountCheck),
                Box::new(TitleTagCheck),
                Box::new(MetaDescriptionCheck),
                Box::new(KeywordDensityCheck),
                Box::new(HeadingStructureCheck),
                Box::new(KeywordInIntroCheck),
                Box::new(InternalLinksCheck),
                Box::new(ExternalRefsCheck),
                Box::new(UniquenessCheck),
            ],
        }
    }
}

impl SeoValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, article: &Article) -> ValidationReport {
        tracing::info!(title = %article.title, "Validating article SEO");

        let mut findings = Findings::default();
        let mut checks = BTreeMap::new();
        for check in &self.checks {
            let passed = check.apply(article, &mut findings);
            checks.insert(check.name().to_string(), passed);
        }

        let passed = checks.values().filter(|ok| **ok).count();
        let score = score_for(passed, checks.len());
        let report = ValidationReport {
            is_valid: score >= VALID_SCORE,
            score,
            checks,
            issues: findings.issues,
            suggestions: findings.suggestions,
        };

        tracing::info!(
            is_valid = report.is_valid,
            score = report.score,
            issues = report.issues.len(),
            "SEO validation complete"
        );
        report
    }
}

/// Percentage of passed checks, one decimal.
pub fn score_for(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(passed as f64 / total as f64 * 100.0, 1)
}
