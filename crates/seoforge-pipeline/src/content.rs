//! Article body generation and the keyword/metadata analysis built on it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use seoforge_llm::GenerationClient;
use seoforge_types::{
    count_words, Article, ArticleSection, ExternalReference, FaqItem, KeywordAnalysis,
    LinkSuggestion, Outline, ResearchResult, ResearchSummary, Result, SeoMetadata, SeoforgeError,
};

use crate::text::{extract_json_array, round_to, tail_chars, truncate_chars};

static LSI_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]{4,}\b").expect("valid LSI word pattern"));

const CONTENT_SYSTEM_PROMPT: &str = "You are an expert content writer specializing in SEO-optimized articles.
Your writing should be:
1. Engaging and human-like - NOT robotic or repetitive
2. Well-structured with clear transitions
3. Naturally incorporating keywords without stuffing
4. Providing genuine value and actionable insights
5. Using varied sentence structure and vocabulary

Write like a knowledgeable industry expert sharing insights, not a content mill bot.
Each section should flow naturally into the next.";

const SECTION_TEMPERATURE: f32 = 0.75;
const PREVIOUS_CONTEXT_CHARS: usize = 200;
const FAQ_QUESTIONS: usize = 5;
const MAX_INTERNAL_LINKS: usize = 5;
const MAX_EXTERNAL_REFS: usize = 4;
const TITLE_TAG_CHARS: usize = 60;

#[derive(Clone)]
pub struct ContentGenerator {
    client: GenerationClient,
}

impl ContentGenerator {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    /// Write every section in order, then the optional extras.
    ///
    /// A failed section fails the whole generation. FAQ, link and reference
    /// suggestions are best effort and come back empty on any error.
    pub async fn generate(
        &self,
        outline: &Outline,
        research: Option<&ResearchResult>,
    ) -> Result<Article> {
        tracing::info!(title = %outline.title, sections = outline.sections.len(), "Generating article content");

        let sections = self.generate_sections(outline).await?;

        let faq = match research {
            Some(r) if !r.common_questions.is_empty() => {
                let questions: Vec<&str> = r
                    .common_questions
                    .iter()
                    .take(FAQ_QUESTIONS)
                    .map(String::as_str)
                    .collect();
                self.generate_faq(&questions, &outline.primary_keyword).await
            }
            _ => Vec::new(),
        };
        let internal_links = self.generate_internal_links(outline, &sections).await;
        let external_references = self.generate_external_references(outline).await;

        let full_content = compile_markdown(&outline.title, &sections, &faq);
        let word_count = count_words(&full_content);
        let keyword_analysis = analyze_keywords(
            &full_content,
            &outline.primary_keyword,
            &outline.secondary_keywords,
        );

        let title_tag = truncate_chars(&outline.title, TITLE_TAG_CHARS);
        let seo_metadata = SeoMetadata {
            title_tag: title_tag.clone(),
            meta_description: outline.meta_description.clone(),
            og_title: title_tag,
            og_description: outline.meta_description.clone(),
            focus_keyword: outline.primary_keyword.clone(),
            secondary_keywords: outline.secondary_keywords.clone(),
        };

        let research_summary = research.map(|r| ResearchSummary {
            query: r.query.clone(),
            results_analyzed: r.results.len(),
            top_themes: r.common_themes.iter().take(5).map(|t| t.theme.clone()).collect(),
            questions_found: r.common_questions.len(),
        });

        Ok(Article {
            title: outline.title.clone(),
            sections,
            full_content,
            word_count,
            seo_metadata,
            keyword_analysis,
            internal_links,
            external_references,
            faq,
            validation: None,
            quality: None,
            generation_time_seconds: 0.0,
            research_summary,
        })
    }

    async fn generate_sections(&self, outline: &Outline) -> Result<Vec<ArticleSection>> {
        let mut sections: Vec<ArticleSection> = Vec::with_capacity(outline.sections.len());

        for (idx, plan) in outline.sections.iter().enumerate() {
            tracing::debug!(section = %plan.heading, "Generating section");

            let previous = sections
                .last()
                .map(|s| {
                    format!(
                        "Previous section ended with: ...{}",
                        tail_chars(&s.content, PREVIOUS_CONTEXT_CHARS)
                    )
                })
                .unwrap_or_default();
            let opening = if idx == 0 {
                "Start with an engaging introduction that hooks the reader"
            } else {
                "Transition smoothly from the previous section"
            };

            let prompt = format!(
                "Write the content for this article section.

Article title: {title}
Primary keyword: {keyword}
Target audience: {audience}

SECTION TO WRITE:
Heading (H{level}): {heading}
Target word count: {words} words
Key points to cover: {points}
Keywords to include naturally: {keywords}

{previous}

GUIDELINES:
- Write engaging, human-sounding content
- Naturally incorporate the specified keywords
- Cover all key points with specific, actionable information
- Use varied sentence structure
- Include specific examples or data where relevant
- {opening}
- Do NOT include the heading itself, only the body content

Write approximately {words} words of body content:",
                title = outline.title,
                keyword = outline.primary_keyword,
                audience = outline.target_audience,
                level = plan.level,
                heading = plan.heading,
                words = plan.target_word_count,
                points = plan.key_points.join(", "),
                keywords = plan.keywords_to_include.join(", "),
            );

            let content = self
                .client
                .generate(
                    &prompt,
                    Some(CONTENT_SYSTEM_PROMPT),
                    Some(plan.target_word_count.saturating_mul(2).max(1)),
                    Some(SECTION_TEMPERATURE),
                )
                .await?;

            sections.push(ArticleSection::new(
                plan.heading.clone(),
                plan.level,
                content.trim(),
            ));
        }

        Ok(sections)
    }

    async fn generate_faq(&self, questions: &[&str], primary_keyword: &str) -> Vec<FaqItem> {
        if questions.is_empty() {
            return Vec::new();
        }
        let numbered = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {q}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            r#"Create helpful, informative FAQ answers for these questions about {primary_keyword}.

Questions:
{numbered}

For each question, provide a clear, concise answer (2-4 sentences).
Format as JSON array:
[
    {{"question": "...", "answer": "..."}},
    ...
]

Return only the JSON array:"#
        );
        self.structured_list("FAQ", &prompt, 1500, 0.5, usize::MAX).await
    }

    async fn generate_internal_links(
        &self,
        outline: &Outline,
        sections: &[ArticleSection],
    ) -> Vec<LinkSuggestion> {
        let headings = sections
            .iter()
            .map(|s| format!("- {}", s.heading))
            .collect::<Vec<_>>()
            .join("\n");
        let secondary = outline
            .secondary_keywords
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            r#"Based on this article about "{title}", suggest 3-5 internal linking opportunities.

Article sections:
{headings}

Primary topic: {keyword}
Secondary topics: {secondary}

For each suggestion, provide:
1. Anchor text (the clickable text)
2. Target page topic (what the linked page should be about)
3. Context (which section this link belongs in)
4. Relevance score (0-1)

Format as JSON array:
[
    {{
        "anchor_text": "text to link",
        "suggested_target_topic": "topic of target page",
        "context": "which section to place it",
        "relevance_score": 0.8
    }}
]

Return only the JSON array:"#,
            title = outline.title,
            keyword = outline.primary_keyword,
        );
        self.structured_list("internal links", &prompt, 1000, 0.4, MAX_INTERNAL_LINKS)
            .await
    }

    async fn generate_external_references(&self, outline: &Outline) -> Vec<ExternalReference> {
        let prompt = format!(
            r#"Suggest 2-4 authoritative external sources to reference in an article about "{title}".

Primary topic: {keyword}

For each source, specify:
1. Source name (e.g., "Gartner Research", "Harvard Business Review")
2. Source type (industry report, academic study, news article, official documentation)
3. What to cite from them
4. Where in the article to place the citation
5. Why this source adds credibility

Format as JSON array:
[
    {{
        "source_name": "Name of Source",
        "source_type": "industry report",
        "url": null,
        "citation_context": "Cite when discussing [specific point]",
        "credibility_reason": "Why this source is authoritative"
    }}
]

Return only the JSON array:"#,
            title = outline.title,
            keyword = outline.primary_keyword,
        );
        self.structured_list("external references", &prompt, 800, 0.4, MAX_EXTERNAL_REFS)
            .await
    }

    async fn structured_list<T: DeserializeOwned>(
        &self,
        what: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        limit: usize,
    ) -> Vec<T> {
        let result = async {
            let response = self
                .client
                .generate_structured(prompt, None, Some(max_tokens), Some(temperature))
                .await?;
            parse_list::<T>(what, &response)
        }
        .await;

        match result {
            Ok(mut items) => {
                items.truncate(limit);
                items
            }
            Err(e) => {
                tracing::warn!(what, error = %e, "Skipping optional article extra");
                Vec::new()
            }
        }
    }
}

/// Parse the first JSON array in `response` as a list of `T`.
pub fn parse_list<T: DeserializeOwned>(what: &str, response: &str) -> Result<Vec<T>> {
    let parse_error = |message: String| SeoforgeError::Parse {
        what: what.to_string(),
        message,
    };
    let json = extract_json_array(response)
        .ok_or_else(|| parse_error("no JSON array in response".into()))?;
    serde_json::from_str(json).map_err(|e| parse_error(e.to_string()))
}

/// Render the article as markdown: H1 title, one heading per section at
/// `level + 1` hashes, then the FAQ block.
pub fn compile_markdown(title: &str, sections: &[ArticleSection], faq: &[FaqItem]) -> String {
    let mut parts = vec![format!("# {title}\n")];
    for section in sections {
        let hashes = "#".repeat(section.level as usize + 1);
        parts.push(format!("\n{hashes} {}\n", section.heading));
        parts.push(section.content.clone());
    }
    if !faq.is_empty() {
        parts.push("\n## Frequently Asked Questions\n".to_string());
        for item in faq {
            parts.push(format!("\n### {}\n", item.question));
            parts.push(item.answer.clone());
        }
    }
    parts.join("\n")
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Keyword counts, primary density and LSI candidates for `content`.
pub fn analyze_keywords(content: &str, primary: &str, secondary: &[String]) -> KeywordAnalysis {
    let lower = content.to_lowercase();
    let words = count_words(content);

    let primary_count = count_occurrences(&lower, &primary.to_lowercase());
    let density = if words > 0 {
        primary_count as f64 / words as f64 * 100.0
    } else {
        0.0
    };

    let secondary_counts: BTreeMap<String, usize> = secondary
        .iter()
        .filter_map(|kw| {
            let n = count_occurrences(&lower, &kw.to_lowercase());
            (n > 0).then(|| (kw.clone(), n))
        })
        .collect();

    KeywordAnalysis {
        primary_keyword: primary.to_string(),
        primary_count,
        primary_density: round_to(density, 2),
        secondary_counts,
        lsi_keywords: extract_lsi_keywords(&lower, primary),
    }
}

/// Up to ten frequent 4+ letter words outside the primary keyword, seen at least 3 times.
fn extract_lsi_keywords(lower_content: &str, primary: &str) -> Vec<String> {
    let primary_lower = primary.to_lowercase();
    let excluded: HashSet<&str> = primary_lower.split_whitespace().collect();

    let mut freq: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for m in LSI_WORD.find_iter(lower_content) {
        let w = m.as_str();
        if excluded.contains(w) {
            continue;
        }
        let count = freq.entry(w).or_insert(0);
        if *count == 0 {
            order.push(w);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| freq[b].cmp(&freq[a]));
    order
        .into_iter()
        .take(10)
        .filter(|w| freq[w] >= 3)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::fallback_outline;
    use crate::research::SyntheticResearch;
    use crate::testing::ScriptedLlm;
    use seoforge_types::{ArticleRequest, ProviderError, ProviderErrorKind};
    use std::sync::atomic::Ordering;

    fn section(heading: &str, level: u8, content: &str) -> ArticleSection {
        ArticleSection::new(heading, level, content)
    }

    #[test]
    fn markdown_layout() {
        let md = compile_markdown(
            "Title",
            &[section("Intro", 2, "Body one."), section("Detail", 3, "Body two.")],
            &[FaqItem {
                question: "Why?".into(),
                answer: "Because.".into(),
            }],
        );
        assert_eq!(
            md,
            "# Title\n\n\n### Intro\n\nBody one.\n\n#### Detail\n\nBody two.\n\n## Frequently Asked Questions\n\n\n### Why?\n\nBecause."
        );
    }

    #[test]
    fn keyword_counts_and_density() {
        let content = "Remote tools help. remote tools scale. Teams love remote TOOLS and async work.";
        let analysis = analyze_keywords(
            content,
            "remote tools",
            &["async".to_string(), "video".to_string()],
        );
        assert_eq!(analysis.primary_count, 3);
        // 3 occurrences over 13 words.
        assert_eq!(analysis.primary_density, 23.08);
        assert_eq!(analysis.secondary_counts.get("async"), Some(&1));
        assert!(!analysis.secondary_counts.contains_key("video"));
    }

    #[test]
    fn lsi_keywords_need_three_mentions() {
        let content = "teams teams teams async async async async rust remote remote remote";
        let analysis = analyze_keywords(content, "remote work", &[]);
        assert_eq!(analysis.lsi_keywords, vec!["async", "teams"]);
    }

    #[test]
    fn empty_primary_keyword_counts_zero() {
        let analysis = analyze_keywords("some words here", "", &[]);
        assert_eq!(analysis.primary_count, 0);
        assert_eq!(analysis.primary_density, 0.0);
    }

    #[test]
    fn parse_list_accepts_prose_and_aliases() {
        let links: Vec<LinkSuggestion> = parse_list(
            "links",
            r#"Here: [{"anchor_text": "a", "suggested_target_topic": "t", "context": "intro"}]"#,
        )
        .unwrap();
        assert_eq!(links[0].target_topic, "t");
        assert_eq!(links[0].relevance_score, 0.7);
        assert!(parse_list::<FaqItem>("faq", "nothing").is_err());
    }

    fn scripted_answer(prompt: &str) -> String {
        if prompt.starts_with("Create helpful, informative FAQ") {
            r#"[{"question": "Q1?", "answer": "A1."}]"#.into()
        } else if prompt.starts_with("Based on this article") {
            let links: Vec<String> = (0..7)
                .map(|i| format!(r#"{{"anchor_text": "a{i}", "suggested_target_topic": "t{i}", "context": "c"}}"#))
                .collect();
            format!("[{}]", links.join(","))
        } else if prompt.starts_with("Suggest 2-4 authoritative") {
            "not json".into()
        } else {
            "  Body text about productivity tools.  ".into()
        }
    }

    #[tokio::test]
    async fn generates_full_article() {
        let (client, calls, requests) =
            ScriptedLlm::new(|req| Ok(scripted_answer(&req.prompt))).into_client();
        let generator = ContentGenerator::new(client);
        let request = ArticleRequest::new("productivity tools");
        let outline = fallback_outline(&request);
        let research = SyntheticResearch::generate("productivity tools", 10);

        let article = generator.generate(&outline, Some(&research)).await.unwrap();

        // 5 sections + FAQ + links + references
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert_eq!(article.sections.len(), 5);
        assert_eq!(article.sections[0].content, "Body text about productivity tools.");
        assert_eq!(article.faq.len(), 1);
        assert_eq!(article.internal_links.len(), 5);
        assert!(article.external_references.is_empty());
        assert_eq!(article.word_count, count_words(&article.full_content));
        assert!(article.full_content.starts_with(&format!("# {}\n", outline.title)));
        assert_eq!(article.seo_metadata.title_tag, "The Complete Guide to Productivity Tools in 2025");
        let summary = article.research_summary.unwrap();
        assert_eq!(summary.results_analyzed, 10);
        assert_eq!(summary.questions_found, 6);

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, outline.sections[0].target_word_count * 2);
        assert!(requests[0].prompt.contains("engaging introduction"));
        assert!(requests[1].prompt.contains("Previous section ended with: ...Body text"));
    }

    #[tokio::test]
    async fn section_failure_fails_generation() {
        let (client, _, _) = ScriptedLlm::new(|_| {
            Err(ProviderError::new("scripted", ProviderErrorKind::NotFound, "model not found"))
        })
        .into_client();
        let outline = fallback_outline(&ArticleRequest::new("productivity tools"));
        let result = ContentGenerator::new(client).generate(&outline, None).await;
        assert!(matches!(result, Err(SeoforgeError::TerminalProvider(_))));
    }

    #[tokio::test]
    async fn no_research_means_no_faq_or_summary() {
        let (client, calls, _) =
            ScriptedLlm::new(|req| Ok(scripted_answer(&req.prompt))).into_client();
        let outline = fallback_outline(&ArticleRequest::new("productivity tools"));
        let article = ContentGenerator::new(client).generate(&outline, None).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert!(article.faq.is_empty());
        assert!(article.research_summary.is_none());
    }
}
