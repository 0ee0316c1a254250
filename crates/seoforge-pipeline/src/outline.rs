//! Article outline generation from research.
//!
//! The model is asked for a JSON outline. Output that cannot be read, or that
//! fails the outline's structural checks, is replaced by a fixed five-section
//! template scaled to the requested word count. Provider errors are not
//! recovered here; they fail the stage.

use serde::Deserialize;

use seoforge_llm::GenerationClient;
use seoforge_types::{
    ArticleRequest, CheckpointPayload, Outline, OutlineSection, ResearchResult, Result,
    SeoforgeError,
};

use crate::text::{extract_json_object, title_case};

const OUTLINE_SYSTEM_PROMPT: &str = "You are an expert SEO content strategist. Your task is to create detailed, \
SEO-optimized article outlines that will rank well in search engines while providing genuine value to readers.

Key principles:
1. Primary keyword should appear in the H1 title and naturally in H2s
2. Cover topics that competing content covers, but add unique angles
3. Structure should follow a logical flow that matches search intent
4. Include actionable, specific subsections that provide real value
5. Balance SEO optimization with readability - no keyword stuffing

Output format: Valid JSON matching the specified schema.";

const OUTLINE_MAX_TOKENS: u32 = 3000;
const OUTLINE_TEMPERATURE: f32 = 0.6;

// Shares of the target word count for the template sections, in percent.
const FALLBACK_SECTIONS: [(&str, &[&str], u32); 5] = [
    ("What is {}?", &["Definition", "Importance", "Background"], 15),
    ("Key Benefits of {}", &["Primary benefits", "Use cases", "Who it helps"], 20),
    (
        "How to Get Started with {}",
        &["Step 1", "Step 2", "Step 3", "Best practices"],
        25,
    ),
    (
        "Top {} Options to Consider",
        &["Option 1", "Option 2", "Option 3", "Comparison"],
        25,
    ),
    (
        "Conclusion: Making the Most of {}",
        &["Summary", "Key takeaways", "Next steps"],
        15,
    ),
];

#[derive(Clone)]
pub struct OutlineGenerator {
    client: GenerationClient,
}

impl OutlineGenerator {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        request: &ArticleRequest,
        research: Option<&ResearchResult>,
    ) -> Result<Outline> {
        tracing::info!(topic = %request.topic, "Generating article outline");

        let prompt = build_prompt(request, research);
        let response = self
            .client
            .generate_structured(
                &prompt,
                Some(OUTLINE_SYSTEM_PROMPT),
                Some(OUTLINE_MAX_TOKENS),
                Some(OUTLINE_TEMPERATURE),
            )
            .await?;

        let outline = match parse_outline(&response, request) {
            Ok(outline) => outline,
            Err(e) => {
                tracing::warn!(error = %e, "Unusable outline from model, using template");
                fallback_outline(request)
            }
        };

        tracing::info!(
            sections = outline.sections.len(),
            estimated_words = outline.estimated_word_count,
            "Outline generated"
        );
        Ok(outline)
    }
}

fn build_prompt(request: &ArticleRequest, research: Option<&ResearchResult>) -> String {
    let mut competitor_titles = String::from("Top-ranking article titles:\n");
    let mut themes_text = String::new();
    let mut questions_text = String::new();

    if let Some(research) = research {
        for result in research.results.iter().take(5) {
            competitor_titles.push_str(&format!("- {}\n", result.title));
        }
        if !research.common_themes.is_empty() {
            themes_text.push_str("Common themes from top-ranking content:\n");
            for theme in research.common_themes.iter().take(7) {
                themes_text.push_str(&format!(
                    "- {} (found in {} results)\n",
                    theme.theme, theme.frequency
                ));
            }
        }
        if !research.common_questions.is_empty() {
            questions_text.push_str("Common questions users ask:\n");
            for q in research.common_questions.iter().take(6) {
                questions_text.push_str(&format!("- {q}\n"));
            }
        }
    }

    format!(
        r#"Create a comprehensive SEO-optimized article outline for the topic: "{topic}"

Target word count: {words} words
Language: {language}

COMPETITIVE ANALYSIS:
{competitor_titles}

{themes_text}

{questions_text}

REQUIREMENTS:
1. Create a compelling H1 title that includes the primary keyword
2. Write a meta description (max 155 characters) that encourages clicks
3. Structure with H2 and H3 headings covering all important subtopics
4. Each section should have 2-4 key points to cover
5. Distribute target word count across sections proportionally
6. Identify primary keyword and 5-8 secondary keywords
7. Consider including an FAQ section if questions are relevant

OUTPUT FORMAT (valid JSON):
{{
    "title": "H1 title with primary keyword",
    "meta_description": "Compelling 150-155 char description",
    "primary_keyword": "main keyword",
    "secondary_keywords": ["keyword1", "keyword2", ...],
    "target_audience": "who this article is for",
    "content_angle": "unique angle/value proposition",
    "sections": [
        {{
            "heading": "Section heading",
            "level": 2,
            "key_points": ["point 1", "point 2"],
            "target_word_count": 200,
            "keywords_to_include": ["relevant", "keywords"]
        }}
    ],
    "estimated_word_count": {words}
}}

Return ONLY valid JSON, no additional text."#,
        topic = request.topic,
        words = request.target_word_count,
        language = request.language,
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawSection {
    heading: Option<String>,
    level: Option<u32>,
    #[serde(default)]
    key_points: Vec<String>,
    target_word_count: Option<u32>,
    #[serde(default)]
    keywords_to_include: Vec<String>,
}

#[derive(Deserialize)]
struct RawOutline {
    title: Option<String>,
    meta_description: Option<String>,
    primary_keyword: Option<String>,
    #[serde(default)]
    secondary_keywords: Vec<String>,
    #[serde(default)]
    sections: Vec<RawSection>,
    estimated_word_count: Option<u32>,
    target_audience: Option<String>,
    content_angle: Option<String>,
}

/// Read an outline from free-form model output, filling missing fields.
pub fn parse_outline(response: &str, request: &ArticleRequest) -> Result<Outline> {
    let parse_error = |message: String| SeoforgeError::Parse {
        what: "outline".into(),
        message,
    };
    let json = extract_json_object(response)
        .ok_or_else(|| parse_error("no JSON object in response".into()))?;
    let raw: RawOutline = serde_json::from_str(json).map_err(|e| parse_error(e.to_string()))?;

    let sections = raw
        .sections
        .into_iter()
        .map(|s| OutlineSection {
            heading: s.heading.unwrap_or_else(|| "Untitled Section".into()),
            level: s.level.unwrap_or(2).min(u8::MAX as u32) as u8,
            key_points: s.key_points,
            target_word_count: s.target_word_count.unwrap_or(200),
            keywords_to_include: s.keywords_to_include,
        })
        .collect();

    let outline = Outline {
        title: raw.title.unwrap_or_else(|| title_case(&request.topic)),
        meta_description: raw.meta_description.unwrap_or_default(),
        primary_keyword: raw
            .primary_keyword
            .unwrap_or_else(|| request.topic.clone()),
        secondary_keywords: raw.secondary_keywords,
        sections,
        estimated_word_count: raw
            .estimated_word_count
            .unwrap_or(request.target_word_count),
        target_audience: raw.target_audience.unwrap_or_default(),
        content_angle: raw.content_angle.unwrap_or_default(),
    }
    .normalize();

    outline.check_schema()?;
    Ok(outline)
}

/// Fixed five-section outline scaled to the requested word count.
pub fn fallback_outline(request: &ArticleRequest) -> Outline {
    let topic = &request.topic;
    let t = title_case(topic);
    let words = request.target_word_count;

    let sections = FALLBACK_SECTIONS
        .iter()
        .map(|(heading, points, pct)| OutlineSection {
            heading: heading.replace("{}", &t),
            level: 2,
            key_points: points.iter().map(|p| p.to_string()).collect(),
            target_word_count: words * pct / 100,
            keywords_to_include: Vec::new(),
        })
        .collect();

    Outline {
        title: format!("The Complete Guide to {t} in 2025"),
        meta_description: format!(
            "Discover everything you need to know about {topic}. Our comprehensive guide covers benefits, best practices, and top options."
        ),
        primary_keyword: topic.to_lowercase(),
        secondary_keywords: vec![
            format!("best {topic}"),
            format!("{topic} guide"),
            format!("{topic} tips"),
        ],
        sections,
        estimated_word_count: words,
        target_audience: "Professionals and enthusiasts".into(),
        content_angle: "Comprehensive guide".into(),
    }
    .normalize()
}
