//! Search-result research: a live SerpAPI provider plus a deterministic
//! synthetic fallback used when no key is configured or the provider fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use seoforge_llm::transport_error;
use seoforge_types::{ProviderError, ProviderErrorKind, ResearchResult, SerpResult};

use crate::text::title_case;

// ---------------------------------------------------------------------------
// ResearchProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Fetch up to `count` ranked results for `topic`.
    async fn fetch(&self, topic: &str, count: usize) -> Result<ResearchResult, ProviderError>;
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// SerpApiProvider
// ---------------------------------------------------------------------------

const SERPAPI: &str = "serpapi";

pub struct SerpApiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl SerpApiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://serpapi.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn extract_domain(link: &str) -> Option<String> {
    let url = reqwest::Url::parse(link).ok()?;
    url.host_str().map(|h| h.replace("www.", ""))
}

/// Translate a SerpAPI response body.
fn parse_serpapi(query: &str, count: usize, body: &serde_json::Value) -> ResearchResult {
    let results: Vec<SerpResult> = body["organic_results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(count)
                .enumerate()
                .map(|(idx, item)| {
                    let link = item["link"].as_str().unwrap_or("").to_string();
                    SerpResult {
                        rank: idx as u32 + 1,
                        domain: extract_domain(&link),
                        url: link,
                        title: item["title"].as_str().unwrap_or("").to_string(),
                        snippet: item["snippet"].as_str().unwrap_or("").to_string(),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let common_questions = body["related_questions"]
        .as_array()
        .map(|qs| {
            qs.iter()
                .filter_map(|q| q["question"].as_str())
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let top_domains = results
        .iter()
        .filter_map(|r| r.domain.clone())
        .filter(|d| seen.insert(d.clone()))
        .take(5)
        .collect();

    ResearchResult {
        query: query.to_string(),
        total_results: results.len() as u32,
        avg_title_length: average_title_length(&results),
        results,
        common_themes: Vec::new(),
        common_questions,
        content_indicators: Default::default(),
        top_domains,
    }
}

fn average_title_length(results: &[SerpResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: usize = results.iter().map(|r| r.title.chars().count()).sum();
    total as f64 / results.len() as f64
}

#[async_trait]
impl ResearchProvider for SerpApiProvider {
    async fn fetch(&self, topic: &str, count: usize) -> Result<ResearchResult, ProviderError> {
        let num = count.to_string();
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", topic),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("engine", "google"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(SERPAPI, &e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(SERPAPI, &e))?;
        if !status.is_success() {
            return Err(ProviderError::new(
                SERPAPI,
                ProviderErrorKind::from_http_status(status.as_u16()),
                body,
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::new(
                SERPAPI,
                ProviderErrorKind::Unknown,
                format!("Failed to parse response JSON: {e}"),
            )
        })?;
        Ok(parse_serpapi(topic, count, &json))
    }

    fn name(&self) -> &str {
        SERPAPI
    }
}

// ---------------------------------------------------------------------------
// Synthetic research
// ---------------------------------------------------------------------------

const DOMAINS: [&str; 15] = [
    "forbes.com",
    "hubspot.com",
    "techcrunch.com",
    "medium.com",
    "entrepreneur.com",
    "inc.com",
    "businessinsider.com",
    "wired.com",
    "zdnet.com",
    "cnet.com",
    "pcmag.com",
    "techradar.com",
    "nytimes.com",
    "theguardian.com",
    "bbc.com",
];

/// Deterministic, realistic-looking results seeded by the MD5 of the topic.
pub struct SyntheticResearch;

impl SyntheticResearch {
    fn seed(topic: &str) -> u64 {
        let digest = format!("{:x}", md5::compute(topic.as_bytes()));
        u64::from_str_radix(&digest[..8], 16).unwrap_or(0)
    }

    pub fn generate(topic: &str, count: usize) -> ResearchResult {
        let mut rng = StdRng::seed_from_u64(Self::seed(topic));
        let t = title_case(topic);

        let mut domains = DOMAINS.to_vec();
        let mut titles = vec![
            format!("The Ultimate Guide to {t} in 2025"),
            format!("15 Best {t} [Updated 2025]"),
            format!("How to Choose the Right {t} for Your Business"),
            format!("{t}: Everything You Need to Know"),
            format!("Top 10 {t} Compared & Reviewed"),
            format!("Why {t} Matters More Than Ever"),
            format!("A Complete Breakdown of {t}"),
            format!("Expert Tips for {t} Success"),
            format!("The Definitive {t} Handbook"),
            format!("{t}: Trends and Best Practices"),
            format!("What Makes Great {t}? An In-Depth Analysis"),
            format!("Mastering {t}: A Step-by-Step Guide"),
        ];
        let mut snippets = vec![
            format!("Discover the best strategies for {topic}. Our comprehensive guide covers everything from basics to advanced techniques..."),
            format!("Looking for {topic}? We've tested and reviewed the top options to help you make an informed decision..."),
            format!("Learn how industry leaders are leveraging {topic} to drive results. This guide breaks down the key factors..."),
            format!("In this article, we explore {topic} and provide actionable insights you can implement today..."),
            format!("Our experts have analyzed {topic} trends to bring you the most up-to-date recommendations..."),
            format!("Whether you're new to {topic} or looking to optimize, this resource has everything you need..."),
            format!("Get the complete picture on {topic} with real-world examples and expert analysis..."),
            format!("This comprehensive resource on {topic} will help you understand the landscape and make better choices..."),
        ];
        let mut questions = vec![
            format!("What is the best {topic}?"),
            format!("How do I choose {topic}?"),
            format!("What are the benefits of {topic}?"),
            format!("How much does {topic} cost?"),
            format!("Is {topic} worth it?"),
            format!("What are the top {topic} in 2025?"),
            format!("How do {topic} compare?"),
            format!("What should I look for in {topic}?"),
        ];

        domains.shuffle(&mut rng);
        titles.shuffle(&mut rng);
        snippets.shuffle(&mut rng);
        questions.shuffle(&mut rng);

        let slug: String = topic.to_lowercase().replace(' ', "-").chars().take(30).collect();
        let results: Vec<SerpResult> = (0..count.min(titles.len()))
            .map(|i| {
                let domain = domains[i % domains.len()];
                SerpResult {
                    rank: i as u32 + 1,
                    url: format!("https://{domain}/{slug}-guide-{}", 2025 - (i % 2)),
                    title: titles[i].clone(),
                    snippet: snippets[i % snippets.len()].clone(),
                    domain: Some(domain.to_string()),
                }
            })
            .collect();

        questions.truncate(6);
        ResearchResult {
            query: topic.to_string(),
            total_results: count as u32,
            avg_title_length: average_title_length(&results),
            top_domains: results.iter().take(5).filter_map(|r| r.domain.clone()).collect(),
            results,
            common_themes: Vec::new(),
            common_questions: questions,
            content_indicators: Default::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResearchService
// ---------------------------------------------------------------------------

/// Research entry point used by the orchestrator. Never fails: provider
/// errors and malformed provider output fall back to [`SyntheticResearch`].
#[derive(Clone, Default)]
pub struct ResearchService {
    provider: Option<Arc<dyn ResearchProvider>>,
}

impl ResearchService {
    /// Synthetic results only.
    pub fn synthetic() -> Self {
        Self { provider: None }
    }

    pub fn with_provider(provider: Arc<dyn ResearchProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub async fn fetch(&self, topic: &str, count: usize) -> ResearchResult {
        let Some(provider) = &self.provider else {
            tracing::info!(query = topic, "Using synthetic research data");
            return SyntheticResearch::generate(topic, count);
        };

        match provider.fetch(topic, count).await {
            Ok(result) => match result.check_ranks() {
                Ok(()) => result,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Malformed research result, using synthetic data");
                    SyntheticResearch::generate(topic, count)
                }
            },
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Research request failed, using synthetic data");
                SyntheticResearch::generate(topic, count)
            }
        }
    }
}
