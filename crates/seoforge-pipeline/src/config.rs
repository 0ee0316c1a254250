//! Layered settings for the pipeline.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. A TOML file (`seoforge.toml` in the working directory, or an explicit path)
//! 3. Environment variables with the `SEOFORGE_` prefix, `__` separating sections
//!    (`SEOFORGE_LLM__PROVIDER=anthropic` sets `llm.provider`)
//!
//! Provider keys are also read from their conventional variables
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `SERPAPI_KEY`) when not set above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use seoforge_llm::{BackoffPolicy, RetryPolicy};
use seoforge_types::job::{DEFAULT_LANGUAGE, DEFAULT_WORD_COUNT};
use seoforge_types::SeoforgeError;

pub const DEFAULT_CONFIG_FILE: &str = "seoforge.toml";
pub const ENV_PREFIX: &str = "SEOFORGE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Openai,
    Anthropic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub openai_model: String,
    pub anthropic_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Openai,
            openai_model: "gpt-4-turbo-preview".into(),
            anthropic_model: "claude-3-sonnet-20240229".into(),
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    /// Without a key, research always uses the synthetic result set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serpapi_key: Option<String>,
    pub result_count: usize,
    pub timeout_secs: u64,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            result_count: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub multiplier_secs: f64,
    pub min_wait_secs: f64,
    pub max_wait_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_secs: 1.0,
            min_wait_secs: 2.0,
            max_wait_secs: 10.0,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        let secs = |s: f64| Duration::from_secs_f64(s.max(0.0));
        RetryPolicy::new(
            self.max_attempts,
            BackoffPolicy::Exponential {
                multiplier: secs(self.multiplier_secs),
                min: secs(self.min_wait_secs),
                max: secs(self.max_wait_secs),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub research: ResearchSettings,
    pub retry: RetrySettings,
    /// Directory holding one JSON document per job.
    pub data_dir: PathBuf,
    pub default_word_count: u32,
    pub default_language: String,
    pub event_capacity: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            research: ResearchSettings::default(),
            retry: RetrySettings::default(),
            data_dir: PathBuf::from(".seoforge/jobs"),
            default_word_count: DEFAULT_WORD_COUNT,
            default_language: DEFAULT_LANGUAGE.into(),
            event_capacity: 256,
            log_level: "info".into(),
        }
    }
}

impl Settings {
    /// Load from defaults, `seoforge.toml` if present, and the environment.
    pub fn load() -> Result<Self, SeoforgeError> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load), reading `path` instead of the default file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SeoforgeError> {
        let mut settings: Settings = Self::figment(path)
            .extract()
            .map_err(|e| SeoforgeError::Config(e.to_string()))?;
        settings.fill_provider_keys(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Build the provider chain. Public so callers can layer more providers.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(p) => figment = figment.merge(Toml::file(p)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn fill_provider_keys(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.llm.openai_api_key.is_none() {
            self.llm.openai_api_key = non_empty("OPENAI_API_KEY");
        }
        if self.llm.anthropic_api_key.is_none() {
            self.llm.anthropic_api_key = non_empty("ANTHROPIC_API_KEY");
        }
        if self.research.serpapi_key.is_none() {
            self.research.serpapi_key = non_empty("SERPAPI_KEY");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.llm.provider, LlmProviderKind::Openai);
        assert_eq!(s.llm.openai_model, "gpt-4-turbo-preview");
        assert_eq!(s.default_word_count, 1500);
        assert_eq!(s.default_language, "en");
        assert_eq!(s.research.result_count, 10);
        assert_eq!(s.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn figment_builds_without_files() {
        Jail::expect_with(|_jail| {
            let settings: Settings = Settings::figment(None).extract()?;
            assert_eq!(settings.event_capacity, 256);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "seoforge.toml",
                r#"
                data_dir = "/tmp/jobs"
                default_word_count = 2000

                [llm]
                provider = "anthropic"

                [retry]
                max_attempts = 5
                "#,
            )?;
            let settings: Settings = Settings::figment(None).extract()?;
            assert_eq!(settings.llm.provider, LlmProviderKind::Anthropic);
            assert_eq!(settings.data_dir, PathBuf::from("/tmp/jobs"));
            assert_eq!(settings.default_word_count, 2000);
            assert_eq!(settings.retry.max_attempts, 5);
            assert_eq!(settings.retry.min_wait_secs, 2.0);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("seoforge.toml", "[llm]\nprovider = \"anthropic\"\n")?;
            jail.set_env("SEOFORGE_LLM__PROVIDER", "openai");
            jail.set_env("SEOFORGE_RESEARCH__RESULT_COUNT", "5");
            let settings: Settings = Settings::figment(None).extract()?;
            assert_eq!(settings.llm.provider, LlmProviderKind::Openai);
            assert_eq!(settings.research.result_count, 5);
            Ok(())
        });
    }

    #[test]
    fn provider_keys_fill_only_missing_values() {
        let mut settings = Settings::default();
        settings.llm.openai_api_key = Some("from-config".into());
        settings.fill_provider_keys(|name| match name {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "ANTHROPIC_API_KEY" => Some("sk-ant".into()),
            "SERPAPI_KEY" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(settings.llm.openai_api_key.as_deref(), Some("from-config"));
        assert_eq!(settings.llm.anthropic_api_key.as_deref(), Some("sk-ant"));
        assert!(settings.research.serpapi_key.is_none());
    }

    #[test]
    fn retry_settings_convert_to_policy() {
        let retry = RetrySettings {
            max_attempts: 4,
            multiplier_secs: 0.5,
            min_wait_secs: 1.0,
            max_wait_secs: 3.0,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.backoff.delay_for_retry(3), Duration::from_secs(3));
    }
}
