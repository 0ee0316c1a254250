use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::checkpoint::CheckpointPayload;
use crate::SeoforgeError;

pub const META_DESCRIPTION_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    /// Heading level, 1-3.
    pub level: u8,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub target_word_count: u32,
    #[serde(default)]
    pub keywords_to_include: Vec<String>,
}

/// Article plan produced by the outline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub meta_description: String,
    pub primary_keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    pub sections: Vec<OutlineSection>,
    pub estimated_word_count: u32,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub content_angle: String,
}

impl Outline {
    /// Bring an outline into canonical form.
    ///
    /// Truncates the meta description, removes duplicate secondary keywords
    /// (first occurrence wins), and clamps each heading level into `1..=3` and
    /// to at most one deeper than the previous section (starting from 1).
    pub fn normalize(mut self) -> Self {
        if self.meta_description.chars().count() > META_DESCRIPTION_MAX_CHARS {
            self.meta_description = self
                .meta_description
                .chars()
                .take(META_DESCRIPTION_MAX_CHARS)
                .collect();
        }

        let mut seen = HashSet::new();
        self.secondary_keywords
            .retain(|kw| seen.insert(kw.trim().to_lowercase()));

        let mut previous = 1u8;
        for section in &mut self.sections {
            let level = section.level.clamp(1, 3).min(previous + 1);
            section.level = level;
            previous = level;
        }
        self
    }

    /// Sum of section targets.
    pub fn sections_word_total(&self) -> u32 {
        self.sections.iter().map(|s| s.target_word_count).sum()
    }
}

impl CheckpointPayload for Outline {
    const KIND: &'static str = "outline";

    fn check_schema(&self) -> Result<(), SeoforgeError> {
        let fail = |message: String| SeoforgeError::Parse {
            what: "outline".into(),
            message,
        };
        if self.title.trim().is_empty() {
            return Err(fail("empty title".into()));
        }
        if self.sections.is_empty() {
            return Err(fail("no sections".into()));
        }
        if self.meta_description.chars().count() > META_DESCRIPTION_MAX_CHARS {
            return Err(fail("meta description longer than 160 characters".into()));
        }
        let mut previous = 1u8;
        for section in &self.sections {
            if !(1..=3).contains(&section.level) || section.level > previous + 1 {
                return Err(fail(format!(
                    "section '{}' has invalid level {}",
                    section.heading, section.level
                )));
            }
            previous = section.level;
        }
        Ok(())
    }
}
