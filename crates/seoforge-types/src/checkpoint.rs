//! Schema-versioned encoding of persisted stage artifacts.
//!
//! Blobs are stored as a JSON envelope:
//!
//! ```json
//! { "schema_version": 1, "kind": "research", "saved_at": "...", "data": { ... } }
//! ```
//!
//! A blob without `schema_version` is read as version 0, i.e. the bare payload
//! itself. A version newer than [`CHECKPOINT_SCHEMA_VERSION`] cannot be
//! interpreted and decodes to an error.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::SeoforgeError;

pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// A stage artifact that can be stored as a checkpoint.
pub trait CheckpointPayload: Serialize + DeserializeOwned {
    /// Kind label written into the envelope.
    const KIND: &'static str;

    /// Structural checks beyond what deserialization enforces.
    fn check_schema(&self) -> Result<(), SeoforgeError> {
        Ok(())
    }
}

/// A decoded checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<T> {
    pub schema_version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    pub data: T,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    kind: &'static str,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    kind: Option<String>,
    saved_at: Option<DateTime<Utc>>,
    data: serde_json::Value,
}

fn parse_error<T: CheckpointPayload>(message: impl Into<String>) -> SeoforgeError {
    SeoforgeError::Parse {
        what: format!("{} checkpoint", T::KIND),
        message: message.into(),
    }
}

/// Encode `data` as a current-version checkpoint blob.
pub fn encode<T: CheckpointPayload>(data: &T) -> Result<String, SeoforgeError> {
    let envelope = EnvelopeRef {
        schema_version: CHECKPOINT_SCHEMA_VERSION,
        kind: T::KIND,
        saved_at: Utc::now(),
        data,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode a checkpoint blob, accepting the current and legacy (v0) layouts.
pub fn decode<T: CheckpointPayload>(blob: &str) -> Result<Checkpoint<T>, SeoforgeError> {
    if blob.trim().is_empty() {
        return Err(parse_error::<T>("empty blob"));
    }
    let value: serde_json::Value =
        serde_json::from_str(blob).map_err(|e| parse_error::<T>(e.to_string()))?;

    let version = match value.get("schema_version") {
        None => 0,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| parse_error::<T>("schema_version is not an integer"))?,
    };

    let checkpoint = match version {
        0 => Checkpoint {
            schema_version: 0,
            saved_at: None,
            data: serde_json::from_value::<T>(value)
                .map_err(|e| parse_error::<T>(e.to_string()))?,
        },
        CHECKPOINT_SCHEMA_VERSION => {
            let envelope: Envelope =
                serde_json::from_value(value).map_err(|e| parse_error::<T>(e.to_string()))?;
            if let Some(kind) = envelope.kind.as_deref() {
                if kind != T::KIND {
                    return Err(parse_error::<T>(format!("blob holds a '{kind}' checkpoint")));
                }
            }
            Checkpoint {
                schema_version: version,
                saved_at: envelope.saved_at,
                data: serde_json::from_value::<T>(envelope.data)
                    .map_err(|e| parse_error::<T>(e.to_string()))?,
            }
        }
        newer => {
            return Err(parse_error::<T>(format!(
                "schema_version {newer} is newer than supported {CHECKPOINT_SCHEMA_VERSION}"
            )))
        }
    };

    checkpoint.data.check_schema()?;
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentIndicators, Outline, OutlineSection, ResearchResult, SerpResult};

    fn research() -> ResearchResult {
        ResearchResult {
            query: "remote work".into(),
            total_results: 1,
            results: vec![SerpResult {
                rank: 1,
                url: "https://forbes.com/remote".into(),
                title: "Remote Work Guide".into(),
                snippet: "All about remote work".into(),
                domain: Some("forbes.com".into()),
            }],
            common_themes: vec![],
            common_questions: vec!["What is remote work?".into()],
            avg_title_length: 17.0,
            content_indicators: ContentIndicators::default(),
            top_domains: vec!["forbes.com".into()],
        }
    }

    #[test]
    fn encode_writes_envelope() {
        let blob = encode(&research()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["kind"], "research");
        assert_eq!(value["data"]["query"], "remote work");
        assert!(value["saved_at"].is_string());
    }

    #[test]
    fn decode_current_version() {
        let blob = encode(&research()).unwrap();
        let cp: Checkpoint<ResearchResult> = decode(&blob).unwrap();
        assert_eq!(cp.schema_version, 1);
        assert!(cp.saved_at.is_some());
        assert_eq!(cp.data, research());
    }

    #[test]
    fn bare_payload_decodes_as_version_zero() {
        let blob = serde_json::to_string(&research()).unwrap();
        let cp: Checkpoint<ResearchResult> = decode(&blob).unwrap();
        assert_eq!(cp.schema_version, 0);
        assert!(cp.saved_at.is_none());
        assert_eq!(cp.data.query, "remote work");
    }

    #[test]
    fn newer_version_is_rejected() {
        let blob = r#"{"schema_version": 7, "kind": "research", "data": {}}"#;
        let err = decode::<ResearchResult>(blob).unwrap_err();
        assert!(matches!(err, SeoforgeError::Parse { .. }));
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let blob = encode(&research()).unwrap();
        assert!(decode::<Outline>(&blob).is_err());
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        assert!(decode::<ResearchResult>("").is_err());
        assert!(decode::<ResearchResult>("{not json").is_err());
        assert!(decode::<ResearchResult>(r#"{"schema_version": "one"}"#).is_err());
        assert!(decode::<ResearchResult>(r#"{"query": "q"}"#).is_err());
    }

    #[test]
    fn schema_check_runs_after_decode() {
        let outline = Outline {
            title: "T".into(),
            meta_description: "m".into(),
            primary_keyword: "k".into(),
            secondary_keywords: vec![],
            sections: vec![OutlineSection {
                heading: "Deep".into(),
                level: 3,
                key_points: vec![],
                target_word_count: 10,
                keywords_to_include: vec![],
            }],
            estimated_word_count: 10,
            target_audience: String::new(),
            content_angle: String::new(),
        };
        let blob = encode(&outline).unwrap();
        assert!(decode::<Outline>(&blob).is_err());
    }
}
