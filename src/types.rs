//! Core types used throughout Parlo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for situations
pub type SituationId = Uuid;

/// Unique identifier for corrections
pub type CorrectionId = Uuid;

/// Audio data as raw bytes (16-bit PCM)
pub type AudioData = Vec<u8>;

/// Today's date as an ISO `YYYY-MM-DD` string, the format used in review histories
pub fn today_iso_date() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// How a situation was recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SituationKind {
    /// A single spoken or typed utterance
    #[default]
    Speech,
    /// A back-and-forth conversation session
    Conversation,
}

/// A recorded context that groups corrections
///
/// Created once per recording/analysis session and never mutated afterward
/// except for the derived counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Situation {
    pub id: SituationId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SituationKind,
    pub description: Option<String>,
    /// Review dates as ISO `YYYY-MM-DD` strings
    pub datelist: Vec<String>,
    /// Number of recorded review dates
    pub numdate: u32,
    /// Accumulated review passes across the situation's corrections
    pub studyrate: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a situation; ids, counters, and timestamps are
/// generated by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SituationKind,
    pub description: Option<String>,
    pub datelist: Vec<String>,
}

impl SituationDraft {
    pub fn new(title: impl Into<String>, kind: SituationKind) -> Self {
        Self {
            title: title.into(),
            kind,
            description: None,
            datelist: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.datelist.push(date.into());
        self
    }
}

/// One sentence-level fix with its explanation
///
/// Created in batch from a parsed analysis; mutated only by the review
/// cycle, which appends a date and raises the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: CorrectionId,
    /// Owning situation; weak reference, lookup only
    pub situation_id: SituationId,
    /// Semantic gloss of the sentence
    pub title: String,
    /// Original sentence, corrected span wrapped in `%%`
    pub before_sentence: String,
    /// Explanation of what the speaker meant
    pub before_intention: String,
    /// Corrected sentence, changed span wrapped in `%%`
    pub after_sentence: String,
    /// Slash-delimited rationale list
    pub after_detail: String,
    pub meaning: Option<String>,
    pub grammar: Option<String>,
    pub expression: Option<String>,
    /// Review history as ISO `YYYY-MM-DD` strings
    pub datelist: Vec<String>,
    /// Non-negative, non-decreasing review score
    pub score: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a correction; the store stamps the owning situation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionDraft {
    pub title: String,
    pub before_sentence: String,
    pub before_intention: String,
    pub after_sentence: String,
    pub after_detail: String,
    pub meaning: Option<String>,
    pub grammar: Option<String>,
    pub expression: Option<String>,
    pub datelist: Vec<String>,
    pub score: u32,
}

impl CorrectionDraft {
    /// Check the record invariants before persisting
    ///
    /// Required text fields must be non-empty, each sentence may carry at
    /// most one marked span, and the rationale list must contain at least
    /// one non-empty entry.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        for (field, value) in [
            ("title", &self.title),
            ("before_sentence", &self.before_sentence),
            ("after_sentence", &self.after_sentence),
            ("after_detail", &self.after_detail),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
        }

        for (field, sentence) in [
            ("before_sentence", &self.before_sentence),
            ("after_sentence", &self.after_sentence),
        ] {
            if crate::markup::marked_span_count(sentence) > 1 {
                return Err(Error::Validation(format!(
                    "{field} carries more than one marked span"
                )));
            }
        }

        if rationale_entries(&self.after_detail).next().is_none() {
            return Err(Error::Validation(
                "after_detail has no rationale entries".to_string(),
            ));
        }

        Ok(())
    }
}

/// Non-empty trimmed segments of a slash-delimited rationale list
pub fn rationale_entries(after_detail: &str) -> impl Iterator<Item = &str> {
    after_detail
        .split('/')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

/// Situation metadata as resolved through the review listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationRef {
    pub id: SituationId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SituationKind,
}

/// A correction joined with its view-derived answer fields and situation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionWithContext {
    pub id: CorrectionId,
    pub title: String,
    pub before_sentence: String,
    pub before_intention: String,
    pub after_sentence: String,
    pub after_detail: String,
    pub datelist: Vec<String>,
    pub score: u32,
    /// First rationale entry, precomputed by the listing
    pub answer_first: Option<String>,
    /// Full back-face text with `<Before>`/`<After>` section tags
    pub answer_full: Option<String>,
    /// At most one situation resolves per correction; a structurally
    /// one-to-many join yields the most recent match
    #[serde(
        rename = "situations",
        default,
        deserialize_with = "deserialize_situation_ref"
    )]
    pub situation: Option<SituationRef>,
}

/// Accept the joined situation as a single object, an embedded array
/// (first entry wins), or null
fn deserialize_situation_ref<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SituationRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Embedded {
        One(SituationRef),
        Many(Vec<SituationRef>),
    }

    Ok(match Option::<Embedded>::deserialize(deserializer)? {
        Some(Embedded::One(situation)) => Some(situation),
        Some(Embedded::Many(situations)) => situations.into_iter().next(),
        None => None,
    })
}
