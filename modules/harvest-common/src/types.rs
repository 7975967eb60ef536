use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

// --- Topics ---

/// The three research modes the harvester tracks. The discriminant is the
/// topic code written to the label artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Interdisciplinary = 0,
    Transdisciplinary = 1,
    Multidisciplinary = 2,
}

impl TopicKind {
    pub const ALL: [TopicKind; 3] = [
        TopicKind::Interdisciplinary,
        TopicKind::Transdisciplinary,
        TopicKind::Multidisciplinary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interdisciplinary => "interdisciplinary",
            Self::Transdisciplinary => "transdisciplinary",
            Self::Multidisciplinary => "multidisciplinary",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Map a stored topic tag to its kind. Unknown tags are a data-integrity
    /// fault, never a default.
    pub fn from_tag(tag: &str) -> Result<Self, HarvestError> {
        match tag {
            "interdisciplinary" => Ok(Self::Interdisciplinary),
            "transdisciplinary" => Ok(Self::Transdisciplinary),
            "multidisciplinary" => Ok(Self::Multidisciplinary),
            other => Err(HarvestError::UnknownTopic(other.to_string())),
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named topic and the static search query used to collect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub query: String,
}

impl Topic {
    /// Build a topic whose query is the OR of the keyword, its hashtag, and
    /// the "-arity" noun form with its hashtag.
    pub fn from_name(name: &str) -> Self {
        let query = match name.strip_suffix("ary") {
            Some(stem) if !stem.is_empty() => {
                format!("{name} OR #{name} OR {stem}arity OR #{stem}arity")
            }
            _ => format!("{name} OR #{name}"),
        };
        Self {
            name: name.to_string(),
            query,
        }
    }

    pub fn builtin() -> Vec<Topic> {
        TopicKind::ALL
            .iter()
            .map(|kind| Topic::from_name(kind.as_str()))
            .collect()
    }
}

// --- Sentiment labels ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative = 0,
    Neutral = 1,
    Positive = 2,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Translate a human-readable category ("Positive", " neutral ") to a label.
    pub fn from_name(name: &str) -> Result<Self, HarvestError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            _ => Err(HarvestError::UnknownLabel(name.to_string())),
        }
    }

    pub fn from_code(code: i64) -> Result<Self, HarvestError> {
        match code {
            0 => Ok(Self::Negative),
            1 => Ok(Self::Neutral),
            2 => Ok(Self::Positive),
            other => Err(HarvestError::UnknownLabelCode(other)),
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resolved label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Manual,
    Predicted,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Predicted => "predicted",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "predicted" => Some(Self::Predicted),
            _ => None,
        }
    }
}

// --- Corpus records ---

/// A post in the target corpus, as held by the document store.
///
/// `topic` is kept as the raw stored tag so that an unknown tag surfaces as a
/// mapping fault during the merge instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: u64,
    pub text: String,
    pub topic: String,
    #[serde(default)]
    pub manual_label: Option<SentimentLabel>,
    #[serde(default)]
    pub inferred_label: Option<SentimentLabel>,
}

impl PostRecord {
    pub fn new(id: u64, text: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            topic: topic.into(),
            manual_label: None,
            inferred_label: None,
        }
    }

    /// The durable label: a manual label always wins over an inferred one.
    pub fn resolved_label(&self) -> Option<SentimentLabel> {
        self.manual_label.or(self.inferred_label)
    }

    /// Record a resolved label, clearing the field of the other source.
    pub fn set_label(&mut self, label: SentimentLabel, source: LabelSource) {
        match source {
            LabelSource::Manual => {
                self.manual_label = Some(label);
                self.inferred_label = None;
            }
            LabelSource::Predicted => {
                self.manual_label = None;
                self.inferred_label = Some(label);
            }
        }
    }
}

/// A human-assigned label for one post, stored as its category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAnnotation {
    pub post_id: u64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_codes_are_fixed() {
        assert_eq!(TopicKind::from_tag("interdisciplinary").unwrap().code(), 0);
        assert_eq!(TopicKind::from_tag("transdisciplinary").unwrap().code(), 1);
        assert_eq!(TopicKind::from_tag("multidisciplinary").unwrap().code(), 2);
    }

    #[test]
    fn unknown_topic_is_a_mapping_fault() {
        assert_eq!(
            TopicKind::from_tag("postdisciplinary"),
            Err(HarvestError::UnknownTopic("postdisciplinary".into()))
        );
        // Tags are exact; no case folding on stored topic tags.
        assert!(TopicKind::from_tag("Interdisciplinary").is_err());
    }

    #[test]
    fn label_names_map_to_codes() {
        assert_eq!(SentimentLabel::from_name("negative").unwrap().code(), 0);
        assert_eq!(SentimentLabel::from_name("Neutral").unwrap().code(), 1);
        assert_eq!(SentimentLabel::from_name(" POSITIVE\n").unwrap().code(), 2);
    }

    #[test]
    fn unknown_label_is_a_mapping_fault() {
        assert_eq!(
            SentimentLabel::from_name("mixed"),
            Err(HarvestError::UnknownLabel("mixed".into()))
        );
        assert_eq!(
            SentimentLabel::from_code(3),
            Err(HarvestError::UnknownLabelCode(3))
        );
    }

    #[test]
    fn builtin_queries_cover_keyword_and_hashtag_forms() {
        let topics = Topic::builtin();
        assert_eq!(topics.len(), 3);
        assert_eq!(
            topics[0].query,
            "interdisciplinary OR #interdisciplinary OR interdisciplinarity OR #interdisciplinarity"
        );
        assert_eq!(topics[2].name, "multidisciplinary");
    }

    #[test]
    fn manual_label_takes_precedence_when_resolving() {
        let mut post = PostRecord::new(42, "text", "interdisciplinary");
        assert_eq!(post.resolved_label(), None);

        post.set_label(SentimentLabel::Negative, LabelSource::Predicted);
        assert_eq!(post.resolved_label(), Some(SentimentLabel::Negative));

        post.set_label(SentimentLabel::Positive, LabelSource::Manual);
        assert_eq!(post.resolved_label(), Some(SentimentLabel::Positive));
        assert_eq!(post.inferred_label, None);
    }
}
