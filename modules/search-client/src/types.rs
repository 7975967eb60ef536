use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page request against the standard search endpoint.
///
/// `since_id` is exclusive (results strictly newer), `max_id` is inclusive
/// (results at or below it), matching the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub since_id: Option<u64>,
    pub max_id: Option<u64>,
    pub count: u32,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, count: u32) -> Self {
        Self {
            query: query.into(),
            since_id: None,
            max_id: None,
            count,
        }
    }

    pub fn since_id(mut self, since_id: Option<u64>) -> Self {
        self.since_id = since_id;
        self
    }

    pub fn max_id(mut self, max_id: Option<u64>) -> Self {
        self.max_id = max_id;
        self
    }

    /// Query-string pairs in the order the API documents them.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("count", self.count.to_string()),
            ("tweet_mode", "extended".to_string()),
            ("result_type", "recent".to_string()),
        ];
        if let Some(since_id) = self.since_id {
            pairs.push(("since_id", since_id.to_string()));
        }
        if let Some(max_id) = self.max_id {
            pairs.push(("max_id", max_id.to_string()));
        }
        pairs
    }
}

/// A single post as returned by the search endpoint.
///
/// Only the fields the harvester reads are typed; everything else the API
/// sends is kept in `extra` so the record can be persisted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tweet {
    /// Returns whichever text field is populated, preferring `full_text`.
    pub fn content(&self) -> Option<&str> {
        self.full_text.as_deref().or(self.text.as_deref())
    }
}

/// Envelope of a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub statuses: Vec<Tweet>,
}
