// Test mocks for the labeling stage.
//
// FixedClassifier returns a default label, with per-text overrides and
// per-text failures, and records every text it was asked about so tests can
// assert that manually labeled posts never reach the classifier.
//
// FailingStore wraps a MemoryDocumentStore and injects store faults.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use harvest_common::{LabelSource, ManualAnnotation, PostRecord, SentimentLabel};

use crate::classifier::SentimentClassifier;
use crate::error::{LabelError, Result};
use crate::store::{DocumentStore, MemoryDocumentStore};

pub struct FixedClassifier {
    default: SentimentLabel,
    overrides: HashMap<String, SentimentLabel>,
    failures: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FixedClassifier {
    pub fn new(default: SentimentLabel) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            failures: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_text(mut self, text: &str, label: SentimentLabel) -> Self {
        self.overrides.insert(text.to_string(), label);
        self
    }

    pub fn fail_on(mut self, text: &str) -> Self {
        self.failures.push(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SentimentClassifier for FixedClassifier {
    fn predict(&self, text: &str) -> Result<SentimentLabel> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failures.iter().any(|t| t == text) {
            return Err(LabelError::Classifier(format!("cannot classify {text:?}")));
        }
        Ok(self.overrides.get(text).copied().unwrap_or(self.default))
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

pub struct FailingStore {
    inner: MemoryDocumentStore,
    fail_update_on: Option<u64>,
    fail_reads: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            fail_update_on: None,
            fail_reads: false,
        }
    }

    /// Fail `update_label` for this post id.
    pub fn fail_update_on(mut self, post_id: u64) -> Self {
        self.fail_update_on = Some(post_id);
        self
    }

    /// Fail reading the target posts.
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn inner(&self) -> &MemoryDocumentStore {
        &self.inner
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn manual_annotations(&self) -> Result<Vec<ManualAnnotation>> {
        self.inner.manual_annotations().await
    }

    async fn target_posts(&self) -> Result<Vec<PostRecord>> {
        if self.fail_reads {
            return Err(LabelError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.target_posts().await
    }

    async fn update_label(
        &self,
        post_id: u64,
        label: SentimentLabel,
        source: LabelSource,
    ) -> Result<()> {
        if self.fail_update_on == Some(post_id) {
            return Err(LabelError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_label(post_id, label, source).await
    }

    async fn upsert_target_post(&self, post: &PostRecord) -> Result<bool> {
        self.inner.upsert_target_post(post).await
    }
}
