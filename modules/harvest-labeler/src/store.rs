// Document store seam for the labeling stage.
//
// Two collections: manual annotations (post id → category name) and target
// posts (the corpus, updated in place with resolved labels). PgDocumentStore
// is the production store; MemoryDocumentStore backs tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use harvest_common::{LabelSource, ManualAnnotation, PostRecord, SentimentLabel};

use crate::error::Result;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every manual annotation.
    async fn manual_annotations(&self) -> Result<Vec<ManualAnnotation>>;

    /// Every post in the target corpus, ordered by id.
    async fn target_posts(&self) -> Result<Vec<PostRecord>>;

    /// Store the resolved label on the post itself.
    async fn update_label(
        &self,
        post_id: u64,
        label: SentimentLabel,
        source: LabelSource,
    ) -> Result<()>;

    /// Insert a post, or refresh its text and topic if it already exists.
    /// Never touches an existing label. Returns true when the post is new.
    async fn upsert_target_post(&self, post: &PostRecord) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDocumentStore {
    annotations: Mutex<BTreeMap<u64, String>>,
    posts: Mutex<BTreeMap<u64, PostRecord>>,
    updates: Mutex<Vec<(u64, SentimentLabel, LabelSource)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(self, id: u64, text: &str, topic: &str) -> Self {
        self.posts
            .lock()
            .unwrap()
            .insert(id, PostRecord::new(id, text, topic));
        self
    }

    pub fn with_annotation(self, post_id: u64, label: &str) -> Self {
        self.annotations
            .lock()
            .unwrap()
            .insert(post_id, label.to_string());
        self
    }

    pub fn post(&self, id: u64) -> Option<PostRecord> {
        self.posts.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every label update, in call order.
    pub fn updates(&self) -> Vec<(u64, SentimentLabel, LabelSource)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn manual_annotations(&self) -> Result<Vec<ManualAnnotation>> {
        Ok(self
            .annotations
            .lock()
            .unwrap()
            .iter()
            .map(|(&post_id, label)| ManualAnnotation {
                post_id,
                label: label.clone(),
            })
            .collect())
    }

    async fn target_posts(&self) -> Result<Vec<PostRecord>> {
        Ok(self.posts.lock().unwrap().values().cloned().collect())
    }

    async fn update_label(
        &self,
        post_id: u64,
        label: SentimentLabel,
        source: LabelSource,
    ) -> Result<()> {
        if let Some(post) = self.posts.lock().unwrap().get_mut(&post_id) {
            post.set_label(label, source);
        }
        self.updates.lock().unwrap().push((post_id, label, source));
        Ok(())
    }

    async fn upsert_target_post(&self, post: &PostRecord) -> Result<bool> {
        let mut posts = self.posts.lock().unwrap();
        match posts.get_mut(&post.id) {
            Some(existing) => {
                existing.text = post.text.clone();
                existing.topic = post.topic.clone();
                Ok(false)
            }
            None => {
                posts.insert(post.id, PostRecord::new(post.id, &post.text, &post.topic));
                Ok(true)
            }
        }
    }
}
