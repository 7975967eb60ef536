//! Label merge: manual annotations first, classifier second.
//!
//! For every post in the target corpus the resolved label is the manual
//! annotation for that post id if one exists, otherwise the classifier's
//! prediction for its text. The label is written back onto the post and a
//! row is added to the artifact.
//!
//! A post whose topic tag or manual label has no known code, or that the
//! classifier cannot handle, is skipped and reported. Store failures abort
//! the run.

use std::collections::HashMap;
use std::path::Path;

use harvest_common::{HarvestError, LabelSource, SentimentLabel, TopicKind};
use tracing::{debug, error, info};

use crate::artifact::{LabelArtifact, LabelRow};
use crate::classifier::SentimentClassifier;
use crate::error::{LabelError, Result};
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Topic tag or manual label outside the known codes.
    Mapping(HarvestError),
    Classifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPost {
    pub post_id: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub total: usize,
    pub manual: usize,
    pub predicted: usize,
    pub skipped: Vec<SkippedPost>,
}

impl MergeReport {
    pub fn written(&self) -> usize {
        self.manual + self.predicted
    }
}

/// Resolve the label of one post. Errors are per-post faults.
fn resolve<C>(
    text: &str,
    manual: Option<&String>,
    classifier: &C,
) -> std::result::Result<(SentimentLabel, LabelSource), SkipReason>
where
    C: SentimentClassifier + ?Sized,
{
    match manual {
        Some(name) => SentimentLabel::from_name(name)
            .map(|label| (label, LabelSource::Manual))
            .map_err(SkipReason::Mapping),
        None => classifier
            .predict(text)
            .map(|label| (label, LabelSource::Predicted))
            .map_err(|e| match e {
                LabelError::Mapping(e) => SkipReason::Mapping(e),
                other => SkipReason::Classifier(other.to_string()),
            }),
    }
}

/// Resolve a label for every target post, update the store, and build the
/// artifact in memory.
pub async fn merge_labels<D, C>(store: &D, classifier: &C) -> Result<(LabelArtifact, MergeReport)>
where
    D: DocumentStore + ?Sized,
    C: SentimentClassifier + ?Sized,
{
    let annotations: HashMap<u64, String> = store
        .manual_annotations()
        .await?
        .into_iter()
        .map(|a| (a.post_id, a.label))
        .collect();
    let posts = store.target_posts().await?;
    info!(
        posts = posts.len(),
        annotations = annotations.len(),
        "Merging labels"
    );

    let mut artifact = LabelArtifact::with_capacity(posts.len());
    let mut report = MergeReport {
        total: posts.len(),
        ..Default::default()
    };

    for (i, post) in posts.iter().enumerate() {
        debug!(post_id = post.id, "Processing post {}/{}", i + 1, posts.len());

        let resolved = TopicKind::from_tag(&post.topic)
            .map_err(SkipReason::Mapping)
            .and_then(|topic| {
                resolve(&post.text, annotations.get(&post.id), classifier)
                    .map(|(label, source)| (topic, label, source))
            });

        let (topic, label, source) = match resolved {
            Ok(resolved) => resolved,
            Err(reason) => {
                error!(post_id = post.id, ?reason, "Skipping post");
                report.skipped.push(SkippedPost {
                    post_id: post.id,
                    reason,
                });
                continue;
            }
        };

        store.update_label(post.id, label, source).await?;
        artifact.push(LabelRow(post.id, label.code(), topic.code()));
        match source {
            LabelSource::Manual => report.manual += 1,
            LabelSource::Predicted => report.predicted += 1,
        }
    }

    info!(
        total = report.total,
        manual = report.manual,
        predicted = report.predicted,
        skipped = report.skipped.len(),
        "Merged labels"
    );
    Ok((artifact, report))
}

/// Merge labels and replace the artifact at `artifact_path`.
pub async fn run_merge<D, C>(store: &D, classifier: &C, artifact_path: &Path) -> Result<MergeReport>
where
    D: DocumentStore + ?Sized,
    C: SentimentClassifier + ?Sized,
{
    let (artifact, report) = merge_labels(store, classifier).await?;
    artifact.write(artifact_path)?;
    Ok(report)
}
