//! Label merge tests: in-memory store + fixed classifier → artifact.
//!
//! No database, no model file.

use harvest_common::{HarvestError, LabelSource, SentimentLabel};
use harvest_labeler::testing::{FailingStore, FixedClassifier};
use harvest_labeler::{
    merge_labels, run_merge, DocumentStore, LabelArtifact, LabelError, LabelRow, LinearModel,
    MemoryDocumentStore, SkipReason,
};

use SentimentLabel::{Negative, Neutral, Positive};

// ---------------------------------------------------------------------------
// Precedence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_label_beats_classifier() {
    let store = MemoryDocumentStore::new()
        .with_post(42, "what a disaster", "interdisciplinary")
        .with_annotation(42, "positive");
    let classifier = FixedClassifier::new(Negative);

    let (artifact, report) = merge_labels(&store, &classifier).await.unwrap();

    assert_eq!(artifact.rows(), [LabelRow(42, 2, 0)]);
    assert_eq!(report.manual, 1);
    assert_eq!(report.predicted, 0);
    // The classifier is never consulted for a manually labeled post.
    assert!(classifier.calls().is_empty());
}

#[tokio::test]
async fn classifier_fills_in_unannotated_posts() {
    let store = MemoryDocumentStore::new()
        .with_post(1, "love this", "interdisciplinary")
        .with_post(2, "meh", "transdisciplinary")
        .with_post(3, "annotated", "multidisciplinary")
        .with_annotation(3, "Neutral");
    let classifier = FixedClassifier::new(Neutral).on_text("love this", Positive);

    let (artifact, report) = merge_labels(&store, &classifier).await.unwrap();

    assert_eq!(
        artifact.rows(),
        [LabelRow(1, 2, 0), LabelRow(2, 1, 1), LabelRow(3, 1, 2)]
    );
    assert_eq!(classifier.calls(), ["love this", "meh"]);
    assert_eq!((report.manual, report.predicted), (1, 2));
}

#[tokio::test]
async fn annotations_for_posts_outside_the_corpus_are_ignored() {
    let store = MemoryDocumentStore::new()
        .with_post(1, "text", "interdisciplinary")
        .with_annotation(999, "negative");

    let (artifact, _) = merge_labels(&store, &FixedClassifier::new(Positive))
        .await
        .unwrap();

    assert_eq!(artifact.rows(), [LabelRow(1, 2, 0)]);
}

// ---------------------------------------------------------------------------
// Store side effect and artifact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolved_labels_are_written_back_to_posts() {
    let store = MemoryDocumentStore::new()
        .with_post(10, "a", "interdisciplinary")
        .with_post(11, "b", "interdisciplinary")
        .with_annotation(11, "negative");

    merge_labels(&store, &FixedClassifier::new(Positive))
        .await
        .unwrap();

    assert_eq!(
        store.updates(),
        [
            (10, Positive, LabelSource::Predicted),
            (11, Negative, LabelSource::Manual)
        ]
    );
    let post = store.post(10).unwrap();
    assert_eq!(post.inferred_label, Some(Positive));
    let post = store.post(11).unwrap();
    assert_eq!(post.manual_label, Some(Negative));
    assert_eq!(post.resolved_label(), Some(Negative));
}

#[tokio::test]
async fn artifact_has_one_row_per_post() {
    let topics = ["interdisciplinary", "transdisciplinary", "multidisciplinary"];
    let mut store = MemoryDocumentStore::new();
    for id in 0..30u64 {
        store = store.with_post(id, &format!("post {id}"), topics[(id % 3) as usize]);
        if id % 4 == 0 {
            let label = ["negative", "neutral", "positive"][(id % 3) as usize];
            store = store.with_annotation(id, label);
        }
    }
    let classifier = FixedClassifier::new(Neutral);

    let (artifact, report) = merge_labels(&store, &classifier).await.unwrap();

    assert_eq!(artifact.len(), 30);
    assert_eq!(report.written(), 30);
    for row in artifact.rows() {
        let post = store.post(row.post_id()).unwrap();
        assert_eq!(u64::from(row.topic_code()), row.post_id() % 3);
        assert!(row.label_code() <= 2);
        assert_eq!(Some(row.label_code()), post.resolved_label().map(|l| l.code()));
    }
}

#[tokio::test]
async fn run_merge_replaces_artifact_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels").join("labels.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[[1,1,1],[2,1,1],[3,1,1]]").unwrap();

    let store = MemoryDocumentStore::new().with_post(5, "x", "transdisciplinary");
    let report = run_merge(&store, &FixedClassifier::new(Negative), &path)
        .await
        .unwrap();

    assert_eq!(report.written(), 1);
    let artifact = LabelArtifact::read(&path).unwrap();
    assert_eq!(artifact.rows(), [LabelRow(5, 0, 1)]);
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_topic_is_a_mapping_fault() {
    let store = MemoryDocumentStore::new()
        .with_post(1, "ok", "interdisciplinary")
        .with_post(2, "bad topic", "postdisciplinary");

    let (artifact, report) = merge_labels(&store, &FixedClassifier::new(Neutral))
        .await
        .unwrap();

    assert_eq!(artifact.rows(), [LabelRow(1, 1, 0)]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].post_id, 2);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::Mapping(HarvestError::UnknownTopic("postdisciplinary".into()))
    );
    // Nothing is written for a faulted post.
    assert_eq!(store.post(2).unwrap().resolved_label(), None);
}

#[tokio::test]
async fn unknown_manual_label_is_a_mapping_fault_not_a_fallback() {
    let store = MemoryDocumentStore::new()
        .with_post(7, "text", "multidisciplinary")
        .with_annotation(7, "sarcastic");
    let classifier = FixedClassifier::new(Positive);

    let (artifact, report) = merge_labels(&store, &classifier).await.unwrap();

    assert!(artifact.is_empty());
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::Mapping(HarvestError::UnknownLabel("sarcastic".into()))
    );
    // A bad manual label must not fall through to the classifier.
    assert!(classifier.calls().is_empty());
}

#[tokio::test]
async fn classifier_failure_skips_only_that_post() {
    let store = MemoryDocumentStore::new()
        .with_post(1, "", "interdisciplinary")
        .with_post(2, "fine", "interdisciplinary");
    let model = LinearModel::from_json(
        r#"{"vocabulary": {"fine": 0}, "classes": ["negative", "neutral", "positive"],
            "coefficients": [[0.0], [0.0], [1.0]], "intercepts": [0.0, 0.0, 0.0]}"#,
    )
    .unwrap();

    let (artifact, report) = merge_labels(&store, &model).await.unwrap();

    assert_eq!(artifact.rows(), [LabelRow(2, 2, 0)]);
    assert_eq!(report.total, 2);
    assert!(matches!(report.skipped[0].reason, SkipReason::Classifier(_)));
}

#[tokio::test]
async fn classifier_failure_mid_corpus_keeps_the_rest() {
    let store = MemoryDocumentStore::new()
        .with_post(1, "first", "interdisciplinary")
        .with_post(2, "broken", "transdisciplinary")
        .with_post(3, "third", "multidisciplinary");
    let classifier = FixedClassifier::new(Positive).fail_on("broken");

    let (artifact, report) = merge_labels(&store, &classifier).await.unwrap();

    assert_eq!(artifact.rows(), [LabelRow(1, 2, 0), LabelRow(3, 2, 2)]);
    assert_eq!(classifier.calls(), ["first", "broken", "third"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].post_id, 2);
    assert!(matches!(report.skipped[0].reason, SkipReason::Classifier(_)));
    assert_eq!(store.post(2).unwrap().resolved_label(), None);
}

#[tokio::test]
async fn store_update_fault_aborts_merge() {
    let store = FailingStore::new(
        MemoryDocumentStore::new()
            .with_post(1, "a", "interdisciplinary")
            .with_post(2, "b", "interdisciplinary")
            .with_post(3, "c", "interdisciplinary"),
    )
    .fail_update_on(2);

    let err = merge_labels(&store, &FixedClassifier::new(Neutral))
        .await
        .unwrap_err();

    assert!(matches!(err, LabelError::Database(_)));
    // Nothing after the failing post is touched.
    assert_eq!(
        store.inner().updates(),
        [(1, Neutral, LabelSource::Predicted)]
    );
}

#[tokio::test]
async fn store_fault_leaves_previous_artifact_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    let previous = "[[1,1,1],[2,1,1]]";
    std::fs::write(&path, previous).unwrap();

    let store = FailingStore::new(
        MemoryDocumentStore::new()
            .with_post(1, "a", "interdisciplinary")
            .with_post(2, "b", "interdisciplinary"),
    )
    .fail_update_on(2);
    let result = run_merge(&store, &FixedClassifier::new(Positive), &path).await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), previous);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn store_read_fault_aborts_merge() {
    let store = FailingStore::new(
        MemoryDocumentStore::new().with_post(1, "a", "interdisciplinary"),
    )
    .fail_reads();
    let classifier = FixedClassifier::new(Neutral);

    let err = merge_labels(&store, &classifier).await.unwrap_err();

    assert!(matches!(err, LabelError::Database(_)));
    assert!(classifier.calls().is_empty());
    assert!(store.inner().updates().is_empty());
}

#[tokio::test]
async fn empty_corpus_writes_empty_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    let store = MemoryDocumentStore::new();
    assert!(store.target_posts().await.unwrap().is_empty());

    run_merge(&store, &FixedClassifier::new(Neutral), &path)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
}
