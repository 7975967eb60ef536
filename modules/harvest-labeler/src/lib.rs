pub mod artifact;
pub mod classifier;
pub mod error;
pub mod import;
pub mod merge;
pub mod pg;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use artifact::{LabelArtifact, LabelRow};
pub use classifier::{LinearModel, SentimentClassifier};
pub use error::{LabelError, Result};
pub use import::{import_batches, ImportReport};
pub use merge::{merge_labels, run_merge, MergeReport, SkipReason, SkippedPost};
pub use pg::PgDocumentStore;
pub use store::{DocumentStore, MemoryDocumentStore};
