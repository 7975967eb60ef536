use std::path::PathBuf;

use harvest_collector::CollectError;
use harvest_common::HarvestError;

/// Result type alias for labeling operations.
pub type Result<T> = std::result::Result<T, LabelError>;

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Mapping(#[from] HarvestError),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Invalid model {}: {reason}", path.display())]
    Model { path: PathBuf, reason: String },

    #[error("Post id {0} does not fit the store's id column")]
    IdRange(u64),

    #[error("Batch error: {0}")]
    Batch(#[from] CollectError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LabelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LabelError::Io {
            path: path.into(),
            source,
        }
    }
}
