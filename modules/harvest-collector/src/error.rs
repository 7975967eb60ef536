use std::path::PathBuf;

use search_client::SearchError;

pub type Result<T> = std::result::Result<T, CollectError>;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt batch {} at line {line}: {reason}", path.display())]
    CorruptBatch {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Batch {} contains no records", .0.display())]
    EmptyBatch(PathBuf),

    #[error("Invalid batch file name: {0}")]
    BatchName(String),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Search precondition violated: {0}")]
    Precondition(String),
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }
}
