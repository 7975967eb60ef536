use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    #[error("Unknown topic tag: {0:?}")]
    UnknownTopic(String),

    #[error("Unknown sentiment label: {0:?}")]
    UnknownLabel(String),

    #[error("Unknown sentiment label code: {0}")]
    UnknownLabelCode(i64),

    #[error("Configuration error: {0}")]
    Config(String),
}
