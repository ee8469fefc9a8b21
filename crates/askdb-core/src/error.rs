use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("document at position {0} has empty text")]
    EmptyDocument(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding provider: {0}")]
    EmbeddingProvider(String),

    #[error("vector store: {0}")]
    VectorStore(String),

    #[error("both retrieval sources failed: lexical: {lexical}; semantic: {semantic}")]
    Retrieval {
        lexical: Box<Error>,
        semantic: Box<Error>,
    },

    #[error("language model: {0}")]
    Generation(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("query cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
