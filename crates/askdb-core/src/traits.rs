//! Trait seams for the external collaborators and the two retrieval engines.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocId, Meta, ScoredHit, SourceKind};

/// Maps text to fixed-dimension vectors. Implementations may call out over
/// the network; batch-size limits are the implementation's concern.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbor store. The similarity metric is fixed when the store is
/// constructed and must match at query time. Implementations signal failures
/// with `Error::VectorStore`.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, id: DocId, vector: Vec<f32>, metadata: Meta) -> Result<()>;
    /// Top `k` entries by similarity to `vector`, best first.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(DocId, f32)>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: VectorIndex + ?Sized> VectorIndex for Arc<T> {
    fn upsert(&self, id: DocId, vector: Vec<f32>, metadata: Meta) -> Result<()> {
        (**self).upsert(id, vector, metadata)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(DocId, f32)>> {
        (**self).query(vector, k)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Generates prose from retrieved passages and a question.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, passages: &[String], question: &str) -> Result<String>;
}

/// A ranked retrieval source. Both the lexical and the semantic index expose
/// this surface; the hybrid engine joins over it.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>>;
}
