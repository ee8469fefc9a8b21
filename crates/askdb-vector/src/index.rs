//! Semantic index adapter: embeddings in, nearest neighbors out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use askdb_core::error::{Error, Result};
use askdb_core::retry::{retry_with_backoff, RetryPolicy};
use askdb_core::traits::{EmbeddingProvider, Retriever, VectorIndex};
use askdb_core::types::{Corpus, ScoredHit, SourceKind};

/// Build and query knobs for the semantic side.
#[derive(Debug, Clone)]
pub struct SemanticOptions {
    /// Documents per embedding request.
    pub batch_size: usize,
    /// Retry schedule for build-time embedding batches. Query-time embedding
    /// calls are never retried; their failure propagates to the caller.
    pub retry: RetryPolicy,
}

impl Default for SemanticOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct SemanticIndex<V: VectorIndex> {
    store: V,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl<V: VectorIndex> SemanticIndex<V> {
    /// Embed every document and load the store.
    ///
    /// All-or-nothing: every batch must succeed (after retries) and pass the
    /// dimension check before the first upsert happens, so a failed build
    /// leaves the store untouched.
    pub async fn build(
        corpus: &Corpus,
        embedder: Arc<dyn EmbeddingProvider>,
        store: V,
        options: &SemanticOptions,
    ) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
        }

        let texts: Vec<String> = corpus.iter().map(|d| d.text.clone()).collect();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(options.batch_size) {
            let vectors = retry_with_backoff(&options.retry, "embedding batch", || {
                embedder.embed_batch(batch)
            })
            .await?;
            for vector in &vectors {
                if vector.len() != embedder.dim() {
                    return Err(Error::EmbeddingProvider(format!(
                        "expected dimension {}, got {}",
                        embedder.dim(),
                        vector.len()
                    )));
                }
            }
            embeddings.extend(vectors);
        }
        if embeddings.len() != corpus.len() {
            return Err(Error::EmbeddingProvider(format!(
                "expected {} embeddings, got {}",
                corpus.len(),
                embeddings.len()
            )));
        }

        for (doc, vector) in corpus.iter().zip(embeddings) {
            store.upsert(doc.id, vector, doc.metadata.clone())?;
        }
        debug!(
            documents = corpus.len(),
            dim = embedder.dim(),
            "built semantic index"
        );
        Ok(Self { store, embedder })
    }

    /// Embed the query and return its nearest neighbors, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".to_string()));
        }
        let mut vectors = self.embedder.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(Error::EmbeddingProvider(
                "no embedding returned for query".to_string(),
            ));
        }
        let query_vector = vectors.remove(0);
        let hits = self.store.query(&query_vector, k)?;
        Ok(hits
            .into_iter()
            .map(|(doc, score)| ScoredHit {
                doc,
                score,
                source: SourceKind::Semantic,
            })
            .collect())
    }
}

#[async_trait]
impl<V: VectorIndex> Retriever for SemanticIndex<V> {
    fn kind(&self) -> SourceKind {
        SourceKind::Semantic
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>> {
        self.query(query, k).await
    }
}
