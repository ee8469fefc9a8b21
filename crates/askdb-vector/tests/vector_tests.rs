use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use askdb_core::error::{Error, Result};
use askdb_core::retry::RetryPolicy;
use askdb_core::traits::{EmbeddingProvider, VectorIndex};
use askdb_core::types::{Corpus, Meta, SourceKind};
use askdb_vector::{HashedEmbedder, MemoryVectorIndex, Metric, SemanticIndex, SemanticOptions};

/// Succeeds for the first `fail_from` calls, then fails every time.
struct FailingEmbedder {
    dim: usize,
    fail_from: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    fn new(dim: usize, fail_from: usize) -> Self {
        Self {
            dim,
            fail_from,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_from {
            return Err(Error::EmbeddingProvider("service unavailable".to_string()));
        }
        Ok(texts.iter().map(|_| vec![0.1; self.dim]).collect())
    }
}

/// Fails the first `failures` calls, then behaves like a hashed embedder.
struct FlakyEmbedder {
    inner: HashedEmbedder,
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::EmbeddingProvider("transient".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

fn corpus_of(texts: &[&str]) -> Corpus {
    Corpus::from_pairs(texts.iter().map(|t| ((*t).to_string(), Meta::new()))).expect("corpus")
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(2),
        multiplier: 2.0,
    }
}

#[test]
fn memory_store_ranks_by_cosine() {
    let store = MemoryVectorIndex::default();
    assert_eq!(store.metric(), Metric::Cosine);

    store.upsert(0, vec![1.0, 0.0, 0.0], Meta::new()).expect("upsert");
    store.upsert(1, vec![0.9, 0.1, 0.0], Meta::new()).expect("upsert");
    store.upsert(2, vec![0.0, 1.0, 0.0], Meta::new()).expect("upsert");

    let results = store.query(&[1.0, 0.0, 0.0], 2).expect("query");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, 0);
    assert!((results[0].1 - 1.0).abs() < 1e-4);
    assert_eq!(results[1].0, 1);
}

#[test]
fn dot_metric_ignores_magnitude_differently_than_cosine() {
    let store = MemoryVectorIndex::new(Metric::Dot);
    // Same direction, larger magnitude wins under dot product.
    store.upsert(0, vec![1.0, 0.0], Meta::new()).expect("upsert");
    store.upsert(1, vec![3.0, 0.0], Meta::new()).expect("upsert");

    let results = store.query(&[1.0, 0.0], 2).expect("query");
    assert_eq!(results[0].0, 1);
}

#[test]
fn memory_store_keeps_upsert_metadata() {
    let store = MemoryVectorIndex::default();
    let mut meta = Meta::new();
    meta.insert("doc_path".to_string(), "a.txt".to_string());
    store.upsert(7, vec![1.0], meta).expect("upsert");

    let stored = store.metadata(7).expect("metadata");
    assert_eq!(stored.get("doc_path"), Some(&"a.txt".to_string()));
    assert!(store.metadata(8).is_none());
}

#[tokio::test]
async fn hashed_embedder_is_deterministic_and_unit_norm() {
    let embedder = HashedEmbedder::new(64);
    let texts = vec!["roo code is an agent".to_string()];

    let first = embedder.embed_batch(&texts).await.expect("first");
    let second = embedder.embed_batch(&texts).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(first[0].len(), 64);

    let norm: f32 = first[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn semantic_build_and_query() {
    let corpus = corpus_of(&[
        "roo code is an agent",
        "installing roo code",
        "unrelated text about cooking",
    ]);
    let embedder = Arc::new(HashedEmbedder::new(64));
    let index = SemanticIndex::build(
        &corpus,
        embedder,
        MemoryVectorIndex::default(),
        &SemanticOptions::default(),
    )
    .await
    .expect("build");

    let hits = index.query("what is roo code", 2).await.expect("query");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.source == SourceKind::Semantic));
    assert!(
        hits.iter().all(|h| h.doc != 2),
        "the cooking document shares no tokens with the query"
    );
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn build_rejects_empty_corpus() {
    let err = SemanticIndex::build(
        &Corpus::new(),
        Arc::new(HashedEmbedder::new(8)),
        MemoryVectorIndex::default(),
        &SemanticOptions::default(),
    )
    .await
    .err()
    .expect("empty corpus");
    assert!(matches!(err, Error::EmptyCorpus));
}

#[tokio::test]
async fn build_is_all_or_nothing() {
    let corpus = corpus_of(&["one", "two", "three", "four"]);
    let embedder = Arc::new(FailingEmbedder::new(8, 1));
    let store = Arc::new(MemoryVectorIndex::default());

    let options = SemanticOptions {
        batch_size: 2,
        retry: fast_retry(0),
    };
    let err = SemanticIndex::build(&corpus, embedder, store.clone(), &options)
        .await
        .err()
        .expect("second batch fails");

    assert!(matches!(err, Error::EmbeddingProvider(_)));
    assert!(
        store.is_empty(),
        "a failed build must leave no partial index"
    );
}

#[tokio::test]
async fn build_batches_by_configured_size() {
    let corpus = corpus_of(&["a", "b", "c", "d", "e"]);
    let embedder = Arc::new(FailingEmbedder::new(8, usize::MAX));
    let options = SemanticOptions {
        batch_size: 2,
        retry: fast_retry(0),
    };

    SemanticIndex::build(
        &corpus,
        embedder.clone(),
        MemoryVectorIndex::default(),
        &options,
    )
    .await
    .expect("build");

    assert_eq!(
        embedder.calls.load(Ordering::SeqCst),
        3,
        "five documents in batches of two"
    );
}

#[tokio::test]
async fn build_retries_transient_batch_failures() {
    let corpus = corpus_of(&["one doc", "another doc"]);
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashedEmbedder::new(16),
        failures: 1,
        calls: AtomicUsize::new(0),
    });
    let options = SemanticOptions {
        batch_size: 32,
        retry: fast_retry(2),
    };

    let index = SemanticIndex::build(
        &corpus,
        embedder.clone(),
        MemoryVectorIndex::default(),
        &options,
    )
    .await
    .expect("build recovers");

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    let hits = index.query("one", 1).await.expect("query");
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn query_embedding_failure_propagates_without_retry() {
    let corpus = corpus_of(&["one doc", "another doc"]);
    // One successful call covers the whole build; the query call fails.
    let embedder = Arc::new(FailingEmbedder::new(8, 1));
    let options = SemanticOptions {
        batch_size: 32,
        retry: fast_retry(3),
    };

    let index = SemanticIndex::build(
        &corpus,
        embedder.clone(),
        MemoryVectorIndex::default(),
        &options,
    )
    .await
    .expect("build");

    let err = index.query("anything", 2).await.err().expect("query fails");
    assert!(matches!(err, Error::EmbeddingProvider(_)));
    assert_eq!(
        embedder.calls.load(Ordering::SeqCst),
        2,
        "query-time embedding is not retried"
    );
}

#[tokio::test]
async fn zero_k_is_rejected() {
    let corpus = corpus_of(&["doc"]);
    let index = SemanticIndex::build(
        &corpus,
        Arc::new(HashedEmbedder::new(8)),
        MemoryVectorIndex::default(),
        &SemanticOptions::default(),
    )
    .await
    .expect("build");

    let err = index.query("doc", 0).await.err().expect("k = 0");
    assert!(matches!(err, Error::InvalidConfig(_)));
}
