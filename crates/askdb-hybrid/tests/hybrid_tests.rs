use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use askdb_core::error::{Error, Result};
use askdb_core::traits::Retriever;
use askdb_core::types::{Corpus, Meta, ScoredHit, SourceKind};
use askdb_hybrid::{FusionOptions, HybridRetriever};
use askdb_lexical::{LexicalIndex, LexicalOptions};
use askdb_vector::{HashedEmbedder, MemoryVectorIndex, SemanticIndex, SemanticOptions};

struct StaticRetriever {
    kind: SourceKind,
    docs: Vec<u32>,
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<ScoredHit>> {
        Ok(self
            .docs
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, doc)| ScoredHit {
                doc: *doc,
                score: 10.0 - i as f32,
                source: self.kind,
            })
            .collect())
    }
}

struct FailingRetriever {
    kind: SourceKind,
}

#[async_trait]
impl Retriever for FailingRetriever {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<ScoredHit>> {
        match self.kind {
            SourceKind::Semantic => Err(Error::EmbeddingProvider("offline".to_string())),
            SourceKind::Lexical => Err(Error::InvalidConfig("broken index".to_string())),
        }
    }
}

struct SlowRetriever {
    kind: SourceKind,
    delay: Duration,
}

#[async_trait]
impl Retriever for SlowRetriever {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<ScoredHit>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![])
    }
}

fn lexical_stub(docs: &[u32]) -> StaticRetriever {
    StaticRetriever {
        kind: SourceKind::Lexical,
        docs: docs.to_vec(),
    }
}

fn semantic_stub(docs: &[u32]) -> StaticRetriever {
    StaticRetriever {
        kind: SourceKind::Semantic,
        docs: docs.to_vec(),
    }
}

#[tokio::test]
async fn fuses_both_sources_when_healthy() {
    let retriever = HybridRetriever::new(
        lexical_stub(&[0, 1]),
        semantic_stub(&[1, 2]),
        FusionOptions::default(),
    )
    .expect("retriever");

    let outcome = retriever.search("anything", 3).await.expect("search");
    assert!(outcome.degraded.is_none());
    assert_eq!(outcome.hits.len(), 3);
    assert_eq!(outcome.hits[0].doc, 1, "doc 1 appears in both sources");
}

#[tokio::test]
async fn degrades_to_lexical_when_semantic_fails() {
    let retriever = HybridRetriever::new(
        lexical_stub(&[4, 2, 9]),
        FailingRetriever {
            kind: SourceKind::Semantic,
        },
        FusionOptions::default(),
    )
    .expect("retriever");

    let outcome = retriever.search("anything", 2).await.expect("degraded search");
    assert_eq!(outcome.degraded, Some(SourceKind::Semantic));
    assert_eq!(
        outcome.hits.iter().map(|h| h.doc).collect::<Vec<_>>(),
        vec![4, 2],
        "surviving list passes through in order"
    );
}

#[tokio::test]
async fn degrades_to_semantic_when_lexical_fails() {
    let retriever = HybridRetriever::new(
        FailingRetriever {
            kind: SourceKind::Lexical,
        },
        semantic_stub(&[7, 5]),
        FusionOptions::default(),
    )
    .expect("retriever");

    let outcome = retriever.search("anything", 5).await.expect("degraded search");
    assert_eq!(outcome.degraded, Some(SourceKind::Lexical));
    assert_eq!(
        outcome.hits.iter().map(|h| h.doc).collect::<Vec<_>>(),
        vec![7, 5]
    );
}

#[tokio::test]
async fn both_sources_failing_is_an_error() {
    let retriever = HybridRetriever::new(
        FailingRetriever {
            kind: SourceKind::Lexical,
        },
        FailingRetriever {
            kind: SourceKind::Semantic,
        },
        FusionOptions::default(),
    )
    .expect("retriever");

    let err = retriever.search("anything", 2).await.err().expect("error");
    match err {
        Error::Retrieval { lexical, semantic } => {
            assert!(matches!(*lexical, Error::InvalidConfig(_)));
            assert!(matches!(*semantic, Error::EmbeddingProvider(_)));
        }
        other => panic!("expected Retrieval, got {other}"),
    }
}

#[tokio::test]
async fn zero_k_is_rejected() {
    let retriever = HybridRetriever::new(
        lexical_stub(&[1]),
        semantic_stub(&[1]),
        FusionOptions::default(),
    )
    .expect("retriever");

    let err = retriever.search("anything", 0).await.err().expect("k = 0");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test]
async fn invalid_weights_are_rejected_at_construction() {
    let err = HybridRetriever::new(
        lexical_stub(&[1]),
        semantic_stub(&[1]),
        FusionOptions::new(-1.0, 0.5),
    )
    .err()
    .expect("negative weight");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test]
async fn cancellation_aborts_outstanding_queries() {
    let retriever = HybridRetriever::new(
        SlowRetriever {
            kind: SourceKind::Lexical,
            delay: Duration::from_secs(5),
        },
        SlowRetriever {
            kind: SourceKind::Semantic,
            delay: Duration::from_secs(5),
        },
        FusionOptions::default(),
    )
    .expect("retriever");

    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let started = Instant::now();
    let err = retriever
        .search_with_cancel("anything", 2, &cancel)
        .await
        .err()
        .expect("cancelled");
    assert!(matches!(err, Error::Cancelled));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancellation must not wait for the slow queries"
    );
}

// The end-to-end scenario over real indices: three documents, hybrid query,
// weights (0.7, 0.3), k = 2.
#[tokio::test]
async fn end_to_end_three_document_scenario() {
    let corpus = Arc::new(
        Corpus::from_pairs(vec![
            ("roo code is an agent".to_string(), Meta::new()),
            ("installing roo code".to_string(), Meta::new()),
            ("unrelated text about cooking".to_string(), Meta::new()),
        ])
        .expect("corpus"),
    );

    let lexical =
        LexicalIndex::build(corpus.clone(), LexicalOptions::default()).expect("lexical");
    let semantic = SemanticIndex::build(
        &corpus,
        Arc::new(HashedEmbedder::new(64)),
        MemoryVectorIndex::default(),
        &SemanticOptions::default(),
    )
    .await
    .expect("semantic");

    let retriever =
        HybridRetriever::new(lexical, semantic, FusionOptions::new(0.7, 0.3)).expect("retriever");

    let outcome = retriever.search("what is roo code", 2).await.expect("search");
    assert!(outcome.degraded.is_none());
    assert_eq!(
        outcome.hits.iter().map(|h| h.doc).collect::<Vec<_>>(),
        vec![0, 1],
        "the agent document leads, the install document follows"
    );
}
