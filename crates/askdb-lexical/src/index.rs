//! Inverted index with BM25 scoring.
//!
//! Term statistics are derived from the whole corpus at build time and are
//! immutable afterwards; a changed corpus means a full rebuild.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use askdb_core::error::{Error, Result};
use askdb_core::traits::Retriever;
use askdb_core::types::{Corpus, DocId, ScoredHit, SourceKind};

use crate::tokenize::tokenize;

/// BM25 shape parameters: `k1` bounds term-frequency saturation, `b` scales
/// document-length normalization.
#[derive(Debug, Clone)]
pub struct LexicalOptions {
    pub k1: f32,
    pub b: f32,
}

impl Default for LexicalOptions {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// One entry in a term's postings list.
#[derive(Debug, Clone)]
struct Posting {
    doc: DocId,
    term_frequency: u32,
}

pub struct LexicalIndex {
    corpus: Arc<Corpus>,
    options: LexicalOptions,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    total_doc_length: u64,
}

impl LexicalIndex {
    /// Build term statistics over the full corpus.
    pub fn build(corpus: Arc<Corpus>, options: LexicalOptions) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut total_doc_length = 0u64;

        for doc in corpus.iter() {
            let tokens = tokenize(&doc.text);
            doc_lengths.push(tokens.len() as u32);
            total_doc_length += tokens.len() as u64;

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, term_frequency) in tf {
                postings.entry(term).or_default().push(Posting {
                    doc: doc.id,
                    term_frequency,
                });
            }
        }

        debug!(
            documents = corpus.len(),
            terms = postings.len(),
            "built lexical index"
        );
        Ok(Self {
            corpus,
            options,
            postings,
            doc_lengths,
            total_doc_length,
        })
    }

    fn average_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_doc_length as f32 / self.doc_lengths.len() as f32
        }
    }

    /// Score every document containing at least one query term, best first,
    /// ties broken by corpus order. `k` larger than the corpus returns all
    /// matching documents.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".to_string()));
        }
        let query_tokens = tokenize(text);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let avgdl = self.average_doc_length();
        let n = self.corpus.len() as f32;
        let (k1, b) = (self.options.k1, self.options.b);

        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for token in &query_tokens {
            let Some(postings) = self.postings.get(token) else {
                continue;
            };
            let df = postings.len() as f32;
            // IDF: log((N - df + 0.5) / (df + 0.5) + 1)
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let dl = self.doc_lengths[posting.doc as usize] as f32;
                let tf = posting.term_frequency as f32;
                let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl));
                *scores.entry(posting.doc).or_insert(0.0) += idf * tf_norm;
            }
        }

        let mut hits: Vec<ScoredHit> = scores
            .into_iter()
            .map(|(doc, score)| ScoredHit {
                doc,
                score,
                source: SourceKind::Lexical,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc.cmp(&b.doc))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

#[async_trait]
impl Retriever for LexicalIndex {
    fn kind(&self) -> SourceKind {
        SourceKind::Lexical
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>> {
        self.query(query, k)
    }
}
