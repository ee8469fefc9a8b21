//! Retrieval-augmented answering: fuse, then ground a generation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use askdb_core::error::{Error, Result};
use askdb_core::retry::{retry_with_backoff, RetryPolicy};
use askdb_core::traits::{LanguageModel, Retriever};
use askdb_core::types::{Corpus, DocId, FusedHit, Meta, SourceKind};
use askdb_hybrid::{HybridRetriever, RetrievalOutcome};

/// A passage handed to the model and returned to the caller for citation.
#[derive(Debug, Clone)]
pub struct Passage {
    pub doc: DocId,
    pub text: String,
    pub metadata: Meta,
    pub score: f32,
}

/// The generated answer plus its supporting evidence.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<Passage>,
    /// Set when one retrieval source failed and the passages came from the
    /// survivor alone.
    pub degraded: Option<SourceKind>,
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// Fused passages handed to the model.
    pub top_k: usize,
    /// Retry schedule for the generation call.
    pub retry: RetryPolicy,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct Answerer<L: Retriever, S: Retriever, M: LanguageModel> {
    corpus: Arc<Corpus>,
    retriever: HybridRetriever<L, S>,
    model: M,
    options: AnswerOptions,
}

impl<L: Retriever, S: Retriever, M: LanguageModel> Answerer<L, S, M> {
    pub fn new(
        corpus: Arc<Corpus>,
        retriever: HybridRetriever<L, S>,
        model: M,
        options: AnswerOptions,
    ) -> Result<Self> {
        if options.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be positive".to_string()));
        }
        Ok(Self {
            corpus,
            retriever,
            model,
            options,
        })
    }

    /// Retrieve, fuse, and generate a grounded answer.
    ///
    /// Retrieval degradation (one source down) is tolerated and recorded on
    /// the answer; both sources failing, or the model failing after retries,
    /// surface as errors.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let outcome = self.retriever.search(question, self.options.top_k).await?;
        self.answer_from(question, outcome).await
    }

    /// `ask`, aborted when `cancel` fires; the model call is not issued
    /// after cancellation.
    pub async fn ask_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            answer = self.ask(question) => answer,
        }
    }

    async fn answer_from(&self, question: &str, outcome: RetrievalOutcome) -> Result<Answer> {
        if let Some(source) = outcome.degraded {
            warn!(?source, "answering from degraded retrieval");
        }

        let passages = self.resolve(&outcome.hits);
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();

        let text = retry_with_backoff(&self.options.retry, "generation", || {
            self.model.generate(&texts, question)
        })
        .await?;

        info!(
            passages = passages.len(),
            degraded = ?outcome.degraded,
            "generated grounded answer"
        );
        Ok(Answer {
            text,
            passages,
            degraded: outcome.degraded,
        })
    }

    fn resolve(&self, hits: &[FusedHit]) -> Vec<Passage> {
        hits.iter()
            .filter_map(|hit| {
                self.corpus.get(hit.doc).map(|doc| Passage {
                    doc: doc.id,
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }
}
