//! Concurrent two-source retrieval with a fusion join point.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use askdb_core::error::{Error, Result};
use askdb_core::traits::Retriever;
use askdb_core::types::{FusedHit, SourceKind};

use crate::fusion::{fuse, FusionOptions};

/// What a hybrid query produced: the fused ranking, plus a flag set when one
/// source failed and the ranking came from the survivor alone.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub hits: Vec<FusedHit>,
    pub degraded: Option<SourceKind>,
}

pub struct HybridRetriever<L: Retriever, S: Retriever> {
    lexical: L,
    semantic: S,
    options: FusionOptions,
}

impl<L: Retriever, S: Retriever> HybridRetriever<L, S> {
    pub fn new(lexical: L, semantic: S, options: FusionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            lexical,
            semantic,
            options,
        })
    }

    /// Query both sources concurrently and fuse at the join point.
    ///
    /// Both indices are read-only, so the two queries share no mutable
    /// state. One source failing degrades to the survivor; both failing is
    /// an error carrying both causes.
    pub async fn search(&self, query: &str, k: usize) -> Result<RetrievalOutcome> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".to_string()));
        }

        let (lexical, semantic) = tokio::join!(
            self.lexical.retrieve(query, k),
            self.semantic.retrieve(query, k),
        );

        match (lexical, semantic) {
            (Ok(lex), Ok(sem)) => Ok(RetrievalOutcome {
                hits: fuse(&lex, &sem, &self.options, k),
                degraded: None,
            }),
            (Ok(lex), Err(e)) => {
                warn!(error = %e, "semantic retrieval failed, degrading to lexical only");
                Ok(RetrievalOutcome {
                    hits: fuse(&lex, &[], &self.options, k),
                    degraded: Some(SourceKind::Semantic),
                })
            }
            (Err(e), Ok(sem)) => {
                warn!(error = %e, "lexical retrieval failed, degrading to semantic only");
                Ok(RetrievalOutcome {
                    hits: fuse(&[], &sem, &self.options, k),
                    degraded: Some(SourceKind::Lexical),
                })
            }
            (Err(lexical), Err(semantic)) => Err(Error::Retrieval {
                lexical: Box::new(lexical),
                semantic: Box::new(semantic),
            }),
        }
    }

    /// `search`, aborted early when `cancel` fires. Partial results from
    /// whichever source finished first are discarded, not returned.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome> {
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            outcome = self.search(query, k) => outcome,
        }
    }
}
