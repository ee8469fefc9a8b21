//! Embedding providers: a real HTTP client and a deterministic offline one.

use std::sync::Arc;

use askdb_core::error::Result;
use askdb_core::traits::EmbeddingProvider;

pub mod hashed;
pub mod http;

use hashed::HashedEmbedder;
use http::{EmbeddingClientOptions, HttpEmbeddingProvider};

/// Pick a provider for the given options. Respects
/// `ASKDB_USE_HASHED_EMBEDDINGS=1` to switch to the deterministic hashed
/// embedder for fast offline runs and tests.
pub fn default_provider(options: EmbeddingClientOptions) -> Result<Arc<dyn EmbeddingProvider>> {
    let use_hashed = std::env::var("ASKDB_USE_HASHED_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_hashed {
        tracing::info!(dim = options.dimension, "using hashed embeddings");
        return Ok(Arc::new(HashedEmbedder::new(options.dimension)));
    }
    Ok(Arc::new(HttpEmbeddingProvider::new(options)?))
}
