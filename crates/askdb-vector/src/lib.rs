//! askdb-vector
//!
//! The semantic half of retrieval: an in-memory vector store standing in for
//! an external ANN service, the embedding-provider clients, and the index
//! adapter that ties them together.

pub mod index;
pub mod provider;
pub mod store;

pub use index::{SemanticIndex, SemanticOptions};
pub use provider::hashed::HashedEmbedder;
pub use provider::http::{EmbeddingClientOptions, HttpEmbeddingProvider};
pub use provider::default_provider;
pub use store::{MemoryVectorIndex, Metric};
