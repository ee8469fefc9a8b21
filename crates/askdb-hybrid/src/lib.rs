//! askdb-hybrid
//!
//! The rank-fusion engine and the concurrent two-source retriever built on
//! it. Fusion is pure computation; the retriever owns the join point.

pub mod engine;
pub mod fusion;

pub use engine::{HybridRetriever, RetrievalOutcome};
pub use fusion::{fuse, FusionOptions};
