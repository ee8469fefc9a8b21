//! Brute-force in-memory vector store.
//!
//! The stand-in implementation of the `VectorIndex` seam. Real deployments
//! put an external ANN service behind the same trait; everything above the
//! seam is unchanged.

use parking_lot::RwLock;
use std::collections::HashMap;

use askdb_core::error::Result;
use askdb_core::traits::VectorIndex;
use askdb_core::types::{DocId, Meta};

/// Similarity metric, fixed at construction. Queries run under the same
/// metric the index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
    Dot,
}

struct Entry {
    vector: Vec<f32>,
    metadata: Meta,
}

pub struct MemoryVectorIndex {
    metric: Metric,
    entries: RwLock<HashMap<DocId, Entry>>,
}

impl MemoryVectorIndex {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Metadata stored alongside the vector at upsert time, if any.
    pub fn metadata(&self, id: DocId) -> Option<Meta> {
        self.entries.read().get(&id).map(|e| e.metadata.clone())
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self.metric {
            Metric::Dot => dot,
            Metric::Cosine => {
                let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot / (na * nb)
                }
            }
        }
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new(Metric::Cosine)
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn upsert(&self, id: DocId, vector: Vec<f32>, metadata: Meta) -> Result<()> {
        self.entries.write().insert(id, Entry { vector, metadata });
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(DocId, f32)>> {
        let entries = self.entries.read();
        let mut results: Vec<(DocId, f32)> = entries
            .iter()
            .map(|(id, entry)| (*id, self.similarity(vector, &entry.vector)))
            .collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
