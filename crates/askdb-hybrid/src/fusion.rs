//! Reciprocal-rank weighted fusion.
//!
//! Rank positions, not raw scores, drive the blend: the two sources' score
//! scales never need calibrating against each other. Given the same inputs
//! this function always produces the same output; it performs no I/O and
//! holds no state.

use std::collections::HashMap;

use askdb_core::error::{Error, Result};
use askdb_core::types::{DocId, FusedHit, ScoredHit};

/// Immutable fusion settings. Weights need not sum to 1; `Default` is the
/// equal weighting used when a caller specifies neither.
#[derive(Debug, Clone)]
pub struct FusionOptions {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    /// Rank smoothing constant `C` in `1 / (rank + C)`.
    pub smoothing: f32,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            lexical_weight: 0.5,
            semantic_weight: 0.5,
            smoothing: 60.0,
        }
    }
}

impl FusionOptions {
    pub fn new(lexical_weight: f32, semantic_weight: f32) -> Self {
        Self {
            lexical_weight,
            semantic_weight,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("lexical_weight", self.lexical_weight),
            ("semantic_weight", self.semantic_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {w}"
                )));
            }
        }
        if !self.smoothing.is_finite() || self.smoothing <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "smoothing must be > 0, got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct Accumulated {
    score: f32,
    best_rank: usize,
}

/// Blend two ranked lists into one deduplicated ranking.
///
/// A document at 1-indexed rank `r` contributes `1 / (r + C)` under its
/// source's weight; a document absent from a list contributes nothing from
/// that list, and one present in both gets the sum of its two weighted
/// contributions. Ordering: fused score descending, then best source rank,
/// then corpus insertion order. At most `k` results; two empty inputs fuse
/// to an empty list.
pub fn fuse(
    lexical: &[ScoredHit],
    semantic: &[ScoredHit],
    options: &FusionOptions,
    k: usize,
) -> Vec<FusedHit> {
    let mut fused: HashMap<DocId, Accumulated> =
        HashMap::with_capacity(lexical.len() + semantic.len());

    for (weight, hits) in [
        (options.lexical_weight, lexical),
        (options.semantic_weight, semantic),
    ] {
        for (position, hit) in hits.iter().enumerate() {
            let rank = position + 1;
            let contribution = weight / (rank as f32 + options.smoothing);
            let entry = fused.entry(hit.doc).or_insert(Accumulated {
                score: 0.0,
                best_rank: rank,
            });
            entry.score += contribution;
            entry.best_rank = entry.best_rank.min(rank);
        }
    }

    let mut hits: Vec<(DocId, Accumulated)> = fused.into_iter().collect();
    hits.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.best_rank.cmp(&b.1.best_rank))
            .then(a.0.cmp(&b.0))
    });
    hits.truncate(k);
    hits.into_iter()
        .map(|(doc, acc)| FusedHit {
            doc,
            score: acc.score,
        })
        .collect()
}
