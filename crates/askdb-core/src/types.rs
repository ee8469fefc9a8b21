//! Domain types shared by the lexical and semantic engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hasher;

use crate::error::{Error, Result};

pub type DocId = u32;
pub type Meta = HashMap<String, String>;

/// A unit of retrievable text with caller-supplied metadata.
///
/// - `id`: position in the corpus, assigned at insertion; the stable
///   identity used by every downstream ranking
/// - `fingerprint`: xxhash64 of the text, the content-hash identity
/// - `text`: non-empty UTF-8 payload
/// - `metadata`: free-form string map (source path, section headers, ...)
///
/// Documents are never mutated once added to a [`Corpus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fingerprint: u64,
    pub text: String,
    pub metadata: Meta,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Semantic,
}

/// A per-source ranked hit. `score` is engine-specific; higher is always
/// better, but scores are only comparable against hits from the same source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    pub doc: DocId,
    pub score: f32,
    pub source: SourceKind,
}

/// A fused, deduplicated hit. Scores are reciprocal-rank blends and
/// comparable across the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub doc: DocId,
    pub score: f32,
}

/// Ordered, append-only document collection.
///
/// Insertion order is identity: a document's [`DocId`] is its position, and
/// every downstream tie-break falls back to it. Built once, then shared
/// read-only between the indices and the answerer.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    docs: Vec<Document>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from `(text, metadata)` pairs, preserving order.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Meta)>,
    {
        let mut corpus = Self::new();
        for (text, metadata) in pairs {
            corpus.push(text, metadata)?;
        }
        Ok(corpus)
    }

    /// Append a document. Rejects empty text; no other schema validation.
    pub fn push(&mut self, text: String, metadata: Meta) -> Result<DocId> {
        if text.is_empty() {
            return Err(Error::EmptyDocument(self.docs.len()));
        }
        let id = self.docs.len() as DocId;
        let fingerprint = fingerprint(&text);
        self.docs.push(Document {
            id,
            fingerprint,
            text,
            metadata,
        });
        Ok(id)
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.docs.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }
}

/// xxhash64 of the raw text, the content-hash half of document identity.
pub fn fingerprint(text: &str) -> u64 {
    let mut hasher = twox_hash::XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    hasher.finish()
}
