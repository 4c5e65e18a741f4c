//! Vector search over case embeddings
//!
//! The retrieval core only sees [`VectorSource`]: a nearest-neighbour lookup
//! returning `(case_id, similarity)` pairs, plus an explicit readiness check
//! so callers can fall back to graph-only ranking.

pub mod index;

pub use index::{CaseVectorIndex, CosineDistance, VectorError, VectorResult};

use crate::embed::Embedder;
use crate::record::CaseRecord;
use std::collections::HashSet;
use tracing::info;

/// Nearest-neighbour lookup over case embeddings
pub trait VectorSource: Send + Sync {
    /// Whether searches can be served right now
    fn is_ready(&self) -> bool;

    /// Top `k` cases for `query`, similarity in [0, 1], best first
    fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<(String, f64)>>;
}

impl VectorSource for CaseVectorIndex {
    fn is_ready(&self) -> bool {
        !self.is_empty()
    }

    fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<(String, f64)>> {
        CaseVectorIndex::search(self, query, k)
    }
}

/// A vector source that is never ready, for deployments without an index
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVectorIndex;

impl VectorSource for NoVectorIndex {
    fn is_ready(&self) -> bool {
        false
    }

    fn search(&self, _query: &[f32], _k: usize) -> VectorResult<Vec<(String, f64)>> {
        Ok(Vec::new())
    }
}

/// Text embedded for a case: title followed by summary
pub fn case_text(record: &CaseRecord) -> String {
    format!("{} {}", record.title, record.summary)
}

/// Embed every valid case and index it under its normalised id.
///
/// Records without an id, and repeats of an id already indexed, are skipped.
pub async fn index_cases(embedder: &dyn Embedder, cases: &[CaseRecord]) -> VectorResult<CaseVectorIndex> {
    let mut seen = HashSet::with_capacity(cases.len());
    let mut ids = Vec::with_capacity(cases.len());
    let mut texts = Vec::with_capacity(cases.len());
    for (position, record) in cases.iter().enumerate() {
        if let Ok(id) = record.validate(position) {
            if seen.insert(id.clone()) {
                ids.push(id);
                texts.push(case_text(record));
            }
        }
    }

    let embeddings = if texts.is_empty() {
        Vec::new()
    } else {
        embedder.embed_batch(&texts).await?
    };
    let dimensions = embeddings.first().map_or(0, Vec::len);

    let mut index = CaseVectorIndex::new(dimensions, ids.len());
    for (id, vector) in ids.into_iter().zip(embeddings.iter()) {
        index.add(id, vector)?;
    }

    info!("Indexed {} case embeddings ({} dimensions)", index.len(), dimensions);
    Ok(index)
}
