//! Vector index implementation using HNSW
//!
//! This module provides a wrapper around the hnsw_rs library for
//! approximate nearest neighbour search over case embeddings.

use hnsw_rs::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Vector index errors
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Case {0} is already indexed")]
    DuplicateCase(String),

    #[error("Embedding error: {0}")]
    Embed(#[from] crate::embed::EmbedError),
}

pub type VectorResult<T> = Result<T, VectorError>;

/// Cosine distance implementation for hnsw_rs
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineDistance;

impl Distance<f32> for CosineDistance {
    fn eval(&self, va: &[f32], vb: &[f32]) -> f32 {
        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;

        for (a, b) in va.iter().zip(vb.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a <= 0.0 || norm_b <= 0.0 {
            return 1.0;
        }

        // Cosine distance = 1.0 - cosine similarity
        let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
        1.0 - sim
    }
}

/// HNSW index over case embeddings, keyed by case id
pub struct CaseVectorIndex {
    dimensions: usize,
    hnsw: Hnsw<'static, f32, CosineDistance>,
    /// Case id by HNSW data id
    case_ids: Vec<String>,
    positions: HashMap<String, usize>,
}

// Implement Debug manually because Hnsw doesn't implement it
impl std::fmt::Debug for CaseVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseVectorIndex")
            .field("dimensions", &self.dimensions)
            .field("cases", &self.case_ids.len())
            .finish()
    }
}

impl CaseVectorIndex {
    /// Create an index sized for about `capacity` cases
    pub fn new(dimensions: usize, capacity: usize) -> Self {
        // HNSW parameters
        let max_elements = capacity.max(1024);
        let m = 16;
        let ef_construction = 200;

        let hnsw = Hnsw::new(m, max_elements, 16, ef_construction, CosineDistance);

        Self {
            dimensions,
            hnsw,
            case_ids: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Add the embedding of a case
    pub fn add(&mut self, case_id: impl Into<String>, vector: &[f32]) -> VectorResult<()> {
        if vector.len() != self.dimensions {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        let case_id = case_id.into();
        if self.positions.contains_key(&case_id) {
            return Err(VectorError::DuplicateCase(case_id));
        }

        let data_id = self.case_ids.len();
        self.hnsw.insert_slice((vector, data_id));
        self.positions.insert(case_id.clone(), data_id);
        self.case_ids.push(case_id);
        Ok(())
    }

    /// Nearest cases as `(case_id, similarity)`, most similar first.
    ///
    /// Similarity is cosine similarity clamped to [0, 1].
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<(String, f64)>> {
        if query.len() != self.dimensions {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }
        if k == 0 || self.case_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ef_search = (k * 2).max(32);
        let mut neighbors: Vec<(String, f64)> = self
            .hnsw
            .search(query, k, ef_search)
            .into_iter()
            .filter_map(|res| {
                let case_id = self.case_ids.get(res.d_id)?;
                let similarity = (1.0 - res.distance as f64).clamp(0.0, 1.0);
                Some((case_id.clone(), similarity))
            })
            .collect();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        neighbors.truncate(k);

        Ok(neighbors)
    }

    pub fn contains(&self, case_id: &str) -> bool {
        self.positions.contains_key(case_id)
    }

    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }

    /// Get dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}
