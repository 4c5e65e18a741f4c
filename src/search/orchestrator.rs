//! Query dispatch and result merging

use super::intent::{classify, extract_query_entities};
use super::strategy::StrategyContext;
use super::{rank_hits, SearchHit, SearchRequest, SearchResponse, StrategyFailure};
use crate::config::{RetrievalConfig, SearchConfig};
use crate::embed::Embedder;
use crate::retrieval::RetrievalParams;
use crate::snapshot::GraphSnapshot;
use crate::vector::VectorSource;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Classifies queries and runs the matching strategies.
///
/// Query embeddings are cached by query text.
pub struct SearchOrchestrator {
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
    retrieval: RetrievalConfig,
    cache: Option<Mutex<LruCache<String, Vec<f32>>>>,
}

impl SearchOrchestrator {
    pub fn new(embedder: Arc<dyn Embedder>, config: SearchConfig, retrieval: RetrievalConfig) -> Self {
        let cache = NonZeroUsize::new(config.embedding_cache_size).map(|size| Mutex::new(LruCache::new(size)));
        Self {
            embedder,
            config,
            retrieval,
            cache,
        }
    }

    /// Answer `request` against one snapshot.
    ///
    /// Never fails: strategies that error are listed in `failed_strategies`
    /// and contribute no hits.
    pub async fn search(
        &self,
        snapshot: &GraphSnapshot,
        vectors: &dyn VectorSource,
        request: &SearchRequest,
    ) -> SearchResponse {
        let k = request.k.unwrap_or(self.config.default_k);
        let params = RetrievalParams::from_config(&self.retrieval, k);
        let intent = classify(snapshot.graph(), &request.query);
        let entities = extract_query_entities(snapshot.graph(), &request.query);
        debug!("Query classified as {} with {} entities", intent, entities.len());

        let plan = request.plan(&intent);

        let mut merged: HashMap<String, SearchHit> = HashMap::new();
        let mut failed_strategies = Vec::new();
        let mut partial = false;
        let mut degraded = false;
        let mut embedding: Option<Option<Vec<f32>>> = None;

        for strategy in &plan {
            if merged.len() >= k {
                break;
            }
            if strategy.needs_embedding() && embedding.is_none() {
                embedding = Some(self.embed_query(&request.query).await);
            }

            let ctx = StrategyContext {
                snapshot,
                embedding: embedding.as_ref().and_then(|e| e.as_deref()),
                vectors,
                entities: &entities,
                params: &params,
                vector_top_k: self.config.vector_top_k.max(k),
            };
            match strategy.attempt(&ctx) {
                Ok(found) => {
                    partial |= found.partial;
                    degraded |= found.degraded;
                    for hit in found.hits {
                        match merged.get(&hit.case_id) {
                            Some(existing) if !hit.outranks(existing) => {}
                            _ => {
                                merged.insert(hit.case_id.clone(), hit);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Search strategy {} failed: {}", strategy.name(), e);
                    failed_strategies.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut hits: Vec<SearchHit> = merged.into_values().collect();
        rank_hits(&mut hits);
        hits.truncate(k);

        SearchResponse {
            hits,
            intent,
            partial,
            degraded,
            failed_strategies,
        }
    }

    /// Embedding for `query`, from the cache when possible.
    ///
    /// A provider failure is logged and yields `None`.
    pub async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let key = query.trim().to_string();
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&key) {
                return Some(hit.clone());
            }
        }

        match self.embedder.embed(&key).await {
            Ok(vector) => {
                if let Some(cache) = &self.cache {
                    cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .put(key, vector.clone());
                }
                Some(vector)
            }
            Err(e) => {
                warn!("Failed to embed query: {}", e);
                None
            }
        }
    }

    pub fn cached_embeddings(&self) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.lock().unwrap_or_else(PoisonError::into_inner).len())
    }
}
