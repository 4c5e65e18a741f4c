//! Active snapshot management
//!
//! [`GraphService`] owns the snapshot that reads are served from. Reads clone
//! an `Arc` to the current snapshot and never wait on a rebuild. A rebuild
//! produces a new snapshot off to the side and replaces the active one in a
//! single swap; at most one rebuild runs at a time and requests arriving
//! meanwhile collapse into one follow-up rebuild.

use crate::config::{ConfigError, LexGraphConfig};
use crate::graph::{GraphError, NodeKey};
use crate::persistence::{PersistenceError, SnapshotStore};
use crate::record::CaseRecord;
use crate::retrieval::{
    explain_case, recommend, retrieve, retrieve_from_entities, Explanation, RankedCase, RetrievalOutcome,
    RetrievalParams, SeedHit,
};
use crate::search::extract_query_entities;
use crate::snapshot::{content_hash, GraphSnapshot, GraphStats, SnapshotError};
use crate::vector::VectorSource;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot build error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What a rebuild request did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RebuildOutcome {
    /// A new snapshot replaced the active one
    Swapped { content_hash: String },
    /// The input hashes to the active snapshot; nothing was built
    Unchanged,
    /// Another rebuild was running; this request will be served by its follow-up
    Coalesced,
    /// A persisted snapshot matching the input was loaded at startup
    Loaded { content_hash: String },
}

#[derive(Default)]
struct RebuildState {
    running: bool,
    /// Latest case set requested while a rebuild was running
    pending: Option<Vec<CaseRecord>>,
}

/// Marks the single rebuild slot as taken until released or dropped
struct RebuildSlot<'a> {
    state: &'a Mutex<RebuildState>,
    released: bool,
}

impl RebuildSlot<'_> {
    /// Next coalesced request, or release the slot when there is none.
    fn next_pending(&mut self) -> Option<Vec<CaseRecord>> {
        let mut state = lock(self.state);
        let next = state.pending.take();
        if next.is_none() {
            state.running = false;
            self.released = true;
        }
        next
    }
}

impl Drop for RebuildSlot<'_> {
    fn drop(&mut self) {
        if !self.released {
            lock(self.state).running = false;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct GraphService {
    config: LexGraphConfig,
    active: RwLock<Arc<GraphSnapshot>>,
    store: Option<SnapshotStore>,
    rebuild: Mutex<RebuildState>,
}

impl GraphService {
    /// Start serving `cases`.
    ///
    /// With a data directory configured, the persisted snapshot is reused
    /// when its content hash matches the input; a stale or unreadable one is
    /// replaced by a fresh build.
    pub fn open(config: LexGraphConfig, cases: &[CaseRecord]) -> ServiceResult<(Self, RebuildOutcome)> {
        config.validate()?;
        let store = config.storage.data_dir.as_ref().map(SnapshotStore::open).transpose()?;
        let expected = content_hash(cases, &config);

        let persisted = match store.as_ref().map(SnapshotStore::load_current).transpose() {
            Ok(found) => found.flatten(),
            Err(e) => {
                warn!("Ignoring unreadable persisted snapshot: {}", e);
                None
            }
        };

        let (initial, fresh) = match persisted {
            Some(snapshot) if snapshot.content_hash() == expected => (snapshot, true),
            Some(snapshot) => {
                info!(
                    "Persisted snapshot {} is stale (input hashes to {}), rebuilding",
                    snapshot.content_hash(),
                    expected
                );
                (snapshot, false)
            }
            None => (GraphSnapshot::empty(&config), false),
        };

        let service = Self {
            config,
            active: RwLock::new(Arc::new(initial)),
            store,
            rebuild: Mutex::new(RebuildState::default()),
        };

        if fresh {
            info!("Loaded persisted snapshot {}", expected);
            return Ok((service, RebuildOutcome::Loaded { content_hash: expected }));
        }
        let outcome = service.rebuild(cases.to_vec())?;
        Ok((service, outcome))
    }

    pub fn config(&self) -> &LexGraphConfig {
        &self.config
    }

    /// The snapshot reads should use
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn stats(&self) -> GraphStats {
        self.snapshot().stats()
    }

    /// Rebuild from `cases` and swap the result in.
    ///
    /// Returns [`RebuildOutcome::Coalesced`] at once when another rebuild is
    /// running; that rebuild picks up the most recent such request when it
    /// finishes. A failed build leaves the active snapshot in service.
    pub fn rebuild(&self, cases: Vec<CaseRecord>) -> ServiceResult<RebuildOutcome> {
        {
            let mut state = lock(&self.rebuild);
            if state.running {
                state.pending = Some(cases);
                info!("Rebuild already running, request coalesced");
                return Ok(RebuildOutcome::Coalesced);
            }
            state.running = true;
        }

        let mut slot = RebuildSlot {
            state: &self.rebuild,
            released: false,
        };
        let result = self.build_and_swap(&cases);
        while let Some(cases) = slot.next_pending() {
            if let Err(e) = self.build_and_swap(&cases) {
                error!("Coalesced rebuild failed: {}", e);
            }
        }
        result
    }

    /// Run [`GraphService::rebuild`] on tokio's blocking pool.
    pub fn spawn_rebuild(
        self: &Arc<Self>,
        cases: Vec<CaseRecord>,
    ) -> tokio::task::JoinHandle<ServiceResult<RebuildOutcome>> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || service.rebuild(cases))
    }

    fn build_and_swap(&self, cases: &[CaseRecord]) -> ServiceResult<RebuildOutcome> {
        let current = self.snapshot();
        let hash = content_hash(cases, &self.config);
        if hash == current.content_hash() {
            info!("Case set unchanged ({}), skipping rebuild", hash);
            return Ok(RebuildOutcome::Unchanged);
        }

        let started = Instant::now();
        let snapshot = match GraphSnapshot::build(cases, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Graph build failed, keeping snapshot {}: {}", current.content_hash(), e);
                return Err(e.into());
            }
        };

        if let Some(store) = &self.store {
            match store.save(&snapshot) {
                Ok(_) => {
                    if let Err(e) = store.prune(snapshot.content_hash()) {
                        warn!("Failed to prune old snapshots: {}", e);
                    }
                }
                Err(e) => warn!("Failed to persist snapshot {}: {}", snapshot.content_hash(), e),
            }
        }

        let content_hash = snapshot.content_hash().to_string();
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        info!(
            "Swapped in snapshot {} (previous {}) after {:?}",
            content_hash,
            current.content_hash(),
            started.elapsed()
        );
        Ok(RebuildOutcome::Swapped { content_hash })
    }

    /// Ranked cases for a query.
    ///
    /// Caller-supplied `seed_hits` are used as given. Without them, seeds come
    /// from `vectors` using `query_embedding`. When neither is available the
    /// ranking is graph-only, seeded from entities named in `query_text`, and
    /// flagged `degraded`.
    pub fn retrieve(
        &self,
        query_text: &str,
        query_embedding: Option<&[f32]>,
        seed_hits: &[SeedHit],
        params: &RetrievalParams,
        vectors: &dyn VectorSource,
    ) -> RetrievalOutcome {
        let snapshot = self.snapshot();
        if !seed_hits.is_empty() {
            return retrieve(&snapshot, seed_hits, params);
        }

        if let Some(embedding) = query_embedding.filter(|_| vectors.is_ready()) {
            match vectors.search(embedding, self.config.search.vector_top_k.max(params.k)) {
                Ok(pairs) => {
                    let seeds: Vec<SeedHit> = pairs.into_iter().map(SeedHit::from).collect();
                    return retrieve(&snapshot, &seeds, params);
                }
                Err(e) => warn!("Vector search failed, ranking from the graph only: {}", e),
            }
        }

        let entities = extract_query_entities(snapshot.graph(), query_text);
        retrieve_from_entities(&snapshot, &entities, params)
    }

    /// Cases most connected to an entity
    pub fn recommend(&self, entity: &NodeKey, limit: usize) -> ServiceResult<Vec<RankedCase>> {
        Ok(recommend(&self.snapshot(), entity, limit)?)
    }

    /// How `case_id` relates to the entities named in `query`
    pub fn explain(&self, case_id: &str, query: &str) -> ServiceResult<Explanation> {
        let snapshot = self.snapshot();
        let entities = extract_query_entities(snapshot.graph(), query);
        Ok(explain_case(&snapshot, case_id, &entities)?)
    }
}
