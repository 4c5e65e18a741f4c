//! Snapshot persistence
//!
//! Each snapshot is written once as `<content-hash>.snapshot` (bincode,
//! gzip-compressed) and a `CURRENT` file names the active one. Both are
//! written to a temporary file first and renamed into place, so readers
//! never observe a half-written snapshot.

use crate::algo::CommunityMap;
use crate::graph::{BuildReport, GraphParts, KnowledgeGraph};
use crate::snapshot::GraphSnapshot;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "CURRENT";
const SNAPSHOT_EXT: &str = "snapshot";
const FORMAT_VERSION: u32 = 1;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The file decoded but does not describe a valid snapshot
    #[error("Corrupt snapshot {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Snapshot hash mismatch: expected {expected}, found {found}")]
    HashMismatch { expected: String, found: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// On-disk form of a snapshot
#[derive(Serialize, Deserialize)]
struct PersistedSnapshot {
    format_version: u32,
    content_hash: String,
    built_at: i64,
    graph: GraphParts,
    communities: CommunityMap,
    report: BuildReport,
}

/// Directory of persisted snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (creating if needed) a snapshot directory
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        debug!("Snapshot store at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, SNAPSHOT_EXT))
    }

    /// Write `snapshot` and mark it current
    pub fn save(&self, snapshot: &GraphSnapshot) -> PersistenceResult<PathBuf> {
        let path = self.snapshot_path(snapshot.content_hash());
        let persisted = PersistedSnapshot {
            format_version: FORMAT_VERSION,
            content_hash: snapshot.content_hash().to_string(),
            built_at: snapshot.built_at(),
            graph: snapshot.graph().to_parts(),
            communities: snapshot.communities().clone(),
            report: snapshot.report().clone(),
        };

        write_atomically(&path, |file| {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            bincode::serialize_into(&mut encoder, &persisted)?;
            encoder.finish()?.flush()?;
            Ok(())
        })?;
        write_atomically(&self.dir.join(CURRENT_FILE), |mut file| {
            file.write_all(snapshot.content_hash().as_bytes())?;
            Ok(())
        })?;

        info!("Persisted snapshot {} to {:?}", snapshot.content_hash(), path);
        Ok(path)
    }

    /// Hash named by `CURRENT`, if any
    pub fn current_hash(&self) -> PersistenceResult<Option<String>> {
        match std::fs::read_to_string(self.dir.join(CURRENT_FILE)) {
            Ok(hash) => {
                let hash = hash.trim().to_string();
                Ok((!hash.is_empty()).then_some(hash))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the current snapshot, if one was saved
    pub fn load_current(&self) -> PersistenceResult<Option<GraphSnapshot>> {
        match self.current_hash()? {
            Some(hash) => self.load(&hash).map(Some),
            None => Ok(None),
        }
    }

    /// Load and fully validate the snapshot stored under `hash`
    pub fn load(&self, hash: &str) -> PersistenceResult<GraphSnapshot> {
        let path = self.snapshot_path(hash);
        let corrupt = |reason: String| PersistenceError::Corrupt {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(&path)?;
        let persisted: PersistedSnapshot =
            bincode::deserialize_from(GzDecoder::new(BufReader::new(file)))?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {}", persisted.format_version)));
        }
        if persisted.content_hash != hash {
            return Err(PersistenceError::HashMismatch {
                expected: hash.to_string(),
                found: persisted.content_hash,
            });
        }

        let graph = KnowledgeGraph::from_parts(persisted.graph).map_err(|e| corrupt(e.to_string()))?;
        let snapshot = GraphSnapshot::from_parts(
            graph,
            persisted.communities,
            persisted.content_hash,
            persisted.built_at,
            persisted.report,
        )
        .map_err(|e| corrupt(e.to_string()))?;

        debug!("Loaded snapshot {} from {:?}", hash, path);
        Ok(snapshot)
    }

    /// Delete every snapshot file except the one for `keep`
    pub fn prune(&self, keep: &str) -> PersistenceResult<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_snapshot = path.extension().is_some_and(|ext| ext == SNAPSHOT_EXT);
            let is_kept = path.file_stem().is_some_and(|stem| stem == keep);
            if is_snapshot && !is_kept {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove old snapshot {:?}: {}", path, e),
                }
            }
        }
        Ok(removed)
    }
}

/// Write through a temporary sibling file, then rename over `path`.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(File) -> PersistenceResult<()>,
) -> PersistenceResult<()> {
    let tmp = path.with_extension("tmp");
    let result = File::create(&tmp)
        .map_err(PersistenceError::from)
        .and_then(write)
        .and_then(|_| std::fs::rename(&tmp, path).map_err(PersistenceError::from));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexGraphConfig;
    use crate::record::CaseRecord;
    use tempfile::TempDir;

    fn snapshot() -> GraphSnapshot {
        let cases = vec![
            CaseRecord::new("1/2565", "A").with_judge("นายสมชาย").with_case_type("อาญา"),
            CaseRecord::new("2/2565", "B")
                .with_judge("สมชาย")
                .with_case_type("อาญา")
                .with_similar("1/2565", 0.7),
        ];
        GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap()
    }

    #[test]
    fn test_save_and_load_current() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert!(store.load_current().unwrap().is_none());

        let original = snapshot();
        let path = store.save(&original).unwrap();
        assert!(path.exists());
        assert_eq!(store.current_hash().unwrap().as_deref(), Some(original.content_hash()));

        let loaded = store.load_current().unwrap().unwrap();
        assert_eq!(loaded.content_hash(), original.content_hash());
        assert_eq!(loaded.built_at(), original.built_at());
        assert_eq!(loaded.graph().edge_signature(), original.graph().edge_signature());
        assert_eq!(loaded.communities(), original.communities());
        assert_eq!(loaded.stats(), original.stats());
    }

    #[test]
    fn test_renamed_file_is_a_hash_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let original = snapshot();
        let path = store.save(&original).unwrap();

        std::fs::copy(&path, store.snapshot_path("deadbeef")).unwrap();
        assert!(matches!(
            store.load("deadbeef"),
            Err(PersistenceError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        std::fs::write(store.snapshot_path("abc"), b"not a snapshot").unwrap();
        std::fs::write(dir.path().join(CURRENT_FILE), "abc\n").unwrap();

        assert_eq!(store.current_hash().unwrap().as_deref(), Some("abc"));
        assert!(store.load_current().is_err());
    }

    #[test]
    fn test_prune_keeps_current() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let original = snapshot();
        store.save(&original).unwrap();
        std::fs::write(store.snapshot_path("old"), b"x").unwrap();

        assert_eq!(store.prune(original.content_hash()).unwrap(), 1);
        assert!(store.load(original.content_hash()).is_ok());
        assert!(!store.snapshot_path("old").exists());
    }
}
