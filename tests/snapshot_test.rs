use lexgraph::{
    content_hash, CaseRecord, GraphService, GraphSnapshot, LexGraphConfig, RebuildOutcome, SnapshotStore,
};
use std::sync::Arc;
use tempfile::TempDir;

fn corpus() -> Vec<CaseRecord> {
    (1..=40)
        .map(|i| {
            CaseRecord::new(format!("{}/2565", i), format!("คดีลักทรัพย์ที่ {}", i))
                .with_judge(format!("นายผู้พิพากษา{}", i % 5))
                .with_case_type(if i % 3 == 0 { "แพ่ง" } else { "อาญา" })
                .with_concept(if i % 2 == 0 { "ฉ้อโกง" } else { "ยักยอก" })
                .with_article(format!("มาตรา {}", 300 + i % 7))
                .with_similar(format!("{}/2565", (i % 40) + 1), 0.5 + (i % 5) as f64 * 0.1)
        })
        .collect()
}

fn config_with_dir(dir: &TempDir) -> LexGraphConfig {
    let mut config = LexGraphConfig::default();
    config.storage.data_dir = Some(dir.path().to_path_buf());
    config
}

#[test]
fn test_rebuild_from_same_records_is_identical() {
    let config = LexGraphConfig::default();
    let mut shuffled = corpus();
    shuffled.reverse();
    shuffled.rotate_left(13);

    let first = GraphSnapshot::build(&corpus(), &config).unwrap();
    let second = GraphSnapshot::build(&shuffled, &config).unwrap();

    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(first.graph().edge_signature(), second.graph().edge_signature());
    assert_eq!(first.communities().assignments(), second.communities().assignments());
    assert_eq!(first.stats().modularity, second.stats().modularity);
}

#[test]
fn test_startup_reuses_matching_snapshot() {
    let dir = TempDir::new().unwrap();
    let cases = corpus();

    let (service, outcome) = GraphService::open(config_with_dir(&dir), &cases).unwrap();
    let built_hash = service.snapshot().content_hash().to_string();
    assert_eq!(
        outcome,
        RebuildOutcome::Swapped {
            content_hash: built_hash.clone()
        }
    );
    drop(service);

    let (reopened, outcome) = GraphService::open(config_with_dir(&dir), &cases).unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Loaded {
            content_hash: built_hash.clone()
        }
    );
    let rebuilt = GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap();
    assert_eq!(reopened.snapshot().graph().edge_signature(), rebuilt.graph().edge_signature());
    assert_eq!(reopened.snapshot().communities(), rebuilt.communities());
}

#[test]
fn test_stale_snapshot_triggers_rebuild() {
    let dir = TempDir::new().unwrap();
    let cases = corpus();
    let (service, _) = GraphService::open(config_with_dir(&dir), &cases).unwrap();
    let old_hash = service.snapshot().content_hash().to_string();
    drop(service);

    let mut changed = cases.clone();
    changed.push(CaseRecord::new("41/2565", "คดีใหม่").with_case_type("ภาษี"));
    let (service, outcome) = GraphService::open(config_with_dir(&dir), &changed).unwrap();

    let new_hash = content_hash(&changed, &config_with_dir(&dir));
    assert_ne!(old_hash, new_hash);
    assert_eq!(outcome, RebuildOutcome::Swapped { content_hash: new_hash.clone() });
    assert!(service.snapshot().case_node("41/2565").is_some());

    // Only the current snapshot is kept on disk
    let store = SnapshotStore::open(dir.path()).unwrap();
    assert_eq!(store.current_hash().unwrap(), Some(new_hash));
    assert!(store.load(&old_hash).is_err());
}

#[test]
fn test_corrupt_snapshot_is_rebuilt() {
    let dir = TempDir::new().unwrap();
    let cases = corpus();
    let hash = content_hash(&cases, &config_with_dir(&dir));
    std::fs::write(dir.path().join(format!("{}.snapshot", hash)), b"garbage").unwrap();
    std::fs::write(dir.path().join("CURRENT"), &hash).unwrap();

    let (service, outcome) = GraphService::open(config_with_dir(&dir), &cases).unwrap();
    assert!(matches!(outcome, RebuildOutcome::Swapped { .. }));
    assert_eq!(service.snapshot().content_hash(), hash);

    let store = SnapshotStore::open(dir.path()).unwrap();
    assert!(store.load(&hash).is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rebuilds_coalesce_and_readers_stay_consistent() {
    let (service, _) = GraphService::open(LexGraphConfig::default(), &[]).unwrap();
    let service = Arc::new(service);

    let requests: Vec<Vec<CaseRecord>> = (10..=40).step_by(5).map(|n| corpus()[..n].to_vec()).collect();
    let hashes: Vec<String> = requests
        .iter()
        .map(|cases| content_hash(cases, &LexGraphConfig::default()))
        .collect();

    let reader = {
        let service = Arc::clone(&service);
        tokio::task::spawn_blocking(move || {
            for _ in 0..200 {
                let snapshot = service.snapshot();
                assert!(snapshot.communities().check_against(snapshot.graph()).is_ok());
                assert_eq!(
                    snapshot.stats().node_count,
                    snapshot.graph().nodes().count()
                );
            }
        })
    };

    let handles: Vec<_> = requests.into_iter().map(|cases| service.spawn_rebuild(cases)).collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }
    reader.await.unwrap();

    assert!(outcomes.iter().any(|o| matches!(o, RebuildOutcome::Swapped { .. })));
    // Every request was either built or folded into a running rebuild
    assert!(outcomes.iter().all(|o| !matches!(o, RebuildOutcome::Loaded { .. })));
    assert!(hashes.contains(&service.snapshot().content_hash().to_string()));

    // The slot is free again once every request has returned
    let last = service.rebuild(corpus()).unwrap();
    assert!(matches!(last, RebuildOutcome::Swapped { .. } | RebuildOutcome::Unchanged));
    assert_eq!(service.snapshot().content_hash(), content_hash(&corpus(), &LexGraphConfig::default()));
}
