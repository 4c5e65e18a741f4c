use lexgraph::embed::HashingEmbedder;
use lexgraph::vector::{index_cases, VectorSource};
use lexgraph::{retrieve, CaseRecord, FusionWeights, GraphSnapshot, LexGraphConfig, RetrievalParams, SeedHit};
use std::collections::HashSet;
use std::time::Duration;

fn snapshot(cases: &[CaseRecord]) -> GraphSnapshot {
    GraphSnapshot::build(cases, &LexGraphConfig::default()).unwrap()
}

#[tokio::test]
async fn test_shared_judge_surfaces_case_outside_vector_hits() {
    let cases = vec![
        CaseRecord::new("100/2565", "จำเลยลักทรัพย์ในเคหสถานเวลากลางคืน")
            .with_judge("นายสมชาย")
            .with_case_type("อาญา"),
        CaseRecord::new("200/2565", "โจทก์ฟ้องเรียกค่าเสียหายจากการผิดสัญญาเช่า")
            .with_judge("สมชาย")
            .with_case_type("อาญา"),
        CaseRecord::new("300/2565", "คำร้องขอให้ศาลสั่งจัดการมรดก")
            .with_judge("สมศรี")
            .with_case_type("แพ่ง"),
    ];
    let snap = snapshot(&cases);
    let embedder = HashingEmbedder::new(256);
    let index = index_cases(&embedder, &cases).await.unwrap();

    // Only the nearest case becomes a seed
    let query = embedder.embed_text("ลักทรัพย์ในเคหสถาน");
    let seeds: Vec<SeedHit> = index.search(&query, 1).unwrap().into_iter().map(SeedHit::from).collect();
    assert_eq!(seeds[0].case_id, "100/2565");

    let outcome = retrieve(&snap, &seeds, &RetrievalParams::default());
    let b = outcome.get("200/2565").expect("case sharing the judge is retrieved");
    assert!(b.breakdown.graph_score > 0.0);
    assert_eq!(b.breakdown.vector_score, 0.0);
    assert!(outcome.get("300/2565").map_or(true, |c| c.breakdown.graph_score == 0.0));
}

#[test]
fn test_edgeless_graph_keeps_vector_order() {
    let cases = vec![
        CaseRecord::new("1/2565", "a"),
        CaseRecord::new("2/2565", "b"),
        CaseRecord::new("3/2565", "c"),
    ];
    let snap = snapshot(&cases);
    assert_eq!(snap.graph().edge_count(), 0);

    let seeds = vec![
        SeedHit::new("3/2565", 0.9),
        SeedHit::new("1/2565", 0.7),
        SeedHit::new("2/2565", 0.5),
    ];
    let outcome = retrieve(&snap, &seeds, &RetrievalParams::default());

    assert_eq!(outcome.case_ids(), vec!["3/2565", "1/2565", "2/2565"]);
    for hit in &outcome.hits {
        assert_eq!(hit.breakdown.graph_score, 0.0);
        assert_eq!(hit.breakdown.community_bonus, 0.0);
    }
}

#[test]
fn test_results_never_repeat_a_case() {
    let cases: Vec<CaseRecord> = (1..=30)
        .map(|i| {
            CaseRecord::new(format!("{}/2565", i), "ลักทรัพย์ ฉ้อโกง")
                .with_judge(format!("ผู้พิพากษา{}", i % 3))
                .with_case_type(if i % 2 == 0 { "อาญา" } else { "แพ่ง" })
                .with_similar(format!("{}/2565", i % 30 + 1), 0.8)
        })
        .collect();
    let snap = snapshot(&cases);
    let seeds: Vec<SeedHit> = ["1/2565", "2/2565", "1/2565", "7/2565", "99/2565"]
        .iter()
        .map(|id| SeedHit::new(*id, 0.6))
        .collect();

    let outcome = retrieve(&snap, &seeds, &RetrievalParams::default().with_k(50));
    let unique: HashSet<&str> = outcome.case_ids().into_iter().collect();
    assert_eq!(unique.len(), outcome.hits.len());
    assert!(outcome.hits.len() > 5);
}

#[test]
fn test_raising_beta_favours_graph_connected_candidate() {
    let cases = vec![
        CaseRecord::new("1/2565", "a").with_judge("สมชาย"),
        CaseRecord::new("2/2565", "b").with_judge("สมชาย"),
        CaseRecord::new("3/2565", "c"),
    ];
    let snap = snapshot(&cases);
    let seeds = vec![
        SeedHit::new("1/2565", 0.9),
        SeedHit::new("2/2565", 0.4),
        SeedHit::new("3/2565", 0.4),
    ];

    let mut previous_gap = f64::NEG_INFINITY;
    for (alpha, beta) in [(0.8, 0.1), (0.6, 0.3), (0.4, 0.5), (0.2, 0.7)] {
        let params = RetrievalParams::default().with_weights(FusionWeights::new(alpha, beta, 0.1));
        assert!(params.weights.is_normalized());
        let outcome = retrieve(&snap, &seeds, &params);

        let connected = outcome.get("2/2565").unwrap();
        let isolated = outcome.get("3/2565").unwrap();
        assert!(connected.breakdown.graph_score > 0.0);
        assert_eq!(isolated.breakdown.graph_score, 0.0);

        let gap = connected.final_score - isolated.final_score;
        assert!(gap > previous_gap);
        previous_gap = gap;
    }
}

#[test]
fn test_traversal_work_is_bounded_on_cycles() {
    // Ring of 200 cases, each similar to the next
    let cases: Vec<CaseRecord> = (0..200)
        .map(|i| CaseRecord::new(format!("{}/2565", i + 1), "x").with_similar(format!("{}/2565", (i + 1) % 200 + 1), 0.9))
        .collect();
    let snap = snapshot(&cases);

    let outcome = retrieve(
        &snap,
        &[SeedHit::new("1/2565", 1.0)],
        &RetrievalParams::default().with_k(200).with_depth(3),
    );

    // depth 3 over degree 2: at most 1 + 2 + 2 expansions, 6 cases reached
    assert!(outcome.visited <= 5);
    let reached = outcome.hits.iter().filter(|h| h.breakdown.graph_score > 0.0).count();
    assert_eq!(reached, 6);
    assert!(!outcome.partial);
}

#[test]
fn test_zero_time_budget_returns_partial_result() {
    let cases = vec![
        CaseRecord::new("1/2565", "a").with_judge("สมชาย"),
        CaseRecord::new("2/2565", "b").with_judge("สมชาย"),
    ];
    let snap = snapshot(&cases);
    let params = RetrievalParams {
        time_budget: Some(Duration::ZERO),
        ..RetrievalParams::default()
    };

    let outcome = retrieve(&snap, &[SeedHit::new("1/2565", 0.8)], &params);
    assert!(outcome.partial);
    assert_eq!(outcome.hits[0].case_id, "1/2565");
}
