use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lexgraph::{
    detect_communities, retrieve, CaseRecord, GraphSnapshot, KnowledgeGraphBuilder, LexGraphConfig,
    RetrievalParams, SeedHit,
};
use lexgraph::legal::{CaseType, LEGAL_CONCEPTS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const JUDGES: usize = 40;

/// Synthetic corpus with a fixed seed so runs are comparable
fn corpus(size: usize) -> Vec<CaseRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size)
        .map(|i| {
            let case_type = CaseType::ALL[rng.gen_range(0..CaseType::ALL.len())];
            let mut record = CaseRecord::new(format!("{}/2565", i + 1), format!("คดีที่ {}", i + 1))
                .with_case_type(case_type.label())
                .with_judge(format!("ผู้พิพากษา{}", rng.gen_range(0..JUDGES)))
                .with_article(format!("ประมวลกฎหมายอาญา มาตรา {}", rng.gen_range(1..400)));
            for _ in 0..rng.gen_range(1..4) {
                record = record.with_concept(LEGAL_CONCEPTS[rng.gen_range(0..LEGAL_CONCEPTS.len())]);
            }
            if i > 0 {
                record = record.with_similar(format!("{}/2565", rng.gen_range(0..i) + 1), rng.gen_range(0.2..1.0));
            }
            record
        })
        .collect()
}

/// Benchmark graph construction
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    group.sample_size(20);

    for size in [100, 1000, 5000].iter() {
        let cases = corpus(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let builder = KnowledgeGraphBuilder::new(Default::default());
                criterion::black_box(builder.build(&cases).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark Louvain community detection
fn bench_communities(c: &mut Criterion) {
    let mut group = c.benchmark_group("community_detection");
    group.sample_size(10);

    for size in [100, 1000, 5000].iter() {
        let (graph, _) = KnowledgeGraphBuilder::new(Default::default())
            .build(&corpus(*size))
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| criterion::black_box(detect_communities(&graph, 1.0, 3, 100).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark fused retrieval from ten seeds at increasing depth
fn bench_retrieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieve");
    let snapshot = GraphSnapshot::build(&corpus(5000), &LexGraphConfig::default()).unwrap();
    let seeds: Vec<SeedHit> = (0..10)
        .map(|i| SeedHit::new(format!("{}/2565", i * 97 + 1), 1.0 - i as f64 * 0.05))
        .collect();

    for depth in [1usize, 2, 3].iter() {
        let params = RetrievalParams::default().with_k(10).with_depth(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| criterion::black_box(retrieve(&snapshot, &seeds, &params)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_communities, bench_retrieve);
criterion_main!(benches);
