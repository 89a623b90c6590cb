use std::time::Duration;

use criterion::{
    BenchmarkGroup, BenchmarkId, Criterion, criterion_group, criterion_main,
    measurement::WallTime,
};
use socialgraph::{
    GraphStore,
    bench_utils::{GraphShape, generate_graph, user_id},
    snapshot::{export_snapshot, import_snapshot},
};

const ER_SEED: u64 = 0x99AA;
const CLUSTER_SEED: u64 = 0x77CC;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

struct ReadyGraph {
    label: String,
    graph: GraphStore,
}

fn bench_scales() -> &'static [usize] {
    #[cfg(feature = "bench-ci")]
    {
        &[5_000, 10_000, 20_000]
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        &[10_000, 50_000, 100_000]
    }
}

fn random_cases() -> Vec<ReadyGraph> {
    bench_scales()
        .iter()
        .map(|&users| ReadyGraph {
            label: format!("er_{users}"),
            graph: generate_graph(
                GraphShape::RandomErdosRenyi {
                    edges: users.saturating_mul(5),
                },
                users,
                ER_SEED + users as u64,
            ),
        })
        .collect()
}

fn cluster_cases() -> Vec<ReadyGraph> {
    bench_scales()
        .iter()
        .map(|&users| ReadyGraph {
            label: format!("clusters_{users}"),
            graph: generate_graph(
                GraphShape::Clusters {
                    count: users / 100,
                    edges_per_user: 3,
                },
                users,
                CLUSTER_SEED + users as u64,
            ),
        })
        .collect()
}

fn configured<'a>(c: &'a mut Criterion, name: &str) -> BenchmarkGroup<'a, WallTime> {
    let mut group = c.benchmark_group(name);
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    group
}

fn bench_connectivity_line(c: &mut Criterion) {
    let mut group = configured(c, "are_connected_line");
    for &users in bench_scales() {
        let graph = generate_graph(GraphShape::Line, users, 0);
        let (first, last) = (user_id(0), user_id(users - 1));
        group.bench_function(BenchmarkId::from_parameter(users), |b| {
            b.iter(|| graph.query().are_connected(&first, &last));
        });
    }
    group.finish();
}

fn bench_components_random(c: &mut Criterion) {
    let cases = random_cases();
    let mut group = configured(c, "components_random");
    for case in &cases {
        group.bench_function(BenchmarkId::from_parameter(&case.label), |b| {
            b.iter(|| case.graph.query().find_components());
        });
    }
    group.finish();
}

fn bench_components_clusters(c: &mut Criterion) {
    let cases = cluster_cases();
    let mut group = configured(c, "components_clusters");
    for case in &cases {
        group.bench_function(BenchmarkId::from_parameter(&case.label), |b| {
            b.iter(|| case.graph.query().find_components());
        });
    }
    group.finish();
}

fn bench_suggestions_star(c: &mut Criterion) {
    let graph = generate_graph(GraphShape::Star, bench_scales()[0], 0);
    let leaf = user_id(1);
    let mut group = configured(c, "suggest_friends");
    group.bench_function("star_leaf", |b| {
        b.iter(|| graph.query().suggest_friends(&leaf));
    });
    group.bench_function("star_mutual", |b| {
        b.iter(|| graph.query().mutual_friends(&leaf, &user_id(2)));
    });
    group.finish();
}

fn bench_snapshot_import(c: &mut Criterion) {
    let cases = random_cases();
    let mut group = configured(c, "snapshot_import");
    for case in &cases {
        let snapshot = export_snapshot(&case.graph);
        group.bench_function(BenchmarkId::from_parameter(&case.label), |b| {
            b.iter(|| import_snapshot(snapshot.clone()).expect("import"));
        });
    }
    group.finish();
}

criterion_group!(
    name = algorithm_benches;
    config = Criterion::default();
    targets = bench_connectivity_line, bench_components_random, bench_components_clusters, bench_suggestions_star, bench_snapshot_import
);
criterion_main!(algorithm_benches);
