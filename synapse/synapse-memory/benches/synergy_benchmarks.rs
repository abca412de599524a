//! Performance benchmarks for synergy writes, searches and graph updates.

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeSet;
use std::hint::black_box;
use std::sync::Arc;
use synapse_core::config::InitialStrengths;
use synapse_memory::graph::{activated_synergies, synergy_boost};
use synapse_memory::prelude::*;
use tokio::runtime::Runtime;

fn create_manager(max_parallel_layers: usize) -> CognitiveMemoryManager {
    let config = SynergyConfig {
        max_parallel_layers,
        ..SynergyConfig::default()
    };
    CognitiveMemoryManager::with_config(Arc::new(InMemoryStore::new()), config)
        .expect("valid config")
}

fn bench_write(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let manager = create_manager(4);
    let layers = [MemoryType::Semantic, MemoryType::Episodic, MemoryType::Working];

    c.bench_function("add_with_synergy_3_layers", |b| {
        b.to_async(&rt).iter(|| async {
            manager
                .add_with_synergy(
                    WriteRequest::new(black_box("Patient shows symptoms of hypertension"), "bench")
                        .with_memory_types(layers),
                )
                .await
                .expect("write failed")
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_with_synergy");

    for parallel in [1usize, 3, 7] {
        let manager = create_manager(parallel);
        rt.block_on(async {
            for i in 0..200 {
                manager
                    .add_with_synergy(
                        WriteRequest::new(format!("observation {} about blood pressure", i), "bench")
                            .with_memory_types(MemoryType::ALL),
                    )
                    .await
                    .expect("seed write failed");
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(parallel), &parallel, |b, _| {
            b.to_async(&rt).iter(|| async {
                manager
                    .search_with_synergy(
                        SearchRequest::new(black_box("blood pressure"), "bench")
                            .with_memory_types(MemoryType::ALL),
                    )
                    .await
                    .expect("search failed")
            })
        });
    }

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let graph = SynergyGraph::new(&InitialStrengths::default(), 1e-5);
    let touched: BTreeSet<MemoryType> = [MemoryType::Working, MemoryType::Semantic, MemoryType::Episodic]
        .into_iter()
        .collect();

    c.bench_function("reinforce_activated_edges", |b| {
        b.iter(|| {
            let now = Utc::now();
            for synergy in activated_synergies(black_box(&touched)) {
                graph.reinforce(synergy, 0.05, now);
            }
        })
    });

    let edges = graph.active_edges(0.4, Utc::now());
    c.bench_function("synergy_boost", |b| {
        b.iter(|| synergy_boost(black_box(MemoryType::Semantic), &touched, &edges))
    });
}

criterion_group!(benches, bench_write, bench_search, bench_graph);
criterion_main!(benches);
