// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use flowforge::engine::FlowEngine;
use flowforge::history::{History, Origin};
use flowforge::layout::{LayeredLayout, LayoutDirection, LayoutEngine, NodeDims};
use flowforge::model::{Edge, EdgeId, Flow, FlowId, Node, NodeId, Position};
use flowforge::ops::Op;
use flowforge::store::MemoryStore;
use flowforge::visibility::apply_group_visibility;

// Benchmark identity (keep stable):
// - Group names: `visibility.derive`, `engine.batch`, `history.push`, `layout.layered`.
// - Case IDs must remain stable across refactors so results stay comparable over time.

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<usize>().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<u64>().ok()).unwrap_or(default)
}

fn criterion() -> Criterion {
    Criterion::default()
        .sample_size(env_usize("BENCH_SAMPLE_SIZE", 60).clamp(10, 200))
        .warm_up_time(Duration::from_secs(env_u64("BENCH_WARMUP_SECS", 3).clamp(1, 60)))
        .measurement_time(Duration::from_secs(env_u64("BENCH_MEASUREMENT_SECS", 5).clamp(1, 120)))
}

fn nid(value: String) -> NodeId {
    NodeId::new(value).expect("node id")
}

/// Deterministic layered DAG (no RNG): `layers` rows of `width` nodes, each node linked to two
/// nodes of the next row. Every `group_size` consecutive nodes of a row share a collapsed group.
fn fixture(layers: usize, width: usize, group_size: usize) -> Flow {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for layer in 0..layers {
        for column in 0..width {
            let mut node = Node::new(nid(format!("n_{layer}_{column}")), format!("Step {layer}.{column}"))
                .with_position(Position::new(column as f64 * 200.0, layer as f64 * 120.0));
            if group_size > 1 {
                node.set_parent_group_id(Some(nid(format!("g_{layer}_{}", column / group_size))));
            }
            nodes.push(node);

            if layer + 1 < layers {
                for offset in [0, 1] {
                    let target = (column + offset * 3) % width;
                    edges.push(Edge::new(
                        EdgeId::new(format!("e_{layer}_{column}_{offset}")).expect("edge id"),
                        nid(format!("n_{layer}_{column}")),
                        nid(format!("n_{}_{target}", layer + 1)),
                    ));
                }
            }
        }

        if group_size > 1 {
            for group in 0..width.div_ceil(group_size) {
                let mut node = Node::new_group(nid(format!("g_{layer}_{group}")), "Group");
                node.set_is_collapsed(Some(group % 2 == 0));
                nodes.push(node);
            }
        }
    }

    Flow::new(nodes, edges)
}

fn add_edge_ops(flow: &Flow, count: usize) -> Vec<Op> {
    let ids = flow.nodes().iter().map(|node| node.id().to_string()).collect::<Vec<_>>();
    (0..count)
        .map(|idx| Op::AddEdge {
            source: ids[(idx * 7) % ids.len()].clone(),
            target: ids[(idx * 7 + 3) % ids.len()].clone(),
            label: None,
        })
        .collect()
}

fn benches_visibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("visibility.derive");
    for (case, flow) in [("medium", fixture(10, 20, 4)), ("large", fixture(40, 50, 5))] {
        group.throughput(Throughput::Elements(flow.nodes().len() as u64));
        group.bench_function(case, |b| {
            b.iter(|| {
                let (nodes, edges) = apply_group_visibility(black_box(flow.nodes()), flow.edges());
                black_box((nodes.len(), edges.len()))
            })
        });
    }
    group.finish();
}

fn benches_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine.batch");
    let flow_id = FlowId::new("bench").expect("flow id");
    let template = fixture(10, 20, 1);

    for (case, count) in [("add_edge_1", 1), ("add_edge_10", 10), ("add_edge_200", 200)] {
        let ops = add_edge_ops(&template, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(case, |b| {
            b.iter_batched(
                || {
                    FlowEngine::new(MemoryStore::new().with_flow(flow_id.clone(), template.clone()))
                },
                |mut engine| {
                    let report = engine
                        .run_batch(&flow_id, Origin::User, black_box(&ops))
                        .expect("batch");
                    black_box(report.snapshot_seq)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn benches_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history.push");
    let flow = fixture(10, 20, 4);

    group.bench_function("dedup_hit", |b| {
        let mut history = History::new();
        history.push(&flow, Origin::Seed);
        b.iter(|| black_box(history.push(black_box(&flow), Origin::User)))
    });

    group.bench_function("fill_to_cap", |b| {
        let flows = (0..60)
            .map(|idx| {
                let mut next = flow.clone();
                next.nodes_mut()[0].set_label(format!("rev {idx}"));
                next
            })
            .collect::<Vec<_>>();
        b.iter(|| {
            let mut history = History::new();
            for next in &flows {
                history.push(next, Origin::User);
            }
            black_box(history.status())
        })
    });
    group.finish();
}

fn benches_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout.layered");
    let layout = LayeredLayout::default();
    for (case, flow) in [("medium", fixture(10, 20, 1)), ("large", fixture(40, 50, 1))] {
        group.throughput(Throughput::Elements(flow.nodes().len() as u64));
        group.bench_function(case, |b| {
            b.iter(|| {
                let placed = layout
                    .layout(
                        black_box(flow.nodes()),
                        flow.edges(),
                        LayoutDirection::TopBottom,
                        NodeDims::default(),
                    )
                    .expect("layout");
                black_box(placed.len())
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion();
    targets = benches_visibility, benches_engine, benches_history, benches_layout
}
criterion_main!(benches);
