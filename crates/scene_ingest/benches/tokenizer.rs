mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use scene_ingest::prelude::{parse_scene_text, tokenize, SceneGraph};

/// Scene text with one transform, a few attributes and a connection per node.
fn make_scene_text(nodes: usize, seed: u64) -> String {
    let mut rng = common::scene_rng(seed);
    let mut text = String::from("//Maya ASCII 2024 scene\nrequires maya \"2024\";\n");

    for i in 0..nodes {
        let tx = (rng.next_u32() % 1000) as f32 * 0.01;
        text.push_str(&format!("createNode transform -n \"node{i}\";\n"));
        text.push_str(&format!("\tsetAttr \".t\" -type \"double3\" {tx} 0 {i};\n"));
        text.push_str("\tsetAttr -k off \".v\" yes;\n");
        if i > 0 {
            let src = rng.next_u32() as usize % i;
            text.push_str(&format!("connectAttr \"node{src}.t\" \"node{i}.r\";\n"));
        }
    }
    text
}

fn tokenizer_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("ascii/tokenize");

    for &n in &common::NODE_COUNTS {
        let text = make_scene_text(n, 0xA5C11);
        group.throughput(common::bytes_throughput(text.len()));

        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| {
                let count = tokenize(black_box(text)).count();
                black_box(count);
            });
        });
    }

    group.finish();
}

fn parser_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("ascii/parse");

    for &n in &common::NODE_COUNTS {
        let text = make_scene_text(n, 0xA5C11);
        group.throughput(common::nodes_throughput(n));

        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| {
                let mut scene = SceneGraph::new();
                let summary = parse_scene_text(black_box(text), &mut scene, &mut ());
                black_box(summary);
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = tokenizer_benches, parser_benches
}
criterion_main!(benches);
