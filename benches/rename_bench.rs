//! Rename and reconcile throughput on a long Relu chain
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sor4onnx::graph::Graph;
use sor4onnx::pattern::SearchMode;
use sor4onnx::proto::extensions::{make_node, make_tensor_value_info, make_value_info};
use sor4onnx::proto::{GraphProto, ModelProto};
use sor4onnx::reconcile::reconcile;
use sor4onnx::rename::Renamer;
use sor4onnx::transform::{GraphRewriter, RenameRule};

fn relu_chain(len: usize) -> ModelProto {
    let names: Vec<String> = (0..=len).map(|i| format!("onnx::t_{}", i)).collect();
    let node = (0..len)
        .map(|i| {
            let name = if i % 2 == 0 { String::new() } else { format!("onnx::Relu_{}", i) };
            make_node("Relu", &[&names[i]], &[&names[i + 1]], &name)
        })
        .collect();

    ModelProto {
        ir_version: 8,
        graph: Some(GraphProto {
            node,
            input: vec![make_tensor_value_info(&names[0], 1, &[1, 64])],
            output: vec![make_value_info(&names[len])],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn rename_benchmark(c: &mut Criterion) {
    let rule = RenameRule::new("onnx::", "").with_search_mode(SearchMode::Prefix);
    let mut group = c.benchmark_group("rename");

    for len in [100usize, 1_000, 10_000] {
        let model = relu_chain(len);

        group.bench_with_input(BenchmarkId::new("rewrite", len), &model, |b, model| {
            b.iter(|| {
                let mut graph = Graph::from_model(model).unwrap();
                black_box(GraphRewriter::new(&rule).rewrite(&mut graph))
            })
        });

        group.bench_with_input(BenchmarkId::new("rewrite_reconcile", len), &model, |b, model| {
            b.iter(|| {
                let mut graph = Graph::from_model(model).unwrap();
                GraphRewriter::new(&rule).rewrite(&mut graph);
                black_box(reconcile(&mut graph, model).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("renamer", len), &model, |b, model| {
            let renamer = Renamer::new(rule.clone()).model(model.clone()).non_verbose(true);
            b.iter(|| black_box(renamer.run().unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, rename_benchmark);
criterion_main!(benches);
