//! Benchmarks for response classification
//!
//! This benchmark measures:
//! - parsing and classifying single responses
//! - batch classification as the batch grows
//! - the decision step of the overseer state machine

use beekeepy::overseer::{parse_response, OverseerMachine, RequestPayload, RuleSet};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

fn url() -> Url {
    Url::parse("http://127.0.0.1:8090").unwrap()
}

fn batch_reply(n: usize) -> String {
    let items: Vec<Value> = (0..n)
        .map(|id| json!({"jsonrpc": "2.0", "id": id, "result": {"head_block_number": id}}))
        .collect();
    Value::Array(items).to_string()
}

fn bench_single(c: &mut Criterion) {
    let rules = RuleSet::standard();
    let request = Arc::new(RequestPayload::single("database_api.get_config", json!({})));
    let ok = r#"{"jsonrpc":"2.0","id":0,"result":{"HIVE_CHAIN_ID":"beeab0de"}}"#;
    let error = r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32003,"message":"Unable to acquire database lock"}}"#;

    let mut group = c.benchmark_group("single");
    for (name, body) in [("clean", ok), ("database_lock", error), ("unparsable", "<html>")] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let instantiated = rules.instantiate(&url(), request.clone());
                black_box(instantiated.classify(&parse_response(black_box(body))))
            })
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let rules = RuleSet::standard();
    let mut group = c.benchmark_group("batch");
    for size in [1usize, 10, 100] {
        let request = Arc::new(RequestPayload::batch(
            (0..size).map(|_| ("database_api.get_dynamic_global_properties", json!({}))),
        ));
        let body = batch_reply(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| {
                let instantiated = rules.instantiate(&url(), request.clone());
                black_box(instantiated.classify(&parse_response(body)))
            })
        });
    }
    group.finish();
}

fn bench_machine(c: &mut Criterion) {
    let rules = RuleSet::standard();
    let body = r#"{"jsonrpc":"2.0","id":0,"result":{}}"#;
    c.bench_function("machine_round_trip", |b| {
        b.iter(|| {
            let request = Arc::new(RequestPayload::single("database_api.get_version", json!({})));
            let mut machine = OverseerMachine::new(rules.instantiate(&url(), request), 5);
            machine.begin_send().unwrap();
            black_box(machine.on_response(body).unwrap())
        })
    });
}

criterion_group!(benches, bench_single, bench_batch, bench_machine);
criterion_main!(benches);
