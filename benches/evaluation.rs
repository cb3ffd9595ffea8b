//! Evaluation throughput benchmarks
//!
//! - Datagram decoding per layout
//! - Full decode + evaluate cycle against growing rule sets
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use dhara::io::decode;
use dhara::{Channel, FilterEngine, Operator};

const DELIMITED: &[u8] = b"10,0,3.5,8,13,12,18,19";
const JSON_ARRAY: &[u8] = b"[10, 0, 3.5, 8, 13, 12, 18, 19]";
const JSON_OBJECT: &[u8] =
    br#"{"Ia": 10, "Ib": 0, "Ic": 3.5, "Id": 8, "Ie": 13, "If": 12, "Ig": 18, "Ih": 19}"#;

/// Engine with `n` rules spread over all channels and operators
fn engine_with_rules(n: usize) -> FilterEngine {
    let engine = FilterEngine::default();
    let operators = [Operator::Greater, Operator::Less, Operator::Equal];
    for i in 0..n {
        let channel = Channel::ALL[i % Channel::ALL.len()];
        let operator = operators[i % operators.len()];
        engine
            .add_filter(channel, operator, (i % 20 + 1) as u32)
            .unwrap();
    }
    engine
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, payload) in [
        ("delimited", DELIMITED),
        ("json_array", JSON_ARRAY),
        ("json_object", JSON_OBJECT),
    ] {
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_function(name, |b| b.iter(|| decode(black_box(payload), 0)));
    }
    group.finish();
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_datagram");
    for rules in [1usize, 16, 128, 1024] {
        let engine = engine_with_rules(rules);
        let mut high = false;
        group.throughput(Throughput::Elements(rules as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rules), &rules, |b, _| {
            b.iter(|| {
                // Alternate readings so every cycle produces transitions
                high = !high;
                let payload: &[u8] = if high { DELIMITED } else { b"0,0,0,0,0,0,0,0" };
                engine.process_datagram_at(black_box(payload), 0)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_process);
criterion_main!(benches);
