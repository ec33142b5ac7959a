//! Criterion benchmarks for the preset codec.
//!
//! Encodes and decodes patches of sampler units whose samples partly repeat,
//! so both hashing and deduplication are on the hot path.
//!
//! Run with: `cargo bench -p patchbay-config -- codec/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchbay_config::{PresetDocument, PresetFormat};
use patchbay_core::Value;

const SAMPLE_LEN: usize = 48_000;
const UNIT_COUNTS: &[usize] = &[1, 4, 16];

/// A rack preset with `units` samplers sharing `units / 2` distinct samples.
fn sampler_rack(units: usize) -> PresetDocument {
    let mut unit_map = Value::map();
    let mut unit_order = Vec::new();
    for i in 0..units {
        let id = format!("u{}", i + 1);
        let sample: Vec<u8> = (0..SAMPLE_LEN).map(|n| ((n + i / 2) % 251) as u8).collect();
        unit_map.insert(
            id.as_str(),
            Value::map()
                .with("typeId", "sampler")
                .with("displayName", format!("Sampler {}", i + 1))
                .with("settings", Value::map().with("gain", 1.0).with("sample", sample)),
        );
        unit_order.push(Value::from(id));
    }
    PresetDocument::new(
        "rack",
        Value::map()
            .with("unitMap", unit_map)
            .with("unitOrder", unit_order)
            .with("connections", Vec::<Value>::new()),
    )
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode");
    for &units in UNIT_COUNTS {
        let preset = sampler_rack(units);
        group.bench_with_input(BenchmarkId::from_parameter(units), &preset, |b, preset| {
            b.iter(|| black_box(preset.encode(PresetFormat::Container)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/decode");
    for &units in UNIT_COUNTS {
        let Ok(bytes) = sampler_rack(units).encode(PresetFormat::Container) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(units), &bytes, |b, bytes| {
            b.iter(|| black_box(PresetDocument::decode(black_box(bytes))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
