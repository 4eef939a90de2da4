//! Benchmarks for capsule decoding
//!
//! Covers the per-frame work on the host's shared records:
//! - Field decoding under native, swapped and mixed byte orders
//! - Refilling the scoring capsule and its vehicles from a stream
//! - Nearest-vehicle lookup over a full grid
//!
//! Platform: Cross-platform (synthetic records, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hudbridge::ByteOrder;
use hudbridge::capsule::{CapsuleLayout, MAX_VEHICLES, TelemetryData, decode_field};
use hudbridge::recording::{RecordingReader, RecordingWriter};
use hudbridge::test_utils::sample_game_data;
use std::hint::black_box;

fn byte_orders() -> Vec<(&'static str, ByteOrder)> {
    vec![
        ("little_endian", ByteOrder::LITTLE_ENDIAN),
        ("big_endian", ByteOrder::BIG_ENDIAN),
        ("mixed", ByteOrder::new([1, 0, 3, 2]).expect("valid permutation")),
    ]
}

fn bench_telemetry_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("telemetry_fields");
    group.throughput(Throughput::Elements(TelemetryData::FIELDS.len() as u64));

    for (name, order) in byte_orders() {
        let data = sample_game_data(order, 4);
        let bytes = data.telemetry().as_bytes().to_vec();

        group.bench_with_input(BenchmarkId::new("decode_all", name), &bytes, |b, bytes| {
            b.iter(|| {
                for field in TelemetryData::FIELDS {
                    let value = decode_field(black_box(bytes), field.offset, field.kind, &order)
                        .expect("field inside record");
                    black_box(value);
                }
            })
        });
    }

    group.finish();
}

fn bench_typed_accessors(c: &mut Criterion) {
    let data = sample_game_data(ByteOrder::BIG_ENDIAN, MAX_VEHICLES);

    c.bench_function("telemetry_hot_fields", |b| {
        b.iter(|| {
            let telemetry = black_box(data.telemetry());
            black_box((telemetry.engine_rpm(), telemetry.gear(), telemetry.fuel(), telemetry.position()))
        })
    });

    c.bench_function("nearest_vehicle_to_camera", |b| {
        b.iter(|| black_box(black_box(&data).nearest_vehicle_to_camera()))
    });
}

fn bench_scoring_refill(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring_refill");

    for vehicles in [1usize, 24, MAX_VEHICLES] {
        let source = sample_game_data(ByteOrder::LITTLE_ENDIAN, vehicles);
        let mut writer = RecordingWriter::new(Vec::new(), ByteOrder::LITTLE_ENDIAN).expect("header written");
        writer.write_scoring(source.scoring(), source.vehicles()).expect("scoring written");
        let recording = writer.finish().expect("recording flushed");
        group.throughput(Throughput::Bytes(recording.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(vehicles), &recording, |b, recording| {
            let mut target = hudbridge::LiveGameData::new(ByteOrder::LITTLE_ENDIAN);
            b.iter(|| {
                let mut reader = RecordingReader::new(black_box(recording.as_slice())).expect("valid header");
                black_box(reader.next_into(&mut target).expect("entry decodes"))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_telemetry_fields, bench_typed_accessors, bench_scoring_refill);
criterion_main!(benches);
