use std::sync::Arc;

use carta_collab::{BroadcastHub, FeatureEvent, FeatureId, FeatureStore, Geometry};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

fn line_of(points: usize) -> Geometry {
    Geometry::line_string((0..points).map(|i| [i as f64, i as f64]).collect())
}

fn bench_event_encode(c: &mut Criterion) {
    let event = FeatureEvent::created(FeatureId::from("bench"), line_of(16));

    c.bench_function("event_encode_16pt_line", |b| {
        b.iter(|| {
            black_box(black_box(&event).encode().unwrap());
        })
    });
}

fn bench_event_decode(c: &mut Criterion) {
    let event = FeatureEvent::created(FeatureId::from("bench"), line_of(16));
    let frame = event.encode().unwrap();

    c.bench_function("event_decode_16pt_line", |b| {
        b.iter(|| {
            black_box(FeatureEvent::decode(black_box(&frame)).unwrap());
        })
    });
}

fn bench_store_upsert_replace(c: &mut Criterion) {
    let mut store = FeatureStore::new();
    let id = FeatureId::from("bench");
    store.upsert(id.clone(), Geometry::point(0.0, 0.0));

    c.bench_function("store_upsert_replace", |b| {
        b.iter(|| {
            store.upsert(black_box(id.clone()), black_box(Geometry::point(1.0, 2.0)));
        })
    });
}

fn bench_store_snapshot(c: &mut Criterion) {
    let mut store = FeatureStore::new();
    for i in 0..100 {
        store.upsert(FeatureId::from(format!("f{i}").as_str()), line_of(8));
    }

    c.bench_function("store_snapshot_100", |b| {
        b.iter(|| {
            black_box(store.snapshot());
        })
    });
}

fn bench_hub_fan_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("hub_fan_out_100_connections", |b| {
        b.iter(|| {
            rt.block_on(async {
                let hub = BroadcastHub::new(1024);

                let mut receivers = Vec::new();
                for _ in 0..100 {
                    receivers.push(hub.attach(Uuid::new_v4()).await);
                }

                let frame = Arc::new(String::from(r#"{"event":"deleted","id":"bench"}"#));
                black_box(hub.broadcast_encoded(black_box(frame)));
            });
        })
    });
}

criterion_group!(
    benches,
    bench_event_encode,
    bench_event_decode,
    bench_store_upsert_replace,
    bench_store_snapshot,
    bench_hub_fan_out
);
criterion_main!(benches);
