//! Criterion benchmarks for the prediction path
//!
//! These benchmarks measure:
//! - End-to-end request handling (validation, encoding, neighbor vote)
//! - Neighbor search alone as the training set grows

use app_success_predictor::{
    config::TrainingConfig,
    ml::{PredictionService, Trainer, TrainingRecord},
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

const CATEGORIES: [&str; 6] = ["FAMILY", "GAME", "TOOLS", "SOCIAL", "FINANCE", "PRODUCTIVITY"];

fn records(n: usize) -> Vec<TrainingRecord> {
    (0..n)
        .map(|i| {
            let paid = i % 7 == 0;
            TrainingRecord {
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                size: 1.0 + ((i * 13) % 100) as f64,
                app_type: if paid { "Paid" } else { "Free" }.to_string(),
                price: if paid { 0.99 + (i % 4) as f64 } else { 0.0 },
                content_rating: if i % 3 == 0 { "Teen" } else { "Everyone" }.to_string(),
                installs: 100.0 * ((i * 7919) % 10_000) as f64,
            }
        })
        .collect()
}

fn service(n: usize) -> PredictionService {
    let config = TrainingConfig {
        k_max: 5,
        ..TrainingConfig::default()
    };
    let outcome = Trainer::new(config)
        .train(&records(n))
        .expect("training failed");
    PredictionService::new(outcome.artifacts)
}

/// Benchmark a full prediction request
fn bench_handle_request(c: &mut Criterion) {
    let service = service(2_000);
    let body = json!({
        "category": "GAME",
        "size": 95.0,
        "type": "Paid",
        "price": 2.99,
        "contentRating": "Everyone"
    });

    c.bench_function("handle_request", |b| {
        b.iter(|| service.handle(black_box(&body)).expect("prediction failed"));
    });
}

/// Benchmark neighbor search over growing training sets
fn bench_kneighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("kneighbors");

    for n in [500usize, 2_000, 8_000] {
        let service = service(n);
        let classifier = service.artifacts().classifier();
        let query = service
            .artifacts()
            .encode(&records(1)[0].features())
            .expect("encoding failed")
            .scaled;

        group.throughput(Throughput::Elements(classifier.n_samples() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &query, |b, query| {
            b.iter(|| classifier.kneighbors(black_box(query.view()), 5).expect("search failed"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_handle_request, bench_kneighbors);
criterion_main!(benches);
