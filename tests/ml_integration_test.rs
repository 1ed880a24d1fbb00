/// Integration tests for the training and prediction pipeline
///
/// These tests verify:
/// - Category-relative labelling and the K sweep
/// - Persistence and reload of the artifact set
/// - Agreement between the service and a hand-driven pipeline
/// - Determinism across runs

mod common;

use app_success_predictor::{
    config::TrainingConfig,
    ml::{
        trainer::derive_success_labels, validate_request, CategoricalField, ModelArtifacts,
        PredictionMessage, PredictionService, Trainer, TrainingRecord,
    },
};
use common::*;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};

fn manual_median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

#[test]
fn test_training_report_matches_manual_labels() {
    let records = synthetic_records();
    let (_dir, _artifacts, report) = trained_fixture();

    let mut by_category: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in &records {
        by_category.entry(r.category.as_str()).or_default().push(r.installs);
    }
    let medians: HashMap<&str, f64> = by_category
        .into_iter()
        .map(|(c, v)| (c, manual_median(v)))
        .collect();
    let hits = records
        .iter()
        .filter(|r| r.installs > medians[r.category.as_str()])
        .count();

    assert_eq!(report.n_records, 60);
    assert_eq!(report.hits, hits);
    assert_eq!(report.flops, 60 - hits);
    assert_eq!(report.n_test, 12);
    assert_eq!(report.n_train, 48);
}

#[test]
fn test_sweep_and_final_accuracy_agree() {
    let (_dir, artifacts, report) = trained_fixture();

    assert_eq!(report.sweep.len(), 20);
    assert!((1..=20).contains(&report.best_k));

    let best = report.sweep[report.best_k - 1];
    assert_eq!(best.k, report.best_k);
    assert_eq!(best.accuracy, report.accuracy);
    assert!(report.sweep.iter().all(|s| s.accuracy <= best.accuracy));
    // No earlier K reached the same accuracy
    assert!(report.sweep[..report.best_k - 1]
        .iter()
        .all(|s| s.accuracy < best.accuracy));

    let metadata = artifacts.metadata();
    assert_eq!(metadata.best_k, report.best_k);
    assert_eq!(metadata.accuracy, report.accuracy);
    assert_eq!(artifacts.classifier().k(), report.best_k);
    assert_eq!(artifacts.classifier().n_samples(), 48);
}

#[test]
fn test_metadata_vocabularies_are_sorted_unique() {
    let (_dir, artifacts, report) = trained_fixture();
    let metadata = artifacts.metadata();

    assert_eq!(metadata.categories, vec!["FAMILY", "GAME", "TOOLS"]);
    assert_eq!(metadata.types, vec!["Free", "Paid"]);
    assert_eq!(metadata.content_ratings, vec!["Everyone", "Teen"]);
    assert_eq!(report.vocabulary_sizes["Category"], 3);
    assert_eq!(report.vocabulary_sizes["Content Rating"], 2);
}

#[test]
fn test_training_is_reproducible() {
    let trainer = Trainer::new(TrainingConfig::default());
    let first = trainer.train(&synthetic_records()).unwrap();
    let second = trainer.train(&synthetic_records()).unwrap();

    assert_eq!(first.report.sweep, second.report.sweep);
    assert_eq!(first.report.best_k, second.report.best_k);
    assert_eq!(first.artifacts.classifier(), second.artifacts.classifier());
    assert_eq!(first.artifacts.scaler(), second.artifacts.scaler());
    // Each run is still a distinct artifact set
    assert_ne!(
        first.artifacts.model_version(),
        second.artifacts.model_version()
    );
}

#[test]
fn test_service_matches_hand_driven_pipeline() {
    let (dir, service) = loaded_service();
    let artifacts = ModelArtifacts::load(dir.path()).unwrap();

    let response = service.handle(&game_request()).unwrap();

    let features = validate_request(&game_request(), artifacts.metadata()).unwrap();
    let raw = artifacts.encoders().encode(&features).unwrap();
    let scaled = artifacts
        .scaler()
        .transform_row(ndarray::ArrayView1::from(&raw[..]));
    let prediction = artifacts.classifier().predict(scaled.view()).unwrap();

    assert_eq!(response.success, prediction.label == 1);
    assert_eq!(response.prediction, prediction.outcome());
    assert_eq!(response.confidence, prediction.confidence_percent());
    assert_eq!(
        response.message,
        PredictionMessage::select(prediction.label, prediction.probability).text()
    );
    assert_eq!(response.details, features);
}

#[test]
fn test_repeated_requests_are_identical() {
    let (_dir, service) = loaded_service();

    let first = service.handle(&game_request()).unwrap();
    for _ in 0..5 {
        assert_eq!(service.handle(&game_request()).unwrap(), first);
    }
}

#[test]
fn test_every_vocabulary_value_predicts() {
    let (_dir, service) = loaded_service();
    let metadata = service.metadata().clone();

    for field in CategoricalField::ALL {
        for value in metadata.vocabulary(field) {
            let mut body = game_request();
            body[field.request_field()] = json!(value);
            let response = service.handle(&body).unwrap();
            assert!((0.0..=100.0).contains(&response.confidence));
            assert_eq!(response.success, response.prediction == "Hit");
        }
    }
}

#[test]
fn test_reload_preserves_predictions() {
    let (dir, artifacts, _) = trained_fixture();
    let in_memory = PredictionService::new(artifacts);
    let from_disk = PredictionService::from_dir(dir.path()).unwrap();

    let sizes = [0.0, 12.5, 48.0, 95.0];
    let types: BTreeSet<&str> = ["Free", "Paid"].into_iter().collect();
    for size in sizes {
        for app_type in &types {
            let mut body = game_request();
            body["size"] = json!(size);
            body["type"] = json!(app_type);
            body["price"] = json!(if *app_type == "Paid" { 1.99 } else { 0.0 });
            assert_eq!(
                in_memory.handle(&body).unwrap(),
                from_disk.handle(&body).unwrap()
            );
        }
    }
}

#[test]
fn test_success_labels_for_two_skewed_categories() {
    // GAME installs dwarf BEAUTY's, and both groups have an even size.
    // GAME: 9 x 500k, 2 x 1M, 9 x 5M, median 1M (two rows sit on it).
    // BEAUTY: 10 x 1k, 10 x 50k, median 25.5k.
    let mut rows: Vec<(&str, f64, usize)> = Vec::new();
    for i in 0..20 {
        let game = match i {
            0..=8 => (500_000.0, 0),
            9 | 10 => (1_000_000.0, 0),
            _ => (5_000_000.0, 1),
        };
        let beauty = if i % 2 == 0 { (1_000.0, 0) } else { (50_000.0, 1) };
        rows.push(("GAME", game.0, game.1));
        rows.push(("BEAUTY", beauty.0, beauty.1));
    }
    // Interleave so labels cannot line up by accident
    rows.rotate_left(7);

    let records: Vec<TrainingRecord> = rows
        .iter()
        .enumerate()
        .map(|(i, &(category, installs, _))| TrainingRecord {
            category: category.to_string(),
            size: 1.0 + i as f64,
            app_type: if i % 3 == 0 { "Paid" } else { "Free" }.to_string(),
            price: if i % 3 == 0 { 1.99 } else { 0.0 },
            content_rating: "Everyone".to_string(),
            installs,
        })
        .collect();
    let expected: Vec<usize> = rows.iter().map(|&(_, _, label)| label).collect();

    assert_eq!(records.len(), 40);
    let labels = derive_success_labels(&records);
    for (i, (label, want)) in labels.iter().zip(&expected).enumerate() {
        assert_eq!(label, want, "row {} ({} installs)", i, records[i].installs);
    }

    // Every 500k GAME row is a flop although it beats every BEAUTY row
    assert!(records
        .iter()
        .zip(&labels)
        .filter(|(r, _)| r.category == "GAME" && r.installs == 500_000.0)
        .all(|(_, &label)| label == 0));

    let report = Trainer::new(TrainingConfig::default())
        .train(&records)
        .unwrap()
        .report;
    assert_eq!(report.hits, expected.iter().sum::<usize>());
    assert_eq!(report.hits, 19);
}
