//! Shared fixtures for integration tests
//!
//! A small deterministic Play Store-like table, a CSV writer for it and a
//! helper that trains and persists a model into a temporary directory.

#![allow(dead_code)]

use app_success_predictor::{
    config::TrainingConfig,
    ml::{ModelArtifacts, PredictionService, Trainer, TrainingRecord, TrainingReport},
};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

pub const CATEGORIES: [&str; 3] = ["FAMILY", "GAME", "TOOLS"];

/// 60 records spread over three categories, both types and two ratings
pub fn synthetic_records() -> Vec<TrainingRecord> {
    (0..60)
        .map(|i: usize| {
            let paid = i % 4 == 0;
            TrainingRecord {
                category: CATEGORIES[i % 3].to_string(),
                size: 5.0 + ((i * 7) % 90) as f64,
                app_type: if paid { "Paid" } else { "Free" }.to_string(),
                price: if paid { 0.99 + (i % 5) as f64 } else { 0.0 },
                content_rating: if i % 5 == 0 { "Teen" } else { "Everyone" }.to_string(),
                installs: 1_000.0 * (((i * 37) % 100) + 1) as f64,
            }
        })
        .collect()
}

/// Write records the way the Play Store export formats them
pub fn write_play_store_csv(path: &Path, records: &[TrainingRecord]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "App,Category,Rating,Size,Installs,Type,Price,Content Rating").unwrap();
    for r in records {
        let price = if r.price == 0.0 {
            "0".to_string()
        } else {
            format!("${}", r.price)
        };
        writeln!(
            file,
            "{} {},{},4.1,{}M,\"{}+\",{},{},{}",
            r.category,
            r.installs,
            r.category,
            r.size,
            thousands(r.installs as u64),
            r.app_type,
            price,
            r.content_rating
        )
        .unwrap();
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Train on the synthetic table and save the artifacts to a fresh directory
pub fn trained_fixture() -> (TempDir, ModelArtifacts, TrainingReport) {
    let dir = TempDir::new().unwrap();
    let outcome = Trainer::new(TrainingConfig::default())
        .train(&synthetic_records())
        .unwrap();
    outcome.artifacts.save(dir.path()).unwrap();
    (dir, outcome.artifacts, outcome.report)
}

/// Service loaded back from disk, as the server does at startup
pub fn loaded_service() -> (TempDir, PredictionService) {
    let (dir, _, _) = trained_fixture();
    let service = PredictionService::from_dir(dir.path()).unwrap();
    (dir, service)
}

pub fn game_request() -> Value {
    json!({
        "category": "GAME",
        "size": 95.0,
        "type": "Paid",
        "price": 2.99,
        "contentRating": "Everyone"
    })
}
