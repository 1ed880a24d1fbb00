use crate::error::Result;
use crate::ml::artifacts::ModelArtifacts;
use crate::ml::models::{AppFeatures, CategoricalField, Neighbor, N_FEATURES};
use crate::ml::validation::validate_request;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Default neighbor count when inspecting a request
pub const DEFAULT_INSPECT_NEIGHBORS: usize = 6;

/// Every intermediate value the pipeline computes for one request
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub input: AppFeatures,
    /// Request field name to integer code
    pub codes: BTreeMap<String, usize>,
    pub encoded: [f64; N_FEATURES],
    pub scaled: Vec<f64>,
    pub label: usize,
    pub prediction: String,
    pub flop_probability: f64,
    pub hit_probability: f64,
    pub confidence: f64,
    pub neighbors: Vec<Neighbor>,
}

/// Run one raw request through the pipeline and keep every stage
pub fn inspect(
    artifacts: &ModelArtifacts,
    raw_request: &Value,
    n_neighbors: usize,
) -> Result<InspectionReport> {
    let input = validate_request(raw_request, artifacts.metadata())?;
    let encoded = artifacts.encode(&input)?;

    let mut codes = BTreeMap::new();
    for field in CategoricalField::ALL {
        codes.insert(
            field.request_field().to_string(),
            encoded.raw[field.feature_index()] as usize,
        );
    }

    let classifier = artifacts.classifier();
    let prediction = classifier.predict(encoded.scaled.view())?;
    let neighbors =
        classifier.kneighbors(encoded.scaled.view(), n_neighbors.min(classifier.n_samples()))?;

    Ok(InspectionReport {
        input,
        codes,
        encoded: encoded.raw,
        scaled: encoded.scaled.to_vec(),
        label: prediction.label,
        prediction: prediction.outcome().to_string(),
        flop_probability: 1.0 - prediction.probability,
        hit_probability: prediction.probability,
        confidence: prediction.confidence_percent(),
        neighbors,
    })
}

/// Four representative requests covering paid, free and teen-rated apps
pub fn default_cases() -> Vec<Value> {
    vec![
        json!({"category": "GAME", "size": 95.0, "type": "Paid", "price": 2.99, "contentRating": "Everyone"}),
        json!({"category": "PRODUCTIVITY", "size": 10.0, "type": "Free", "price": 0.0, "contentRating": "Everyone"}),
        json!({"category": "SOCIAL", "size": 50.0, "type": "Free", "price": 0.0, "contentRating": "Teen"}),
        json!({"category": "FINANCE", "size": 20.0, "type": "Free", "price": 0.0, "contentRating": "Everyone"}),
    ]
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Input: {} | size {} MB | {} | ${} | {}",
            self.input.category,
            self.input.size,
            self.input.app_type,
            self.input.price,
            self.input.content_rating
        )?;
        for field in CategoricalField::ALL {
            let key = field.request_field();
            if let Some(code) = self.codes.get(key) {
                writeln!(f, "  {} encoded: {} -> {}", field, self.input.categorical(field), code)?;
            }
        }
        writeln!(f, "  After encoding: {:?}", self.encoded)?;
        writeln!(f, "  After scaling:  {:?}", self.scaled)?;
        writeln!(f, "  Prediction: {} ({})", self.label, self.prediction)?;
        writeln!(
            f,
            "  Probabilities: [Flop: {:.3}, Hit: {:.3}]",
            self.flop_probability, self.hit_probability
        )?;
        writeln!(f, "  Confidence: {:.1}%", self.confidence)?;
        writeln!(f, "  Nearest neighbors:")?;
        for nb in &self.neighbors {
            writeln!(
                f,
                "    #{:<6} distance {:.4}  label {}",
                nb.index, nb.distance, nb.label
            )?;
        }
        Ok(())
    }
}
