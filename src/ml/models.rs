use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Feature columns in the order the scaler and classifier expect them
pub const FEATURE_COLUMNS: [&str; 5] = ["Category", "Size", "Type", "Price", "Content Rating"];

/// Column the success label is derived from
pub const INSTALLS_COLUMN: &str = "Installs";

/// Width of every feature vector
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// Columns the trainer refuses to run without
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = FEATURE_COLUMNS.to_vec();
    columns.push(INSTALLS_COLUMN);
    columns
}

/// The three categorical inputs, each with its own fitted vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Category,
    Type,
    ContentRating,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::Category,
        CategoricalField::Type,
        CategoricalField::ContentRating,
    ];

    /// Dataset column header
    pub fn column(&self) -> &'static str {
        match self {
            CategoricalField::Category => "Category",
            CategoricalField::Type => "Type",
            CategoricalField::ContentRating => "Content Rating",
        }
    }

    /// JSON field name on the prediction request
    pub fn request_field(&self) -> &'static str {
        match self {
            CategoricalField::Category => "category",
            CategoricalField::Type => "type",
            CategoricalField::ContentRating => "contentRating",
        }
    }

    /// Position inside the feature vector
    pub fn feature_index(&self) -> usize {
        match self {
            CategoricalField::Category => 0,
            CategoricalField::Type => 2,
            CategoricalField::ContentRating => 4,
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// One historical application row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub category: String,
    /// Size in MB
    pub size: f64,
    pub app_type: String,
    pub price: f64,
    pub content_rating: String,
    pub installs: f64,
}

impl TrainingRecord {
    pub fn features(&self) -> AppFeatures {
        AppFeatures {
            category: self.category.clone(),
            size: self.size,
            app_type: self.app_type.clone(),
            price: self.price,
            content_rating: self.content_rating.clone(),
        }
    }
}

/// The five validated attributes of an application.
///
/// Serializes with the request field names so it can be echoed back under
/// `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppFeatures {
    pub category: String,
    pub size: f64,
    #[serde(rename = "type")]
    pub app_type: String,
    pub price: f64,
    #[serde(rename = "contentRating")]
    pub content_rating: String,
}

impl AppFeatures {
    /// Raw categorical value for a field
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::Category => &self.category,
            CategoricalField::Type => &self.app_type,
            CategoricalField::ContentRating => &self.content_rating,
        }
    }
}

/// Classifier output for a single feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = Hit, 0 = Flop
    pub label: usize,

    /// Fraction of the K neighbors labelled 1
    pub probability: f64,
}

impl Prediction {
    pub fn is_hit(&self) -> bool {
        self.label == 1
    }

    /// Probability of success as a percentage with one decimal
    pub fn confidence_percent(&self) -> f64 {
        (self.probability * 1000.0).round_ties_even() / 10.0
    }

    pub fn outcome(&self) -> &'static str {
        if self.is_hit() {
            "Hit"
        } else {
            "Flop"
        }
    }
}

/// A retained training vector close to a query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Row index inside the classifier's training matrix
    pub index: usize,
    pub distance: f64,
    pub label: usize,
}

/// Descriptive metadata written next to the fitted artifacts.
///
/// Served verbatim by `GET /api/metadata`; the vocabularies double as the
/// allow-lists used to validate prediction requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub categories: Vec<String>,
    pub types: Vec<String>,
    pub content_ratings: Vec<String>,
    pub accuracy: f64,
    pub best_k: usize,

    /// Identifier shared by every artifact from the same training run
    pub model_version: uuid::Uuid,

    pub trained_at: chrono::DateTime<chrono::Utc>,
}

impl ModelMetadata {
    /// Allowed values for a categorical field
    pub fn vocabulary(&self, field: CategoricalField) -> &[String] {
        match field {
            CategoricalField::Category => &self.categories,
            CategoricalField::Type => &self.types,
            CategoricalField::ContentRating => &self.content_ratings,
        }
    }

    pub fn allows(&self, field: CategoricalField, value: &str) -> bool {
        self.vocabulary(field)
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .is_ok()
    }
}

/// Held-out accuracy for one candidate K
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KScore {
    pub k: usize,
    pub accuracy: f64,
}

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_records: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub hits: usize,
    pub flops: usize,
    pub vocabulary_sizes: BTreeMap<String, usize>,
    pub sweep: Vec<KScore>,
    pub best_k: usize,
    pub accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> ModelMetadata {
        ModelMetadata {
            categories: vec!["FAMILY".to_string(), "GAME".to_string()],
            types: vec!["Free".to_string(), "Paid".to_string()],
            content_ratings: vec!["Everyone".to_string(), "Teen".to_string()],
            accuracy: 0.75,
            best_k: 7,
            model_version: uuid::Uuid::now_v7(),
            trained_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_required_columns_order() {
        assert_eq!(
            required_columns(),
            vec!["Category", "Size", "Type", "Price", "Content Rating", "Installs"]
        );
    }

    #[test]
    fn test_categorical_field_positions() {
        for field in CategoricalField::ALL {
            assert_eq!(FEATURE_COLUMNS[field.feature_index()], field.column());
        }
    }

    #[test]
    fn test_features_serialize_with_request_names() {
        let features = AppFeatures {
            category: "GAME".to_string(),
            size: 95.0,
            app_type: "Paid".to_string(),
            price: 2.99,
            content_rating: "Everyone".to_string(),
        };

        let value = serde_json::to_value(&features).unwrap();
        assert_eq!(value["type"], "Paid");
        assert_eq!(value["contentRating"], "Everyone");
        assert_eq!(value["size"], 95.0);
    }

    #[test]
    fn test_confidence_percent_rounding() {
        let p = |probability| Prediction { label: 1, probability };
        assert_eq!(p(1.0 / 3.0).confidence_percent(), 33.3);
        assert_eq!(p(1.0 / 6.0).confidence_percent(), 16.7);
        // 6.25 rounds half-to-even
        assert_eq!(p(1.0 / 16.0).confidence_percent(), 6.2);
        assert_eq!(p(0.0).confidence_percent(), 0.0);
        assert_eq!(p(1.0).confidence_percent(), 100.0);
    }

    #[test]
    fn test_metadata_allows() {
        let metadata = sample_metadata();
        assert!(metadata.allows(CategoricalField::Category, "GAME"));
        assert!(!metadata.allows(CategoricalField::Category, "game"));
        assert!(metadata.allows(CategoricalField::Type, "Free"));
        assert!(!metadata.allows(CategoricalField::ContentRating, "Mature 17+"));
    }

    #[test]
    fn test_prediction_outcome() {
        assert_eq!(Prediction { label: 1, probability: 0.9 }.outcome(), "Hit");
        assert_eq!(Prediction { label: 0, probability: 0.1 }.outcome(), "Flop");
    }
}
