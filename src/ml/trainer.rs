use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::artifacts::ModelArtifacts;
use crate::ml::classifier::{vote, KnnClassifier, LabelledSet};
use crate::ml::features::{FeatureEncoders, FeatureScaler};
use crate::ml::models::{
    AppFeatures, CategoricalField, KScore, ModelMetadata, TrainingRecord, TrainingReport,
};
use linfa::Dataset;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Median of a non-empty slice; mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Median installs per category
pub fn category_medians(records: &[TrainingRecord]) -> HashMap<String, f64> {
    let mut installs: HashMap<&str, Vec<f64>> = HashMap::new();
    for record in records {
        installs
            .entry(record.category.as_str())
            .or_default()
            .push(record.installs);
    }

    installs
        .into_iter()
        .filter_map(|(category, values)| median(&values).map(|m| (category.to_string(), m)))
        .collect()
}

/// Success = 1 when installs exceed the median of the record's own category
pub fn derive_success_labels(records: &[TrainingRecord]) -> Vec<usize> {
    let medians = category_medians(records);
    records
        .iter()
        .map(|record| {
            let threshold = medians[record.category.as_str()];
            usize::from(record.installs > threshold)
        })
        .collect()
}

/// Shuffle rows with a seeded RNG and hold out `ceil(n * test_size)` of them
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<usize>,
    test_size: f64,
    seed: u64,
) -> Result<(LabelledSet, LabelledSet)> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(AppError::Training(format!(
            "test_size must be in [0, 1), got {}",
            test_size
        )));
    }

    let n_samples = x.nrows();
    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    let n_train = n_samples - n_test;

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (train_idx, test_idx) = indices.split_at(n_train);
    let partition = |idx: &[usize]| {
        Dataset::new(x.select(Axis(0), idx), y.select(Axis(0), idx))
    };

    Ok((partition(train_idx), partition(test_idx)))
}

/// Offline job turning labelled records into a matched artifact set
pub struct Trainer {
    config: TrainingConfig,
}

/// Everything one training run produces
pub struct TrainingOutcome {
    pub artifacts: ModelArtifacts,
    pub report: TrainingReport,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit encoders, scaler and classifier, sweeping K for the best held-out accuracy
    pub fn train(&self, records: &[TrainingRecord]) -> Result<TrainingOutcome> {
        if self.config.k_min == 0 || self.config.k_min > self.config.k_max {
            return Err(AppError::Training(format!(
                "Invalid K range {}..={}",
                self.config.k_min, self.config.k_max
            )));
        }

        info!(records = records.len(), "Defining success metric");
        let labels = derive_success_labels(records);
        let hits = labels.iter().filter(|&&l| l == 1).count();
        let flops = labels.len() - hits;
        info!(hits, flops, "Success distribution");

        let features: Vec<AppFeatures> = records.iter().map(TrainingRecord::features).collect();

        let encoders = FeatureEncoders::fit(&features);
        let mut vocabulary_sizes = BTreeMap::new();
        for field in CategoricalField::ALL {
            let size = encoders.get(field).classes().len();
            info!(column = field.column(), unique_values = size, "Encoded categorical feature");
            vocabulary_sizes.insert(field.column().to_string(), size);
        }

        let encoded = encoders.encode_matrix(&features)?;
        let scaler = FeatureScaler::fit(&encoded)?;
        let scaled = scaler.transform(&encoded);

        let (train, test) = train_test_split(
            &scaled,
            &Array1::from_vec(labels),
            self.config.test_size,
            self.config.seed,
        )?;
        let n_train = train.records().nrows();
        let n_test = test.records().nrows();
        info!(n_train, n_test, "Split dataset");

        if n_train < 2 || n_test == 0 {
            return Err(AppError::Training(format!(
                "Not enough records to train: {} train / {} test",
                n_train, n_test
            )));
        }

        let sweep = self.sweep_k(&train, &test)?;
        let best = select_best_k(&sweep)
            .ok_or_else(|| AppError::Training("No candidate K could be evaluated".to_string()))?;
        info!(best_k = best.k, "Optimal K found");

        let classifier = KnnClassifier::fit(&train, best.k)?;
        let accuracy = classifier.score(&test)?;
        info!(accuracy = %format!("{:.1}%", accuracy * 100.0), "Final model trained");

        let metadata = ModelMetadata {
            categories: encoders.category.classes().to_vec(),
            types: encoders.app_type.classes().to_vec(),
            content_ratings: encoders.content_rating.classes().to_vec(),
            accuracy,
            best_k: best.k,
            model_version: uuid::Uuid::now_v7(),
            trained_at: chrono::Utc::now(),
        };

        let report = TrainingReport {
            n_records: records.len(),
            n_train,
            n_test,
            hits,
            flops,
            vocabulary_sizes,
            sweep,
            best_k: best.k,
            accuracy,
        };

        Ok(TrainingOutcome {
            artifacts: ModelArtifacts::new(encoders, scaler, classifier, metadata)?,
            report,
        })
    }

    /// Held-out accuracy for every K in range that the train partition can support.
    ///
    /// Neighbors are ranked once per test row; each K votes over a prefix of
    /// that ranking, which matches fitting a classifier per K.
    fn sweep_k(
        &self,
        train: &LabelledSet,
        test: &LabelledSet,
    ) -> Result<Vec<KScore>> {
        let k_max = self.config.k_max.min(train.records().nrows());
        if self.config.k_min > k_max {
            return Ok(Vec::new());
        }

        let ranker = KnnClassifier::fit(train, k_max)?;
        let rankings = test
            .records()
            .axis_iter(Axis(0))
            .map(|row| ranker.kneighbors(row, k_max))
            .collect::<Result<Vec<_>>>()?;

        let n_test = test.records().nrows() as f64;
        Ok((self.config.k_min..=k_max)
            .map(|k| {
                let correct = rankings
                    .iter()
                    .zip(test.targets().iter())
                    .filter(|(neighbors, target)| vote(&neighbors[..k]).label == **target)
                    .count();
                let accuracy = correct as f64 / n_test;
                debug!(k, accuracy, "Evaluated candidate");
                KScore { k, accuracy }
            })
            .collect())
    }
}

/// First K reaching the maximum accuracy; later equal scores never replace it
pub fn select_best_k(sweep: &[KScore]) -> Option<KScore> {
    let mut best: Option<KScore> = None;
    for score in sweep {
        match best {
            Some(current) if score.accuracy <= current.accuracy => {}
            _ => best = Some(*score),
        }
    }
    best
}
