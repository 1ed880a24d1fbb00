use crate::error::{AppError, Result};
use crate::ml::models::{Neighbor, Prediction};
use linfa::Dataset;
use linfa_nn::distance::{Distance, L2Dist};
use ndarray::{Array1, Array2, ArrayView1, Axis, Ix1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Feature matrix with one 0/1 label per row
pub type LabelledSet = Dataset<f64, usize, Ix1>;

/// K-nearest-neighbor binary classifier.
///
/// Keeps every training vector; prediction is a vote among the `k` closest
/// by Euclidean distance. Neighbors at equal distance are ordered by their
/// training row index so repeated queries always see the same neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    points: Array2<f64>,
    labels: Array1<usize>,
}

impl KnnClassifier {
    /// Retain the training partition for neighbor lookup
    pub fn fit(dataset: &LabelledSet, k: usize) -> Result<Self> {
        let classifier = Self {
            k,
            points: dataset.records().to_owned(),
            labels: dataset.targets().to_owned(),
        };
        classifier.validate().map_err(AppError::Training)?;
        Ok(classifier)
    }

    /// Check the invariants `fit` establishes.
    ///
    /// A deserialized classifier has not been through `fit`, so loaders call
    /// this before serving from it.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.k == 0 {
            return Err("Neighbor count must be at least 1".to_string());
        }
        if self.labels.len() != self.points.nrows() {
            return Err(format!(
                "Expected one label per training vector, got {} labels for {} vectors",
                self.labels.len(),
                self.points.nrows()
            ));
        }
        if self.points.nrows() < self.k {
            return Err(format!(
                "Expected n_samples >= k, got {} samples for k = {}",
                self.points.nrows(),
                self.k
            ));
        }
        if self.labels.iter().any(|&label| label > 1) {
            return Err("Labels must be 0 or 1".to_string());
        }
        Ok(())
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_samples(&self) -> usize {
        self.points.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.points.ncols()
    }

    /// Training labels in row order
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// The `n` closest training rows, nearest first
    pub fn kneighbors(&self, query: ArrayView1<f64>, n: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.n_features() {
            return Err(AppError::InternalPrediction(format!(
                "Feature vector has {} values, model expects {}",
                query.len(),
                self.n_features()
            )));
        }
        if n == 0 || n > self.n_samples() {
            return Err(AppError::InternalPrediction(format!(
                "Cannot return {} neighbors from {} samples",
                n,
                self.n_samples()
            )));
        }

        let mut ranked: Vec<(f64, usize)> = self
            .points
            .axis_iter(Axis(0))
            .map(|row| L2Dist.distance(row, query))
            .enumerate()
            .map(|(idx, distance)| (distance, idx))
            .collect();

        if ranked.iter().any(|(distance, _)| distance.is_nan()) {
            return Err(AppError::InternalPrediction(
                "Distance computation produced NaN".to_string(),
            ));
        }

        // Equal distances order by row index
        let by_rank = |a: &(f64, usize), b: &(f64, usize)| {
            a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1))
        };
        if n < ranked.len() {
            ranked.select_nth_unstable_by(n - 1, by_rank);
            ranked.truncate(n);
        }
        ranked.sort_unstable_by(by_rank);

        Ok(ranked
            .into_iter()
            .map(|(distance, index)| Neighbor {
                index,
                distance,
                label: self.labels[index],
            })
            .collect())
    }

    /// Majority vote among the `k` nearest neighbors.
    ///
    /// An even split goes to label 0.
    pub fn predict(&self, query: ArrayView1<f64>) -> Result<Prediction> {
        let neighbors = self.kneighbors(query, self.k)?;
        Ok(vote(&neighbors))
    }

    /// Predict every row of a matrix
    pub fn predict_batch(&self, x: &Array2<f64>) -> Result<Vec<Prediction>> {
        x.axis_iter(Axis(0)).map(|row| self.predict(row)).collect()
    }

    /// Fraction of correctly labelled rows
    pub fn score(&self, dataset: &LabelledSet) -> Result<f64> {
        let n = dataset.records().nrows();
        if n == 0 {
            return Err(AppError::Training("Cannot score an empty partition".to_string()));
        }

        let predictions = self.predict_batch(dataset.records())?;
        let correct = predictions
            .iter()
            .zip(dataset.targets().iter())
            .filter(|(p, t)| p.label == **t)
            .count();

        Ok(correct as f64 / n as f64)
    }
}

/// Label 1 needs a strict majority of `neighbors`
pub fn vote(neighbors: &[Neighbor]) -> Prediction {
    let hits = neighbors.iter().filter(|nb| nb.label == 1).count();
    let probability = hits as f64 / neighbors.len() as f64;
    let label = usize::from(probability > 0.5);

    Prediction { label, probability }
}
