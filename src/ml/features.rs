use crate::error::{AppError, Result};
use crate::ml::models::{AppFeatures, CategoricalField, N_FEATURES};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Immutable mapping from a categorical value to a dense integer code.
///
/// Codes are positions in the sorted vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    field: CategoricalField,
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit on every observed value of the field
    pub fn fit<'a, I>(field: CategoricalField, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = values.into_iter().collect();
        Self {
            field,
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn field(&self) -> CategoricalField {
        self.field
    }

    /// Sorted vocabulary
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn contains(&self, value: &str) -> bool {
        self.lookup(value).is_some()
    }

    fn lookup(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .ok()
    }

    /// Integer code for a value, or `UnknownCategoryValue`
    pub fn encode(&self, value: &str) -> Result<usize> {
        self.lookup(value)
            .ok_or_else(|| AppError::UnknownCategoryValue {
                field: self.field.request_field().to_string(),
                value: value.to_string(),
                allowed: self.classes.clone(),
            })
    }
}

/// The three per-field encoders, fitted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoders {
    pub category: CategoryEncoder,
    pub app_type: CategoryEncoder,
    pub content_rating: CategoryEncoder,
}

impl FeatureEncoders {
    /// Fit all encoders over the full feature set
    pub fn fit(features: &[AppFeatures]) -> Self {
        let fit_field = |field: CategoricalField| {
            CategoryEncoder::fit(field, features.iter().map(|f| f.categorical(field)))
        };

        Self {
            category: fit_field(CategoricalField::Category),
            app_type: fit_field(CategoricalField::Type),
            content_rating: fit_field(CategoricalField::ContentRating),
        }
    }

    pub fn get(&self, field: CategoricalField) -> &CategoryEncoder {
        match field {
            CategoricalField::Category => &self.category,
            CategoricalField::Type => &self.app_type,
            CategoricalField::ContentRating => &self.content_rating,
        }
    }

    /// Replace categorical values by their codes; numeric fields pass through
    pub fn encode(&self, features: &AppFeatures) -> Result<[f64; N_FEATURES]> {
        let mut row = [0.0; N_FEATURES];
        for field in CategoricalField::ALL {
            row[field.feature_index()] = self.get(field).encode(features.categorical(field))? as f64;
        }
        row[1] = features.size;
        row[3] = features.price;
        Ok(row)
    }

    /// Encode many rows into a matrix
    pub fn encode_matrix(&self, features: &[AppFeatures]) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((features.len(), N_FEATURES));
        for (mut row, feature) in matrix.axis_iter_mut(Axis(0)).zip(features) {
            row.assign(&ArrayView1::from(&self.encode(feature)?[..]));
        }
        Ok(matrix)
    }
}

/// Per-column standardization: `(x - mean) / std`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl FeatureScaler {
    /// Fit on a matrix using the population standard deviation.
    ///
    /// Constant columns get a scale of 1 so they map to zero.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| AppError::Training("Cannot fit scaler on an empty matrix".to_string()))?;
        let scale = x
            .var_axis(Axis(0), 0.0)
            .mapv(|v| if v == 0.0 { 1.0 } else { v.sqrt() });

        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }
}

/// Encoders and scaler applied together, identically at train and inference time
#[derive(Debug, Clone, Copy)]
pub struct FeatureCodec<'a> {
    encoders: &'a FeatureEncoders,
    scaler: &'a FeatureScaler,
}

/// Intermediate and final forms of one encoded input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFeatures {
    /// Categorical codes substituted, not yet scaled
    pub raw: [f64; N_FEATURES],
    /// Classifier input
    pub scaled: Array1<f64>,
}

impl<'a> FeatureCodec<'a> {
    pub fn new(encoders: &'a FeatureEncoders, scaler: &'a FeatureScaler) -> Self {
        Self { encoders, scaler }
    }

    pub fn encode(&self, features: &AppFeatures) -> Result<EncodedFeatures> {
        let raw = self.encoders.encode(features)?;
        let scaled = self.scaler.transform_row(ArrayView1::from(&raw[..]));
        Ok(EncodedFeatures { raw, scaled })
    }
}
