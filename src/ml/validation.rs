//! Prediction request validation.
//!
//! Checks run in a fixed order and the first failure wins:
//! presence of every field, numeric coercion, non-negativity, then the
//! categorical vocabularies (type before category before content rating).

use crate::error::{AppError, NumberIssue, Result};
use crate::ml::models::{AppFeatures, CategoricalField, ModelMetadata};
use serde_json::{Map, Value};

/// Request fields in the order their presence is checked
pub const REQUIRED_FIELDS: [&str; 5] = ["category", "size", "type", "price", "contentRating"];

const VOCABULARY_ORDER: [CategoricalField; 3] = [
    CategoricalField::Type,
    CategoricalField::Category,
    CategoricalField::ContentRating,
];

/// Turn a raw JSON body into validated features
pub fn validate_request(body: &Value, metadata: &ModelMetadata) -> Result<AppFeatures> {
    let fields = body
        .as_object()
        .ok_or_else(|| AppError::MalformedBody("expected a JSON object".to_string()))?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
        return Err(AppError::MissingField(missing.to_string()));
    }

    let size = coerce_number(fields, "size")?;
    let price = coerce_number(fields, "price")?;

    for (field, value) in [("size", size), ("price", price)] {
        if value < 0.0 {
            return Err(AppError::InvalidNumber {
                field: field.to_string(),
                issue: NumberIssue::Negative,
            });
        }
    }

    for field in VOCABULARY_ORDER {
        check_vocabulary(fields, field, metadata)?;
    }

    Ok(AppFeatures {
        category: categorical(fields, CategoricalField::Category, metadata)?,
        size,
        app_type: categorical(fields, CategoricalField::Type, metadata)?,
        price,
        content_rating: categorical(fields, CategoricalField::ContentRating, metadata)?,
    })
}

/// Accept JSON numbers and numeric strings; anything else is not a number
fn coerce_number(fields: &Map<String, Value>, field: &str) -> Result<f64> {
    let not_numeric = || AppError::InvalidNumber {
        field: field.to_string(),
        issue: NumberIssue::NotNumeric,
    };

    let value = match &fields[field] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value.filter(|v| v.is_finite()).ok_or_else(not_numeric)
}

fn check_vocabulary(
    fields: &Map<String, Value>,
    field: CategoricalField,
    metadata: &ModelMetadata,
) -> Result<()> {
    let raw = &fields[field.request_field()];
    match raw.as_str() {
        Some(value) if metadata.allows(field, value) => Ok(()),
        Some(value) => Err(unknown(field, value.to_string(), metadata)),
        None => Err(unknown(field, raw.to_string(), metadata)),
    }
}

fn categorical(
    fields: &Map<String, Value>,
    field: CategoricalField,
    metadata: &ModelMetadata,
) -> Result<String> {
    let raw = &fields[field.request_field()];
    raw.as_str()
        .map(str::to_string)
        .ok_or_else(|| unknown(field, raw.to_string(), metadata))
}

fn unknown(field: CategoricalField, value: String, metadata: &ModelMetadata) -> AppError {
    AppError::UnknownCategoryValue {
        field: field.request_field().to_string(),
        value,
        allowed: metadata.vocabulary(field).to_vec(),
    }
}
