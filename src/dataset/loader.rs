use crate::error::{AppError, Result};
use crate::ml::models::{required_columns, TrainingRecord};
use crate::ml::trainer::derive_success_labels;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read training records from a CSV file
pub fn load_training_records(path: impl AsRef<Path>) -> Result<Vec<TrainingRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| AppError::Dataset(format!("Cannot open {}: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loading training data");
    read_training_records(file)
}

/// Read training records from any CSV source with a header row.
///
/// Rows with an unusable cell are skipped; the table is rejected outright
/// if a required column is absent or nothing usable remains.
pub fn read_training_records<R: Read>(reader: R) -> Result<Vec<TrainingRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let required = required_columns();

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MissingColumns(missing));
    }

    let position = |column: &str| headers.iter().position(|h| h == column).unwrap_or_default();
    let columns = ColumnPositions {
        category: position("Category"),
        size: position("Size"),
        app_type: position("Type"),
        price: position("Price"),
        content_rating: position("Content Rating"),
        installs: position("Installs"),
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (row, result) in rdr.records().enumerate() {
        let raw = result?;
        match columns.parse(&raw) {
            Some(record) => records.push(record),
            None => {
                debug!(row = row + 1, "Skipping unparseable row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, kept = records.len(), "Skipped rows with unparseable cells");
    }
    if records.is_empty() {
        return Err(AppError::Dataset("No usable rows in training data".to_string()));
    }

    info!(rows = records.len(), "Training data loaded");
    Ok(records)
}

struct ColumnPositions {
    category: usize,
    size: usize,
    app_type: usize,
    price: usize,
    content_rating: usize,
    installs: usize,
}

impl ColumnPositions {
    fn parse(&self, raw: &csv::StringRecord) -> Option<TrainingRecord> {
        Some(TrainingRecord {
            category: text(raw.get(self.category)?)?,
            size: parse_size(raw.get(self.size)?)?,
            app_type: text(raw.get(self.app_type)?)?,
            price: parse_price(raw.get(self.price)?)?,
            content_rating: text(raw.get(self.content_rating)?)?,
            installs: parse_installs(raw.get(self.installs)?)?,
        })
    }
}

fn text(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

fn number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Install counts as exported: `"10,000+"` or plain numbers
pub fn parse_installs(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '+')
        .collect();
    number(&cleaned)
}

/// Prices with an optional leading `$`
pub fn parse_price(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    number(cell.strip_prefix('$').unwrap_or(cell))
}

/// Sizes in MB; `"19M"` is 19 and `"512k"` is 0.5
pub fn parse_size(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if let Some(mb) = cell.strip_suffix(['M', 'm']) {
        number(mb)
    } else if let Some(kb) = cell.strip_suffix(['k', 'K']) {
        number(kb).map(|kb| kb / 1024.0)
    } else {
        number(cell)
    }
}

/// Hit/flop balance of a training table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessDistribution {
    pub total: usize,
    pub hits: usize,
    pub flops: usize,
}

impl SuccessDistribution {
    pub fn from_records(records: &[TrainingRecord]) -> Self {
        let labels = derive_success_labels(records);
        let hits = labels.iter().filter(|&&l| l == 1).count();
        Self {
            total: labels.len(),
            hits,
            flops: labels.len() - hits,
        }
    }

    pub fn hit_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64 * 100.0
        }
    }

    pub fn flop_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.flops as f64 / self.total as f64 * 100.0
        }
    }
}
