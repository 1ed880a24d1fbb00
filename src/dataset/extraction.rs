use crate::error::{AppError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of one deduplication pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns: usize,
}

impl DedupReport {
    pub fn duplicates_removed(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// First candidate path that exists
pub fn locate_dataset<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf> {
    for candidate in candidates {
        let path: &Path = candidate.as_ref();
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
    }

    let tried: Vec<String> = candidates
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect();
    Err(AppError::Dataset(format!(
        "Dataset not found. Tried: {}",
        tried.join(", ")
    )))
}

/// Copy a CSV dropping full-row duplicates, keeping first occurrences in order
pub fn deduplicate(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<DedupReport> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(input).map_err(|e| {
            AppError::Dataset(format!("Cannot open {}: {}", input.display(), e))
        })?);
    let headers = reader.headers()?.clone();

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut unique = Vec::new();
    let mut rows_in = 0usize;
    for result in reader.records() {
        let record = result?;
        rows_in += 1;
        let key: Vec<String> = record.iter().map(str::to_string).collect();
        if seen.insert(key) {
            unique.push(record);
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(output)?;
    writer.write_record(&headers)?;
    for record in &unique {
        writer.write_record(record)?;
    }
    writer.flush()?;

    let report = DedupReport {
        rows_in,
        rows_out: unique.len(),
        columns: headers.len(),
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        "Deduplicated dataset"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_dataset_returns_first_existing() {
        let dir = TempDir::new().unwrap();
        let second = dir.path().join("b.csv");
        let third = dir.path().join("c.csv");
        std::fs::write(&second, "x\n").unwrap();
        std::fs::write(&third, "x\n").unwrap();

        let found = locate_dataset(&[dir.path().join("a.csv"), second.clone(), third]).unwrap();
        assert_eq!(found, second);
    }

    #[test]
    fn test_locate_dataset_lists_candidates() {
        let err = locate_dataset(&["nope/one.csv", "nope/two.csv"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope/one.csv"));
        assert!(message.contains("nope/two.csv"));
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("clean.csv");
        std::fs::write(
            &input,
            "App,Category,Installs\n\
             A,GAME,\"1,000+\"\n\
             B,TOOLS,10+\n\
             A,GAME,\"1,000+\"\n\
             A,GAME,500+\n",
        )
        .unwrap();

        let report = deduplicate(&input, &output).unwrap();
        assert_eq!(
            report,
            DedupReport {
                rows_in: 4,
                rows_out: 3,
                columns: 3
            }
        );
        assert_eq!(report.duplicates_removed(), 1);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "App,Category,Installs\nA,GAME,\"1,000+\"\nB,TOOLS,10+\nA,GAME,500+\n"
        );
    }
}
