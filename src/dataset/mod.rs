/// Training data preparation
///
/// - Locating and deduplicating the raw Play Store export
/// - Reading the cleaned CSV into training records

pub mod extraction;
pub mod loader;

pub use extraction::{deduplicate, locate_dataset, DedupReport};
pub use loader::{load_training_records, read_training_records, SuccessDistribution};
