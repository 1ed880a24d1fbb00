//! Predicts whether a mobile application will be a commercial hit or flop.
//!
//! A K-nearest-neighbor model is trained offline on Play Store data
//! ([`ml::Trainer`]), persisted as a versioned artifact set
//! ([`ml::ModelArtifacts`]) and served over HTTP ([`api::build_router`]).

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod ml;

pub use error::{AppError, Result};
