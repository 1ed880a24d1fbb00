//! Persistence of the fitted artifact set.
//!
//! A training run writes four files that must always be loaded together:
//! the categorical encoders, the scaler, the classifier and the metadata
//! document. Every binary artifact is wrapped in an [`Envelope`] carrying the
//! run's `model_version`, and loading fails unless all four agree.

use crate::error::{AppError, Result};
use crate::ml::classifier::KnnClassifier;
use crate::ml::features::{EncodedFeatures, FeatureCodec, FeatureEncoders, FeatureScaler};
use crate::ml::models::{AppFeatures, CategoricalField, ModelMetadata, N_FEATURES};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ENCODERS_FILE: &str = "encoders.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const MODEL_FILE: &str = "knn_model.bin";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Bumped whenever a persisted type changes shape
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    model_version: Uuid,
    payload: T,
}

/// Encoders, scaler, classifier and metadata from one training run
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    encoders: FeatureEncoders,
    scaler: FeatureScaler,
    classifier: KnnClassifier,
    metadata: ModelMetadata,
}

impl ModelArtifacts {
    /// Assemble a set, rejecting parts that do not belong together
    pub fn new(
        encoders: FeatureEncoders,
        scaler: FeatureScaler,
        classifier: KnnClassifier,
        metadata: ModelMetadata,
    ) -> Result<Self> {
        let artifacts = Self {
            encoders,
            scaler,
            classifier,
            metadata,
        };
        artifacts.verify()?;
        Ok(artifacts)
    }

    pub fn encoders(&self) -> &FeatureEncoders {
        &self.encoders
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &KnnClassifier {
        &self.classifier
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model_version(&self) -> Uuid {
        self.metadata.model_version
    }

    pub fn codec(&self) -> FeatureCodec<'_> {
        FeatureCodec::new(&self.encoders, &self.scaler)
    }

    pub fn encode(&self, features: &AppFeatures) -> Result<EncodedFeatures> {
        self.codec().encode(features)
    }

    fn verify(&self) -> Result<()> {
        if self.scaler.n_features() != N_FEATURES {
            return Err(AppError::ArtifactLoad(format!(
                "Scaler was fitted on {} features, expected {}",
                self.scaler.n_features(),
                N_FEATURES
            )));
        }
        if self.classifier.n_features() != N_FEATURES {
            return Err(AppError::ArtifactLoad(format!(
                "Classifier holds {}-dimensional vectors, expected {}",
                self.classifier.n_features(),
                N_FEATURES
            )));
        }
        self.classifier
            .validate()
            .map_err(|e| AppError::ArtifactLoad(format!("Classifier is inconsistent: {}", e)))?;
        if self.classifier.k() != self.metadata.best_k {
            return Err(AppError::ArtifactLoad(format!(
                "Classifier uses k = {} but metadata records best_k = {}",
                self.classifier.k(),
                self.metadata.best_k
            )));
        }
        for field in CategoricalField::ALL {
            if self.encoders.get(field).field() != field {
                return Err(AppError::ArtifactLoad(format!(
                    "Encoder for {} is fitted on the wrong column",
                    field
                )));
            }
            if self.encoders.get(field).classes() != self.metadata.vocabulary(field) {
                return Err(AppError::ArtifactLoad(format!(
                    "Vocabulary for {} differs between encoder and metadata",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Write the set into `dir`.
    ///
    /// Files are staged under temporary names and renamed only once all of
    /// them were written.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let version = self.model_version();
        let targets =
            [ENCODERS_FILE, SCALER_FILE, MODEL_FILE, METADATA_FILE].map(|file| dir.join(file));
        let staged = targets.clone().map(|target| staging_path(&target));

        let result = write_binary(&staged[0], version, &self.encoders)
            .and_then(|_| write_binary(&staged[1], version, &self.scaler))
            .and_then(|_| write_binary(&staged[2], version, &self.classifier))
            .and_then(|_| write_json(&staged[3], &self.metadata));
        if let Err(e) = result {
            discard(&staged);
            return Err(e);
        }

        let mut written = Vec::with_capacity(targets.len());
        for (tmp, target) in staged.into_iter().zip(targets) {
            fs::rename(&tmp, &target)?;
            tracing::info!(path = %target.display(), "Saved artifact");
            written.push(target);
        }

        Ok(written)
    }

    /// Load and cross-check a set written by [`ModelArtifacts::save`]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let metadata: ModelMetadata = read_json(&dir.join(METADATA_FILE))?;
        let expected = metadata.model_version;

        let encoders = read_binary(&dir.join(ENCODERS_FILE), expected)?;
        let scaler = read_binary(&dir.join(SCALER_FILE), expected)?;
        let classifier = read_binary(&dir.join(MODEL_FILE), expected)?;

        let artifacts = Self::new(encoders, scaler, classifier, metadata)?;
        tracing::info!(
            model_version = %expected,
            best_k = artifacts.metadata.best_k,
            training_vectors = artifacts.classifier.n_samples(),
            "Loaded model artifacts"
        );
        Ok(artifacts)
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_binary<T: Serialize>(tmp: &Path, model_version: Uuid, payload: &T) -> Result<()> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        model_version,
        payload,
    };

    let mut writer = BufWriter::new(File::create(tmp)?);
    bincode::serialize_into(&mut writer, &envelope)?;
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(tmp: &Path, payload: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer_pretty(&mut writer, payload)?;
    writer.flush()?;
    Ok(())
}

/// Remove whatever a failed save managed to stage
fn discard(staged: &[PathBuf]) {
    for tmp in staged {
        match fs::remove_file(tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove staged artifact")
            }
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| AppError::ArtifactLoad(format!("{}: {}", path.display(), e)))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_reader(open(path)?)
        .map_err(|e| AppError::ArtifactLoad(format!("{}: {}", path.display(), e)))
}

fn read_binary<T: DeserializeOwned>(path: &Path, expected: Uuid) -> Result<T> {
    let envelope: Envelope<T> = bincode::deserialize_from(open(path)?)
        .map_err(|e| AppError::ArtifactLoad(format!("{}: {}", path.display(), e)))?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(AppError::ArtifactLoad(format!(
            "{}: unsupported format version {} (expected {})",
            path.display(),
            envelope.format_version,
            FORMAT_VERSION
        )));
    }
    if envelope.model_version != expected {
        return Err(AppError::ArtifactLoad(format!(
            "{}: belongs to model {} but metadata describes {}",
            path.display(),
            envelope.model_version,
            expected
        )));
    }

    Ok(envelope.payload)
}
