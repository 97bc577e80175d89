//! On-disk model artifact: gzip-compressed JSON of the fitted pipeline.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::ExportError;
use crate::model::SentimentPipeline;

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Gzip level used for artifacts: a middle ground between size and speed.
pub const COMPRESSION_LEVEL: u32 = 3;

/// Provenance stored next to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub train_size: usize,
    pub test_size: usize,
    pub test_accuracy: Option<f64>,
}

/// A serialized, fitted sentiment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub metadata: ArtifactMetadata,
    pub pipeline: SentimentPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: SentimentPipeline, metadata: ArtifactMetadata) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            metadata,
            pipeline,
        }
    }

    /// Writes the artifact to `path`, returning the number of bytes written.
    pub fn save(&self, path: &Path) -> Result<u64, ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::new(COMPRESSION_LEVEL));
        serde_json::to_writer(&mut encoder, self)?;
        encoder.finish()?.flush()?;
        Ok(std::fs::metadata(path)?.len())
    }

    /// Reads an artifact written by [`ModelArtifact::save`].
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let artifact: ModelArtifact = serde_json::from_reader(decoder)?;
        if artifact.format_version != FORMAT_VERSION {
            return Err(ExportError::UnsupportedVersion {
                found: artifact.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(artifact)
    }
}

/// Hex SHA-256 of the file at `path`.
pub fn file_sha256(path: &Path) -> Result<String, ExportError> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineParams;
    use tempfile::TempDir;

    fn pipeline() -> SentimentPipeline {
        let texts = [
            "great fun great cast",
            "great cast lovely fun",
            "awful mess awful plot",
            "awful plot dull mess",
        ];
        SentimentPipeline::fit(&texts, &[1, 1, 0, 0], PipelineParams::default()).unwrap()
    }

    fn metadata() -> ArtifactMetadata {
        ArtifactMetadata {
            trained_at: Utc::now(),
            seed: 1337,
            train_size: 4,
            test_size: 0,
            test_accuracy: None,
        }
    }

    #[test]
    fn test_save_then_load_restores_pipeline() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models").join("model.joblib");
        let artifact = ModelArtifact::new(pipeline(), metadata());

        let size = artifact.save(&path).unwrap();
        assert!(size > 0);

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(
            loaded.pipeline.vectorizer.vocabulary(),
            artifact.pipeline.vectorizer.vocabulary()
        );
        assert_eq!(loaded.metadata.seed, 1337);
        assert_eq!(
            loaded.pipeline.predict_one("great fun"),
            artifact.pipeline.predict_one("great fun")
        );
    }

    #[test]
    fn test_artifact_is_gzip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.joblib");
        ModelArtifact::new(pipeline(), metadata()).save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.joblib");
        let mut artifact = ModelArtifact::new(pipeline(), metadata());
        artifact.format_version = 99;
        artifact.save(&path).unwrap();
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ExportError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_sha256_is_hex() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blob");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
