//! Export module for the fitted sentiment pipeline.
//!
//! Provides the compressed on-disk artifact and the multipart upload to a
//! scoring endpoint.

pub mod artifact;
pub mod uploader;

pub use artifact::{file_sha256, ArtifactMetadata, ModelArtifact, COMPRESSION_LEVEL, FORMAT_VERSION};
pub use uploader::{render_body, ModelUploader, UploadConfig, UploadResponse};
