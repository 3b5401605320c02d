//! Face detection / recognition capability.
//!
//! The descriptor model itself lives outside this crate; the reference
//! loader and the frame sampler only depend on this trait.

use crate::frame::Frame;
use crate::types::Detection;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("invalid input frame: {0}")]
    InvalidInput(String),
}

#[async_trait]
pub trait FaceAnalyzer: Send + Sync {
    /// Detect every face in a frame, each with a descriptor.
    async fn detect_all(&self, frame: &Frame) -> Result<Vec<Detection>, AnalyzerError>;

    /// Detect the most prominent face in a still image, if any.
    async fn detect_one(&self, image: &Frame) -> Result<Option<Detection>, AnalyzerError>;
}
