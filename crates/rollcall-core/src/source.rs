//! Video source capability consumed by the frame sampler.

use crate::frame::Frame;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("stream closed")]
    Closed,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Resolve once stream metadata is known, returning `(width, height)`.
    ///
    /// Implementations must not resolve until both dimensions are positive;
    /// the sampler treats a zero dimension as a broken source and does not
    /// poll again.
    async fn wait_ready(&self) -> Result<(u32, u32), SourceError>;

    /// Grab the current frame.
    async fn capture(&self) -> Result<Frame, SourceError>;
}
