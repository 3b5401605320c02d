//! Reference photo retrieval.

use crate::frame::Frame;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("photo not found: {0}")]
    NotFound(String),
    #[error("photo path escapes store root: {0}")]
    InvalidPath(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn fetch(&self, photo: &str) -> Result<Frame, PhotoError>;
}

/// Photo store backed by a directory of image files.
pub struct DirPhotoStore {
    root: PathBuf,
}

impl DirPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `photo` under the root, rejecting absolute paths and `..`.
    fn resolve(&self, photo: &str) -> Result<PathBuf, PhotoError> {
        let rel = Path::new(photo);
        let clean = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if photo.is_empty() || !clean {
            return Err(PhotoError::InvalidPath(photo.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl PhotoStore for DirPhotoStore {
    async fn fetch(&self, photo: &str) -> Result<Frame, PhotoError> {
        let path = self.resolve(photo)?;
        let shown = path.display().to_string();
        tracing::debug!(path = %shown, "fetching reference photo");

        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PhotoError::NotFound(shown.clone())
            } else {
                PhotoError::Io {
                    path: shown.clone(),
                    source,
                }
            }
        })?;

        let decoded = image::load_from_memory(&bytes).map_err(|source| PhotoError::Decode {
            path: shown,
            source,
        })?;

        Ok(Frame::from_image(&decoded))
    }
}
