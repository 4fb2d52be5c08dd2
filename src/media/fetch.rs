/// Image fetch backends
///
/// The cache never talks to the network itself. Hosts plug in whatever
/// loader they have (browser image element, HTTP client, disk) through
/// `ImageFetcher`.

use async_trait::async_trait;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Requested fetch priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Low,
    Auto,
}

/// Why a fetch failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Unsupported image source: {0}")]
    Unsupported(String),

    #[error("Failed to load image: {0}")]
    Failed(String),
}

/// Loads one image URL to completion
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, priority: Priority) -> Result<(), FetchError>;
}

/// Fetcher for `file://` URLs and plain paths, relative to a root directory.
/// Succeeds when the file exists and has a recognised image extension.
#[derive(Debug, Clone)]
pub struct DiskFetcher {
    root: PathBuf,
}

impl DiskFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        // Variants differ only in their query string
        let without_query = url.split('?').next().unwrap_or(url);
        let path = match without_query.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None if without_query.contains("://") => {
                return Err(FetchError::Unsupported(url.to_string()));
            }
            None => PathBuf::from(without_query),
        };

        Ok(if path.is_absolute() { path } else { self.root.join(path) })
    }
}

#[async_trait]
impl ImageFetcher for DiskFetcher {
    async fn fetch(&self, url: &str, priority: Priority) -> Result<(), FetchError> {
        let path = self.resolve(url)?;
        debug!(path = %path.display(), ?priority, "loading image from disk");

        if ImageFormat::from_path(&path).is_err() {
            return Err(FetchError::Unsupported(url.to_string()));
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(FetchError::NotFound(display(&path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound(display(&path))),
            Err(e) => Err(FetchError::Failed(e.to_string())),
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
