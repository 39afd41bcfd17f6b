//! File-backed product cache: one JSON document holding the whole envelope.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::products::CacheEnvelope;

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to encode product cache: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write product cache `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("product cache writer stopped unexpectedly: {0}")]
    Task(String),
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted envelope.
    ///
    /// Never fails: a missing file is silently absent, unreadable or corrupt
    /// content is logged and treated the same way.
    pub async fn read(&self) -> Option<CacheEnvelope> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    target = "storefront::cache",
                    path = %self.path.display(),
                    "product cache file not found"
                );
                return None;
            }
            Err(err) => {
                warn!(
                    target = "storefront::cache",
                    path = %self.path.display(),
                    error = %err,
                    "failed to read product cache file"
                );
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!(
                    target = "storefront::cache",
                    path = %self.path.display(),
                    error = %err,
                    "product cache file is not a valid envelope"
                );
                None
            }
        }
    }

    /// Replace the file with `envelope`.
    ///
    /// The document is written to a sibling temporary file and renamed over
    /// the target, so readers never observe a partial write.
    pub async fn write(&self, envelope: &CacheEnvelope) -> Result<(), CacheStoreError> {
        let bytes = serde_json::to_vec_pretty(envelope)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || replace_file(&path, &bytes))
            .await
            .map_err(|err| CacheStoreError::Task(err.to_string()))?
    }
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), CacheStoreError> {
    let write_error = |source: std::io::Error| CacheStoreError::Write {
        path: path.display().to_string(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).map_err(write_error)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".product-cache")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(write_error)?;
    staged.write_all(bytes).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|err| write_error(err.error))?;

    Ok(())
}
