//! Developer metadata maintained by hand as a JSON file next to the service.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::products::{MetadataError, MetadataSource};
use crate::domain::catalog::DeveloperDirectory;

/// Reads the metadata file on every load so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct MetadataFile {
    path: PathBuf,
}

impl MetadataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetadataSource for MetadataFile {
    async fn load(&self) -> Result<DeveloperDirectory, MetadataError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| MetadataError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| MetadataError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }
}
