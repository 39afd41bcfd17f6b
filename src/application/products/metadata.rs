use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::DeveloperDirectory;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read developer metadata `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("developer metadata `{path}` is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only source of developer display metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn load(&self) -> Result<DeveloperDirectory, MetadataError>;
}
