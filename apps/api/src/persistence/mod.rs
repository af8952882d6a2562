pub mod adapter;
pub mod cache;
pub mod queue;
pub mod status;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cv::document::CvDocument;

/// What gets persisted for one user: the document plus the template choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvSnapshot {
    pub document: CvDocument,
    pub selected_template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Written to the remote store (and mirrored to the cache).
    Remote,
    /// Remote store unreachable; written to the local cache only.
    Offline,
    /// Nobody signed in; written to the local cache only.
    Local,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connectivity(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("local cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connectivity(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_pool_timeout_is_connectivity() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_connectivity());
    }

    #[test]
    fn test_sqlx_io_is_connectivity() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(StoreError::from(sqlx::Error::Io(io)).is_connectivity());
    }

    #[test]
    fn test_sqlx_row_not_found_is_not_connectivity() {
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_connectivity());
    }
}
