//! Object store errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster objects
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read (stale `resourceVersion`), or
    /// already exists on create
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g. object without a name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The store refused to serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True when the error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// True when the target object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(response) if response.code == 409 => {
                Self::Conflict(response.message.clone())
            }
            kube::Error::Api(response) if response.code == 404 => {
                Self::NotFound(response.message.clone())
            }
            _ => Self::Kube(error),
        }
    }
}
