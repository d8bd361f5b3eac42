//! Controller-specific error types.
//!
//! Store and label errors are wrapped rather than flattened so the retry
//! executor can still tell a conflict apart from everything else.

use cluster_store::StoreError;
use crds::LabelError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Tenant Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Object store error (conflict, not found, transport)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Kubernetes client error outside the object store
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Label key could not be resolved
    #[error("Validation error: {0}")]
    Label(#[from] LabelError),

    /// The object is already controlled by someone else
    #[error("Object {0} is already owned by another controller")]
    AlreadyOwned(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// First failure of a fan-out, after every sibling ran to completion
    #[error("{context}: {source}")]
    Aggregate {
        /// What the fan-out was doing
        context: String,
        /// The first error observed
        #[source]
        source: Box<ControllerError>,
    },

    /// A fan-out task panicked or was aborted
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// True for optimistic-concurrency conflicts, the only retryable error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_conflict())
    }

    /// True when the target object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_not_found())
    }
}
