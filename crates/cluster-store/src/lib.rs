//! Cluster object store
//!
//! The read/write surface the tenant controller needs from the Kubernetes API,
//! reduced to six primitives (`get`, `list`, `create`, `update`,
//! `update_status`, `delete`) with optimistic concurrency: every write carries
//! the `resourceVersion` it was based on, and a stale one comes back as
//! [`StoreError::Conflict`].
//!
//! # Example
//!
//! ```no_run
//! use cluster_store::{KubeClusterStore, LabelSelector, ObjectStore};
//! use k8s_openapi::api::core::v1::LimitRange;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = KubeClusterStore::new(kube::Client::try_default().await?);
//!
//! let selector = LabelSelector::new().equals("tenancy.microscaler.io/tenant", "oil");
//! let ranges: Vec<LimitRange> = store.list(Some("oil-dev"), &selector).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod selector;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterStore;
pub use error::StoreError;
pub use selector::LabelSelector;
pub use store_trait::{ClusterStore, ObjectStore, StoreResource};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterStore, WriteRecord, WriteVerb};
