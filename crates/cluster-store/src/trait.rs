//! ObjectStore trait for mocking
//!
//! This trait abstracts reads and writes of cluster objects so reconcilers can
//! be unit tested against an in-memory store. [`crate::KubeClusterStore`]
//! implements it over the Kubernetes API.

use std::fmt::Debug;

use crds::Tenant;
use k8s_openapi::api::core::v1::{LimitRange, Namespace};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::selector::LabelSelector;

/// A kind the store knows how to address.
///
/// Binds the kind to the scope of its `Api`: cluster-scoped kinds ignore the
/// namespace, namespaced kinds use it (or all namespaces when `None`).
pub trait StoreResource:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Build the `Api` for this kind
    fn api(client: &Client, namespace: Option<&str>) -> Api<Self>;
}

impl StoreResource for Namespace {
    fn api(client: &Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client.clone())
    }
}

impl StoreResource for Tenant {
    fn api(client: &Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client.clone())
    }
}

impl StoreResource for LimitRange {
    fn api(client: &Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(namespace) => Api::namespaced(client.clone(), namespace),
            None => Api::all(client.clone()),
        }
    }
}

/// Object store operations for one kind
///
/// Writes are checked against the object's `resourceVersion`; a stale token
/// yields [`StoreError::Conflict`]. All async methods are `Send` so callers can
/// spawn them onto Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore<K: StoreResource>: Send + Sync {
    /// Fetch an object by identity
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<K, StoreError>;

    /// List objects matching a label selector (all namespaces when `None`)
    async fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<K>, StoreError>;

    /// Create a new object
    async fn create(&self, object: &K) -> Result<K, StoreError>;

    /// Replace an existing object; the status subresource is left untouched
    async fn update(&self, object: &K) -> Result<K, StoreError>;

    /// Replace only the status subresource of an existing object
    async fn update_status(&self, object: &K) -> Result<K, StoreError>;

    /// Delete an object by identity
    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError>;
}

/// Every kind the tenant controller reads or writes
pub trait ClusterStore: ObjectStore<Namespace> + ObjectStore<LimitRange> + ObjectStore<Tenant> {}

impl<T> ClusterStore for T where T: ObjectStore<Namespace> + ObjectStore<LimitRange> + ObjectStore<Tenant> {}

/// Name of an object, required for every write
pub(crate) fn object_name<K: StoreResource>(object: &K) -> Result<&str, StoreError> {
    object.meta().name.as_deref().ok_or_else(|| {
        StoreError::InvalidRequest(format!("{} without metadata.name", K::kind(&())))
    })
}
