//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cluster_store::MockClusterStore;
use crds::{Tenant, TenantSpec, TenantStatus};
use k8s_openapi::api::core::v1::{LimitRangeItem, LimitRangeSpec, Namespace};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

use crate::error::ControllerError;
use crate::events::EventPublisher;
use crate::reconciler::Reconciler;
use crate::retry::RetryPolicy;
use crate::upsert::OperationResult;

/// Helper to create a persisted-looking Tenant (has a uid) with an empty spec
pub fn create_test_tenant(name: &str) -> Tenant {
    let mut tenant = Tenant::new(name, TenantSpec::default());
    tenant.metadata.uid = Some(format!("{name}-uid"));
    tenant
}

/// Helper to create a Tenant whose status already lists `namespaces`
pub fn create_test_tenant_with_namespaces(name: &str, namespaces: &[&str]) -> Tenant {
    let mut tenant = create_test_tenant(name);
    tenant.status = Some(TenantStatus {
        size: namespaces.len() as u32,
        namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
    });
    tenant
}

/// Helper to create a Namespace, optionally owned by `owner`
pub fn create_test_namespace(name: &str, owner: Option<&Tenant>) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            owner_references: owner.and_then(|tenant| tenant.controller_owner_ref(&())).map(|r| vec![r]),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a LimitRangeSpec with a single Container default memory limit
pub fn create_test_limit_range_spec(memory: &str) -> LimitRangeSpec {
    LimitRangeSpec {
        limits: vec![LimitRangeItem {
            type_: "Container".to_string(),
            default: Some(BTreeMap::from([("memory".to_string(), Quantity(memory.to_string()))])),
            ..Default::default()
        }],
    }
}

/// Retry policy without sleeps worth waiting for
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        steps: 4,
        initial_delay: std::time::Duration::from_millis(1),
        factor: 1.0,
        jitter: 0.0,
        max_delay: std::time::Duration::from_millis(1),
    }
}

/// One published event, flattened for assertions
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub tenant: String,
    pub namespace: String,
    pub message: String,
    /// `Ok` result, or the error rendered as a string
    pub outcome: Result<OperationResult, String>,
}

/// Event publisher that keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Results of the successful events for one namespace, in publish order
    pub fn results_for(&self, namespace: &str) -> Vec<OperationResult> {
        self.events()
            .into_iter()
            .filter(|event| event.namespace == namespace)
            .filter_map(|event| event.outcome.ok())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        tenant: &Tenant,
        namespace: &str,
        message: &str,
        outcome: &Result<OperationResult, ControllerError>,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            tenant: tenant.metadata.name.clone().unwrap_or_default(),
            namespace: namespace.to_string(),
            message: message.to_string(),
            outcome: outcome.as_ref().copied().map_err(ToString::to_string),
        });
    }
}

/// Helper to create a Reconciler over a mock store with recorded events
pub fn create_test_reconciler() -> (Reconciler, MockClusterStore, RecordingEventPublisher) {
    let store = MockClusterStore::new();
    let events = RecordingEventPublisher::default();
    let reconciler = Reconciler::new(
        Arc::new(store.clone()),
        Arc::new(events.clone()),
        fast_retry_policy(),
    );
    (reconciler, store, events)
}

/// Seed `tenant` and one owned namespace per name, returning the stored tenant
pub fn seed_tenant(store: &MockClusterStore, tenant: &Tenant, namespaces: &[&str]) -> Tenant {
    let tenant = store.insert(tenant);
    for namespace in namespaces {
        store.insert(&create_test_namespace(namespace, Some(&tenant)));
    }
    tenant
}
