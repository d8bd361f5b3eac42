//! Reconciliation logic for Tenants.
//!
//! This module is organized by what gets converged:
//! - `namespaces`: annotations and labels of every owned namespace
//! - `indexed`: per-namespace children replicated from a spec list (pruning included)
//! - `limit_ranges`: the LimitRange instance of `indexed`
//! - `status`: membership and namespace count on the Tenant status

pub mod indexed;
pub mod limit_ranges;
pub mod namespaces;
pub mod status;

#[cfg(test)]
mod namespaces_test;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cluster_store::ClusterStore;
use crds::Tenant;
use tracing::{debug, error, info, warn};

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::events::EventPublisher;
use crate::retry::RetryPolicy;

/// Reconciles Tenants against the cluster.
///
/// Cheap to clone: every field is shared, so each fan-out task gets its own
/// handle.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) store: Arc<dyn ClusterStore>,
    pub(crate) events: Arc<dyn EventPublisher>,
    pub(crate) retry: RetryPolicy,
    /// Requeue backoff per tenant name
    backoff_states: Arc<Mutex<HashMap<String, FibonacciBackoff>>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ClusterStore>, events: Arc<dyn EventPublisher>, retry: RetryPolicy) -> Self {
        Self {
            store,
            events,
            retry,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Full reconcile of one tenant: refresh membership, record the count,
    /// then converge every owned namespace.
    pub async fn reconcile_tenant(&self, tenant: &Tenant) -> Result<(), ControllerError> {
        let name = tenant_name(tenant);
        debug!("Reconciling Tenant {}", name);

        let mut tenant = tenant.clone();
        self.collect_namespaces(&mut tenant).await?;
        self.ensure_namespace_count(&tenant).await?;
        self.sync_all(&tenant).await?;

        info!(
            "Tenant {} reconciled ({} namespaces)",
            name,
            tenant.owned_namespaces().len()
        );
        Ok(())
    }

    /// Converge every namespace in the tenant's status membership.
    ///
    /// Namespace metadata is converged first, then LimitRanges. Each step runs
    /// one task per namespace; all tasks run to completion and the first error,
    /// in membership order, is returned.
    pub async fn sync_all(&self, tenant: &Tenant) -> Result<(), ControllerError> {
        let tenant = Arc::new(tenant.clone());

        self.fan_out(&tenant, "cannot sync Namespaces", |reconciler, tenant, namespace| async move {
            reconciler.sync_namespace_metadata(&tenant, &namespace).await
        })
        .await?;

        self.fan_out(&tenant, "cannot sync LimitRanges", |reconciler, tenant, namespace| async move {
            reconciler.sync_limit_ranges(&tenant, &namespace).await
        })
        .await
    }

    /// Spawn `task` once per owned namespace and join them all.
    async fn fan_out<F, Fut>(&self, tenant: &Arc<Tenant>, context: &str, task: F) -> Result<(), ControllerError>
    where
        F: Fn(Reconciler, Arc<Tenant>, String) -> Fut,
        Fut: Future<Output = Result<(), ControllerError>> + Send + 'static,
    {
        let handles: Vec<_> = tenant
            .owned_namespaces()
            .iter()
            .map(|namespace| {
                let handle = tokio::spawn(task(self.clone(), tenant.clone(), namespace.clone()));
                (namespace.clone(), handle)
            })
            .collect();

        let mut first_error = None;
        for (namespace, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ControllerError::TaskFailed(format!("namespace {namespace}: {e}"))),
            };
            if let Err(e) = result {
                error!("{} for Tenant {} in namespace {}: {}", context, tenant_name(tenant), namespace, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(source) => Err(ControllerError::Aggregate {
                context: context.to_string(),
                source: Box::new(source),
            }),
            None => Ok(()),
        }
    }

    /// Record a failed reconcile and return the requeue delay for the tenant
    pub fn next_error_backoff(&self, tenant: &str) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let backoff = states.entry(tenant.to_string()).or_default();
                let delay = backoff.next_backoff();
                debug!("Tenant {} failed {} time(s), requeue in {:?}", tenant, backoff.failures(), delay);
                delay
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                Duration::from_secs(60)
            }
        }
    }

    /// Forget the failure history of a tenant after a successful reconcile
    pub fn reset_backoff(&self, tenant: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(backoff) = states.get_mut(tenant) {
                backoff.reset();
            }
        }
    }
}

pub(crate) fn tenant_name(tenant: &Tenant) -> &str {
    tenant.metadata.name.as_deref().unwrap_or_default()
}
