//! Kubernetes resource watcher.
//!
//! Drives `Reconciler::reconcile_tenant` from a `kube_runtime::Controller`
//! over Tenants. LimitRanges and Namespaces owned by a tenant are watched too
//! and mapped back to their owner, so drift in either triggers a reconcile.

use std::sync::Arc;
use std::time::Duration;

use crds::Tenant;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{LimitRange, Namespace};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{Controller, watcher};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;

/// Shared state handed to every reconcile
pub struct Context {
    pub reconciler: Reconciler,
    pub resync_interval: Duration,
}

/// Tenants referenced by `object`'s owner references
pub fn tenant_owners<K: Resource>(object: &K) -> Vec<ObjectRef<Tenant>> {
    let kind = Tenant::kind(&());
    let api_version = Tenant::api_version(&());
    object
        .meta()
        .owner_references
        .iter()
        .flatten()
        .filter(|r| r.kind == kind && r.api_version == api_version)
        .map(|r| ObjectRef::new(&r.name))
        .collect()
}

async fn reconcile(tenant: Arc<Tenant>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let name = tenant.name_any();
    debug!("Reconciling Tenant {}", name);

    match ctx.reconciler.reconcile_tenant(&tenant).await {
        Ok(()) => {
            ctx.reconciler.reset_backoff(&name);
            Ok(Action::requeue(ctx.resync_interval))
        }
        // Deleted since the event was queued; owned children are garbage collected
        Err(e) if e.is_not_found() => {
            debug!("Tenant {} no longer exists", name);
            ctx.reconciler.reset_backoff(&name);
            Ok(Action::await_change())
        }
        Err(e) => Err(e),
    }
}

fn error_policy(tenant: Arc<Tenant>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let name = tenant.name_any();
    let delay = ctx.reconciler.next_error_backoff(&name);
    error!("Reconciliation error for Tenant {}: {} (requeue in {:?})", name, error, delay);
    Action::requeue(delay)
}

/// Watch Tenants until the stream ends or a shutdown signal arrives.
pub async fn watch_tenants(client: Client, reconciler: Reconciler, settings: &Settings) -> Result<(), ControllerError> {
    info!("Starting Tenant watcher");

    let tenants: Api<Tenant> = Api::all(client.clone());
    let limit_ranges: Api<LimitRange> = Api::all(client.clone());
    let namespaces: Api<Namespace> = Api::all(client);

    // The CRD must be installed before watching
    tenants
        .list(&kube::api::ListParams::default().limit(1))
        .await
        .map_err(|e| ControllerError::Watch(format!("Tenant CRD is not queryable: {e}")))?;

    // Bursts of child events, our own writes included, collapse into one reconcile
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(settings.concurrency);

    let context = Arc::new(Context {
        reconciler,
        resync_interval: settings.resync_interval,
    });

    Controller::new(tenants, watcher::Config::default())
        .watches(limit_ranges, watcher::Config::default(), |lr| tenant_owners(&lr))
        .watches(namespaces, watcher::Config::default(), |ns| tenant_owners(&ns))
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|res| async move {
            match res {
                Ok((tenant, _)) => debug!("Reconciled Tenant {}", tenant.name),
                Err(e) => error!("Controller error for Tenant: {}", e),
            }
        })
        .await;

    info!("Tenant watcher stopped");
    Ok(())
}
