//! Membership collector and status aggregator.
//!
//! A namespace belongs to a tenant when one of its owner references points at
//! that tenant. Membership and size are two separate status writes, each
//! retried on its own, so they agree only once both have succeeded.

use cluster_store::{LabelSelector, ObjectStore};
use crds::{Tenant, TenantStatus};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use super::{Reconciler, tenant_name};
use crate::error::ControllerError;
use crate::retry::retry_on_conflict;

/// True when `namespace` carries an owner reference to the Tenant named `tenant`
pub fn is_owned_by(namespace: &Namespace, tenant: &str) -> bool {
    let kind = Tenant::kind(&());
    let api_version = Tenant::api_version(&());
    namespace
        .owner_references()
        .iter()
        .any(|r| r.kind == kind && r.api_version == api_version && r.name == tenant)
}

impl Reconciler {
    /// Refresh the tenant's namespace membership from the cluster.
    ///
    /// Writes the sorted list to the stored status when it differs, and
    /// mirrors it into `tenant` so later steps see the same membership.
    pub async fn collect_namespaces(&self, tenant: &mut Tenant) -> Result<(), ControllerError> {
        let store = &*self.store;
        let owned_name = tenant_name(tenant).to_string();
        let name = owned_name.as_str();

        let namespaces = retry_on_conflict(&self.retry, || async move {
            let all: Vec<Namespace> = ObjectStore::<Namespace>::list(store, None, &LabelSelector::new()).await?;
            let mut owned: Vec<String> = all
                .iter()
                .filter(|ns| is_owned_by(ns, name))
                .map(|ns| ns.name_any())
                .collect();
            owned.sort();

            let mut current: Tenant = ObjectStore::<Tenant>::get(store, None, name).await?;
            let status = current.status.get_or_insert_with(TenantStatus::default);
            if status.namespaces != owned {
                status.namespaces = owned.clone();
                ObjectStore::<Tenant>::update_status(store, &current).await?;
                info!("Tenant {} now owns {} namespace(s)", name, owned.len());
            } else {
                debug!("Tenant {} membership unchanged", name);
            }
            Ok(owned)
        })
        .await?;

        tenant.status.get_or_insert_with(TenantStatus::default).namespaces = namespaces;
        Ok(())
    }

    /// Record the size of the tenant's membership in its stored status.
    pub async fn ensure_namespace_count(&self, tenant: &Tenant) -> Result<(), ControllerError> {
        let store = &*self.store;
        let name = tenant_name(tenant);
        let size = u32::try_from(tenant.owned_namespaces().len()).map_err(|_| {
            ControllerError::InvalidConfig(format!("Tenant {name} owns too many namespaces"))
        })?;

        retry_on_conflict(&self.retry, || async move {
            let mut current: Tenant = ObjectStore::<Tenant>::get(store, None, name).await?;
            let status = current.status.get_or_insert_with(TenantStatus::default);
            if status.size == size {
                debug!("Tenant {} size unchanged ({})", name, size);
                return Ok(());
            }
            status.size = size;
            ObjectStore::<Tenant>::update_status(store, &current).await?;
            Ok(())
        })
        .await
    }
}
