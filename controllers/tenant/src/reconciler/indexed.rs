//! Indexed child-resource synchronizer.
//!
//! Some tenant spec fields are ordered lists whose items are replicated into
//! every owned namespace as one object each. The object for item `i` is named
//! `tenancy-<tenant>-<i>` and labelled with the tenant and with `i`, so the
//! live set can be matched against the spec by index alone.
//!
//! A sync first prunes children whose index is no longer in the spec, then
//! upserts one child per item, stopping at the first failure.

use std::collections::{BTreeMap, BTreeSet};

use cluster_store::{ClusterStore, LabelSelector, ObjectStore, StoreResource};
use crds::{Tenant, type_label};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use super::{Reconciler, tenant_name};
use crate::error::ControllerError;
use crate::retry::retry_on_conflict;
use crate::upsert::{OperationResult, set_controller_reference, upsert};

/// Prefix of every indexed child name
pub const CHILD_NAME_PREFIX: &str = "tenancy";

/// A kind replicated per namespace from an ordered tenant spec list.
///
/// The index label key comes from the label registry for `Self`, so the kind
/// must be registered there.
pub trait IndexedChild: StoreResource + Default {
    /// One spec list entry
    type Item: Send + Sync;

    /// Event message for syncs of this kind
    const ACTION: &'static str;

    /// The spec list, in order
    fn items(tenant: &Tenant) -> &[Self::Item];

    /// Overwrite the payload of the child with `item`
    fn set_item(&mut self, item: &Self::Item);
}

/// Name of the child holding item `index` of `tenant`'s list
pub fn child_name(tenant: &str, index: usize) -> String {
    format!("{CHILD_NAME_PREFIX}-{tenant}-{index}")
}

impl Reconciler {
    /// Converge the children of kind `C` in one namespace to the tenant's list.
    pub async fn sync_indexed<C>(&self, tenant: &Tenant, namespace: &str) -> Result<(), ControllerError>
    where
        C: IndexedChild,
        dyn ClusterStore: ObjectStore<C>,
    {
        let tenant_label = type_label::<Tenant>()?;
        let index_label = type_label::<C>()?;
        let name = tenant_name(tenant);
        let items = C::items(tenant);

        let expected: BTreeSet<String> = (0..items.len()).map(|i| i.to_string()).collect();
        self.prune_indexed::<C>(namespace, name, tenant_label, index_label, &expected)
            .await?;

        let store = &*self.store;
        for (index, item) in items.iter().enumerate() {
            let mut target = C::default();
            target.meta_mut().name = Some(child_name(name, index));
            target.meta_mut().namespace = Some(namespace.to_string());
            let target = &target;

            let outcome = retry_on_conflict(&self.retry, || async move {
                upsert(store, target, |child: &mut C| {
                    child.meta_mut().labels = Some(BTreeMap::from([
                        (tenant_label.to_string(), name.to_string()),
                        (index_label.to_string(), index.to_string()),
                    ]));
                    child.set_item(item);
                    set_controller_reference(tenant, child)
                })
                .await
            })
            .await;

            self.events.publish(tenant, namespace, C::ACTION, &outcome).await;

            let result = outcome?;
            match result {
                OperationResult::Unchanged => {
                    debug!("{} {}/{} unchanged", C::kind(&()), namespace, target.name_any())
                }
                _ => info!(
                    tenant = name,
                    namespace,
                    index,
                    result = %result,
                    "{} sync completed",
                    C::kind(&())
                ),
            }
        }

        Ok(())
    }

    /// Delete the tenant's children of kind `C` in `namespace` whose index
    /// label is not in `expected`. A child already gone counts as deleted.
    pub async fn prune_indexed<C>(
        &self,
        namespace: &str,
        tenant: &str,
        tenant_label: &str,
        index_label: &str,
        expected: &BTreeSet<String>,
    ) -> Result<(), ControllerError>
    where
        C: IndexedChild,
        dyn ClusterStore: ObjectStore<C>,
    {
        let store = &*self.store;
        let selector = LabelSelector::new()
            .equals(tenant_label, tenant)
            .exists(index_label);
        let existing: Vec<C> = ObjectStore::<C>::list(store, Some(namespace), &selector).await?;

        for child in existing {
            let index = child.labels().get(index_label).cloned().unwrap_or_default();
            if expected.contains(&index) {
                continue;
            }

            let child_name = child.name_any();
            match ObjectStore::<C>::delete(store, Some(namespace), &child_name).await {
                Ok(()) => warn!(
                    "Pruned {} {}/{} (index {} no longer in Tenant {})",
                    C::kind(&()),
                    namespace,
                    child_name,
                    index,
                    tenant
                ),
                Err(e) if e.is_not_found() => {
                    debug!("{} {}/{} already gone", C::kind(&()), namespace, child_name)
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_name_is_deterministic() {
        assert_eq!(child_name("oil", 0), "tenancy-oil-0");
        assert_eq!(child_name("oil", 12), "tenancy-oil-12");
    }
}
