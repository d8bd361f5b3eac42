//! Namespace metadata synchronizer.
//!
//! Every owned namespace gets its annotation and label sets replaced
//! wholesale with what the tenant spec derives. Anything added to a namespace
//! by hand is removed on the next sync.

use std::collections::BTreeMap;

use cluster_store::ObjectStore;
use crds::{
    ALLOWED_REGISTRIES_ANNOTATION, ALLOWED_REGISTRIES_REGEX_ANNOTATION, AllowedListSpec,
    INGRESS_CLASSES_ANNOTATION, INGRESS_CLASSES_REGEX_ANNOTATION, NAMESPACE_NAME_LABEL,
    NODE_SELECTOR_ANNOTATION, STORAGE_CLASSES_ANNOTATION, STORAGE_CLASSES_REGEX_ANNOTATION, Tenant,
    type_label,
};
use k8s_openapi::api::core::v1::Namespace;
use tracing::{debug, info};

use super::{Reconciler, tenant_name};
use crate::error::ControllerError;
use crate::retry::retry_on_conflict;
use crate::upsert::{OperationResult, apply_mutation};

/// Event message for namespace metadata syncs
pub const NAMESPACE_METADATA_ACTION: &str = "Ensuring Namespace metadata";

/// Full annotation and label sets a namespace must carry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamespaceMetadata {
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

impl NamespaceMetadata {
    /// Overwrite the namespace's annotations and labels with these sets
    pub fn apply(&self, namespace: &mut Namespace) {
        namespace.metadata.annotations = non_empty(&self.annotations);
        namespace.metadata.labels = non_empty(&self.labels);
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

/// Derive the metadata of `namespace` from the tenant spec.
///
/// Annotations: additional metadata first, then node selector and the
/// allow-lists. An empty allow-list field produces no key at all.
/// Labels: namespace name and owning tenant, then additional labels, which
/// win on a key collision.
pub fn desired_namespace_metadata(tenant: &Tenant, namespace: &str, tenant_label: &str) -> NamespaceMetadata {
    let spec = &tenant.spec;
    let additional = spec
        .namespace_options
        .as_ref()
        .and_then(|options| options.additional_metadata.as_ref());

    let mut annotations = additional.map(|m| m.annotations.clone()).unwrap_or_default();

    if let Some(selector) = spec.node_selector.as_ref().filter(|s| !s.is_empty()) {
        let pairs: Vec<String> = selector.iter().map(|(k, v)| format!("{k}={v}")).collect();
        annotations.insert(NODE_SELECTOR_ANNOTATION.to_string(), pairs.join(","));
    }

    insert_allowed(
        &mut annotations,
        spec.ingress_options.allowed_classes.as_ref(),
        INGRESS_CLASSES_ANNOTATION,
        INGRESS_CLASSES_REGEX_ANNOTATION,
    );
    insert_allowed(
        &mut annotations,
        spec.storage_classes.as_ref(),
        STORAGE_CLASSES_ANNOTATION,
        STORAGE_CLASSES_REGEX_ANNOTATION,
    );
    insert_allowed(
        &mut annotations,
        spec.container_registries.as_ref(),
        ALLOWED_REGISTRIES_ANNOTATION,
        ALLOWED_REGISTRIES_REGEX_ANNOTATION,
    );

    let mut labels = BTreeMap::from([
        (NAMESPACE_NAME_LABEL.to_string(), namespace.to_string()),
        (tenant_label.to_string(), tenant_name(tenant).to_string()),
    ]);
    if let Some(additional) = additional {
        labels.extend(additional.labels.clone());
    }

    NamespaceMetadata { annotations, labels }
}

fn insert_allowed(
    annotations: &mut BTreeMap<String, String>,
    list: Option<&AllowedListSpec>,
    exact_key: &str,
    regex_key: &str,
) {
    let Some(list) = list else {
        return;
    };
    if let Some(exact) = list.joined_exact() {
        annotations.insert(exact_key.to_string(), exact);
    }
    if let Some(regex) = list.regex() {
        annotations.insert(regex_key.to_string(), regex.to_string());
    }
}

impl Reconciler {
    /// Converge one namespace's annotations and labels.
    ///
    /// A namespace missing from the store is not recreated: the read fails
    /// with NotFound. An event is published whatever the outcome.
    pub async fn sync_namespace_metadata(&self, tenant: &Tenant, namespace: &str) -> Result<(), ControllerError> {
        let outcome = self.apply_namespace_metadata(tenant, namespace).await;

        self.events
            .publish(tenant, namespace, NAMESPACE_METADATA_ACTION, &outcome)
            .await;

        let result = outcome?;
        match result {
            OperationResult::Unchanged => debug!("Namespace {} metadata unchanged", namespace),
            _ => info!(
                tenant = tenant_name(tenant),
                namespace,
                result = %result,
                "Namespace metadata sync completed"
            ),
        }
        Ok(())
    }

    async fn apply_namespace_metadata(&self, tenant: &Tenant, namespace: &str) -> Result<OperationResult, ControllerError> {
        let tenant_label = type_label::<Tenant>()?;
        let desired = &desired_namespace_metadata(tenant, namespace, tenant_label);
        let store = &*self.store;

        retry_on_conflict(&self.retry, || async move {
            let current: Namespace = ObjectStore::<Namespace>::get(store, None, namespace).await?;
            let target = current.clone();
            apply_mutation(store, Some(current), &target, |ns| {
                desired.apply(ns);
                Ok(())
            })
            .await
        })
        .await
    }
}
