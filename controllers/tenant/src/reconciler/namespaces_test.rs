//! Unit tests for the namespace metadata synchronizer

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::reconciler::namespaces::desired_namespace_metadata;
    use crate::test_utils::*;
    use crate::upsert::OperationResult;
    use cluster_store::{WriteVerb, MockClusterStore};
    use crds::*;
    use k8s_openapi::api::core::v1::Namespace;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn allowed(exact: &[&str], regex: &str) -> Option<AllowedListSpec> {
        Some(AllowedListSpec {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            regex: regex.to_string(),
        })
    }

    fn stored_namespace(store: &MockClusterStore, name: &str) -> Namespace {
        store.fetch(None, name).unwrap()
    }

    #[test]
    fn test_registries_exact_only_sets_single_key() {
        let mut tenant = create_test_tenant("oil");
        tenant.spec.container_registries = allowed(&["a", "b"], "");

        let desired = desired_namespace_metadata(&tenant, "oil-dev", TENANT_LABEL);

        assert_eq!(desired.annotations.get(ALLOWED_REGISTRIES_ANNOTATION).map(String::as_str), Some("a,b"));
        assert!(!desired.annotations.contains_key(ALLOWED_REGISTRIES_REGEX_ANNOTATION));
    }

    #[test]
    fn test_exact_and_regex_are_set_independently() {
        let mut tenant = create_test_tenant("oil");
        tenant.spec.container_registries = allowed(&["docker.io"], r".*\.corp$");
        tenant.spec.storage_classes = allowed(&[], "^fast-.*");
        tenant.spec.ingress_options.allowed_classes = allowed(&["nginx", "haproxy"], "");

        let desired = desired_namespace_metadata(&tenant, "oil-dev", TENANT_LABEL);

        assert_eq!(desired.annotations[ALLOWED_REGISTRIES_ANNOTATION], "docker.io");
        assert_eq!(desired.annotations[ALLOWED_REGISTRIES_REGEX_ANNOTATION], r".*\.corp$");
        assert_eq!(desired.annotations[STORAGE_CLASSES_REGEX_ANNOTATION], "^fast-.*");
        assert!(!desired.annotations.contains_key(STORAGE_CLASSES_ANNOTATION));
        assert_eq!(desired.annotations[INGRESS_CLASSES_ANNOTATION], "nginx,haproxy");
        assert!(!desired.annotations.contains_key(INGRESS_CLASSES_REGEX_ANNOTATION));
    }

    #[test]
    fn test_node_selector_is_joined_in_key_order() {
        let mut tenant = create_test_tenant("oil");
        tenant.spec.node_selector = Some(map(&[("zone", "eu"), ("pool", "gold")]));

        let desired = desired_namespace_metadata(&tenant, "oil-dev", TENANT_LABEL);

        assert_eq!(desired.annotations[NODE_SELECTOR_ANNOTATION], "pool=gold,zone=eu");
    }

    #[test]
    fn test_empty_spec_yields_only_identity_labels() {
        let tenant = create_test_tenant("oil");

        let desired = desired_namespace_metadata(&tenant, "oil-dev", TENANT_LABEL);

        assert!(desired.annotations.is_empty());
        assert_eq!(desired.labels, map(&[("name", "oil-dev"), (TENANT_LABEL, "oil")]));
    }

    #[test]
    fn test_additional_metadata_is_merged() {
        let mut tenant = create_test_tenant("oil");
        tenant.spec.namespace_options = Some(NamespaceOptions {
            additional_metadata: Some(AdditionalMetadata {
                annotations: map(&[("team", "drilling")]),
                labels: map(&[("env", "prod"), ("name", "custom")]),
            }),
        });
        tenant.spec.node_selector = Some(map(&[("pool", "gold")]));

        let desired = desired_namespace_metadata(&tenant, "oil-dev", TENANT_LABEL);

        assert_eq!(desired.annotations["team"], "drilling");
        assert_eq!(desired.annotations[NODE_SELECTOR_ANNOTATION], "pool=gold");
        assert_eq!(desired.labels["env"], "prod");
        // Additional labels win over the derived ones
        assert_eq!(desired.labels["name"], "custom");
        assert_eq!(desired.labels[TENANT_LABEL], "oil");
    }

    #[tokio::test]
    async fn test_sync_applies_metadata_then_is_idempotent() {
        let (reconciler, store, events) = create_test_reconciler();
        let mut tenant = create_test_tenant("oil");
        tenant.spec.container_registries = allowed(&["a", "b"], "");
        let tenant = seed_tenant(&store, &tenant, &["oil-dev"]);

        reconciler.sync_namespace_metadata(&tenant, "oil-dev").await.unwrap();

        let namespace = stored_namespace(&store, "oil-dev");
        let annotations = namespace.metadata.annotations.unwrap();
        assert_eq!(annotations[ALLOWED_REGISTRIES_ANNOTATION], "a,b");
        assert_eq!(namespace.metadata.labels.unwrap()[TENANT_LABEL], "oil");
        assert_eq!(store.write_count(), 1);

        store.clear_writes();
        reconciler.sync_namespace_metadata(&tenant, "oil-dev").await.unwrap();

        assert_eq!(store.write_count(), 0);
        assert_eq!(
            events.results_for("oil-dev"),
            vec![OperationResult::Updated, OperationResult::Unchanged]
        );
    }

    #[tokio::test]
    async fn test_manual_metadata_is_removed() {
        let (reconciler, store, _events) = create_test_reconciler();
        let tenant = seed_tenant(&store, &create_test_tenant("oil"), &[]);
        let mut namespace = create_test_namespace("oil-dev", Some(&tenant));
        namespace.metadata.annotations = Some(map(&[("manual", "yes")]));
        namespace.metadata.labels = Some(map(&[("manual", "yes")]));
        store.insert(&namespace);

        reconciler.sync_namespace_metadata(&tenant, "oil-dev").await.unwrap();

        let namespace = stored_namespace(&store, "oil-dev");
        assert!(namespace.metadata.annotations.is_none());
        assert_eq!(
            namespace.metadata.labels.unwrap(),
            map(&[("name", "oil-dev"), (TENANT_LABEL, "oil")])
        );
        // Ownership is left alone
        assert_eq!(namespace.metadata.owner_references.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_namespace_is_not_recreated() {
        let (reconciler, store, events) = create_test_reconciler();
        let tenant = seed_tenant(&store, &create_test_tenant("oil"), &[]);

        let result = reconciler.sync_namespace_metadata(&tenant, "gone").await;

        assert!(result.unwrap_err().is_not_found());
        assert!(store.fetch::<Namespace>(None, "gone").is_none());
        assert_eq!(store.write_count(), 0);

        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].namespace, "gone");
        assert!(recorded[0].outcome.is_err());
    }

    #[tokio::test]
    async fn test_single_conflict_is_retried_transparently() {
        let (reconciler, store, events) = create_test_reconciler();
        let tenant = seed_tenant(&store, &create_test_tenant("oil"), &["oil-dev"]);
        store.inject_conflicts("Namespace", 1);

        reconciler.sync_namespace_metadata(&tenant, "oil-dev").await.unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].verb, WriteVerb::Update);
        assert_eq!(events.results_for("oil-dev"), vec![OperationResult::Updated]);
    }

    #[tokio::test]
    async fn test_concurrent_writer_is_overwritten_after_retry() {
        let (reconciler, store, _events) = create_test_reconciler();
        let tenant = seed_tenant(&store, &create_test_tenant("oil"), &["oil-dev"]);
        reconciler.sync_namespace_metadata(&tenant, "oil-dev").await.unwrap();

        // Another writer bumps the version; the next sync reads afresh
        store.touch::<Namespace>(None, "oil-dev");
        let mut updated = tenant.clone();
        updated.spec.node_selector = Some(map(&[("pool", "gold")]));

        reconciler.sync_namespace_metadata(&updated, "oil-dev").await.unwrap();

        let annotations = stored_namespace(&store, "oil-dev").metadata.annotations.unwrap();
        assert_eq!(annotations[NODE_SELECTOR_ANNOTATION], "pool=gold");
    }
}
