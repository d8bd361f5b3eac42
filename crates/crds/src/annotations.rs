//! Annotation keys written onto tenant namespaces.
//!
//! Admission policies read these back to decide which classes and registries a
//! namespace may use, so the spelling here is part of the contract.

/// Node selector enforced by the `PodNodeSelector` admission plugin
pub const NODE_SELECTOR_ANNOTATION: &str = "scheduler.alpha.kubernetes.io/node-selector";

/// Comma-separated ingress classes the namespace may use
pub const INGRESS_CLASSES_ANNOTATION: &str = "tenancy.microscaler.io/ingress-classes";

/// Regular expression of ingress classes the namespace may use
pub const INGRESS_CLASSES_REGEX_ANNOTATION: &str = "tenancy.microscaler.io/ingress-classes-regexp";

/// Comma-separated storage classes the namespace may use
pub const STORAGE_CLASSES_ANNOTATION: &str = "tenancy.microscaler.io/storage-classes";

/// Regular expression of storage classes the namespace may use
pub const STORAGE_CLASSES_REGEX_ANNOTATION: &str = "tenancy.microscaler.io/storage-classes-regexp";

/// Comma-separated container registries the namespace may pull from
pub const ALLOWED_REGISTRIES_ANNOTATION: &str = "tenancy.microscaler.io/allowed-registries";

/// Regular expression of container registries the namespace may pull from
pub const ALLOWED_REGISTRIES_REGEX_ANNOTATION: &str =
    "tenancy.microscaler.io/allowed-registries-regexp";

/// Label every tenant namespace carries with its own name
pub const NAMESPACE_NAME_LABEL: &str = "name";
