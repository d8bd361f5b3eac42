//! Tenant Custom Resource Definition
//!
//! A Tenant is cluster-scoped. Its spec carries the policy every owned
//! namespace must converge to; its status records which namespaces it owns.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::LimitRangeSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// TenantSpec defines the desired state of a tenant
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "tenancy.microscaler.io",
    version = "v1alpha1",
    kind = "Tenant",
    shortname = "tnt",
    status = "TenantStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Namespace count","type":"integer","jsonPath":".status.size"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    /// Options applied to every namespace owned by the tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_options: Option<NamespaceOptions>,

    /// Node selector enforced on the tenant's namespaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    /// Ingress options (allowed ingress classes)
    #[serde(default)]
    pub ingress_options: IngressOptions,

    /// Storage classes the tenant may use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_classes: Option<AllowedListSpec>,

    /// Container registries the tenant may pull from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_registries: Option<AllowedListSpec>,

    /// LimitRanges replicated into every namespace, in order
    #[serde(default)]
    pub limit_ranges: LimitRangesSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceOptions {
    /// Extra metadata copied onto every namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_metadata: Option<AdditionalMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngressOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_classes: Option<AllowedListSpec>,
}

/// An allow-list expressed as exact values and/or a regular expression
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AllowedListSpec {
    #[serde(default, rename = "allowed", skip_serializing_if = "Vec::is_empty")]
    pub exact: Vec<String>,

    #[serde(default, rename = "allowedRegex", skip_serializing_if = "String::is_empty")]
    pub regex: String,
}

impl AllowedListSpec {
    /// Exact values joined with commas, or `None` when there are none
    pub fn joined_exact(&self) -> Option<String> {
        (!self.exact.is_empty()).then(|| self.exact.join(","))
    }

    /// The regular expression, or `None` when it is empty
    pub fn regex(&self) -> Option<&str> {
        (!self.regex.is_empty()).then_some(self.regex.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LimitRangesSpec {
    #[serde(default)]
    pub items: Vec<LimitRangeSpec>,
}

/// TenantStatus defines the observed state of a tenant
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TenantStatus {
    /// Number of namespaces owned by the tenant
    #[serde(default)]
    pub size: u32,

    /// Names of the namespaces owned by the tenant, sorted. Always
    /// serialized: status is written as a merge patch, where an omitted
    /// key would leave the previous list in place.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Tenant {
    /// Namespaces currently recorded as owned by this tenant
    pub fn owned_namespaces(&self) -> &[String] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.namespaces.as_slice())
    }

    /// The limit range items to replicate, in spec order
    pub fn limit_range_items(&self) -> &[LimitRangeSpec] {
        &self.spec.limit_ranges.items
    }
}
