//! Label key registry.
//!
//! Every kind the controller labels maps to exactly one label key. The set of
//! kinds is closed: asking for the label of any other kind is a validation
//! error rather than a silent empty string.

use kube::Resource;
use thiserror::Error;

/// Label carrying the name of the owning tenant
pub const TENANT_LABEL: &str = "tenancy.microscaler.io/tenant";

/// Label carrying the position of a LimitRange in the tenant spec
pub const LIMIT_RANGE_LABEL: &str = "tenancy.microscaler.io/limit-range";

/// Errors raised while resolving label keys
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The kind has no registered label key
    #[error("no label key registered for kind {0}")]
    Unregistered(String),

    /// A registered key is not a valid Kubernetes label key
    #[error("invalid label key {key}: {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Resource categories that carry a controller label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelCategory {
    /// Ownership label, value is the tenant name
    Tenant,
    /// Index label of a replicated LimitRange, value is the spec position
    LimitRange,
}

impl LabelCategory {
    /// Every registered category
    pub const ALL: [Self; 2] = [Self::Tenant, Self::LimitRange];

    /// The label key for this category
    pub fn key(self) -> &'static str {
        match self {
            Self::Tenant => TENANT_LABEL,
            Self::LimitRange => LIMIT_RANGE_LABEL,
        }
    }

    /// The Kubernetes kind this category labels for
    pub fn kind(self) -> &'static str {
        match self {
            Self::Tenant => "Tenant",
            Self::LimitRange => "LimitRange",
        }
    }

    /// Resolve the category registered for a kind
    pub fn for_kind(kind: &str) -> Result<Self, LabelError> {
        Self::ALL
            .into_iter()
            .find(|category| category.kind() == kind)
            .ok_or_else(|| LabelError::Unregistered(kind.to_string()))
    }
}

/// Label key registered for the resource type `K`
pub fn type_label<K>() -> Result<&'static str, LabelError>
where
    K: Resource<DynamicType = ()>,
{
    LabelCategory::for_kind(&K::kind(&())).map(LabelCategory::key)
}

/// Checks that every registered key is a valid Kubernetes label key.
///
/// Called once at startup so a typo fails the process instead of every sync.
pub fn validate_label_keys() -> Result<(), LabelError> {
    LabelCategory::ALL
        .into_iter()
        .try_for_each(|category| validate_label_key(category.key()))
}

fn validate_label_key(key: &str) -> Result<(), LabelError> {
    let invalid = |reason: &str| LabelError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > 253 {
            return Err(invalid("prefix must be 1-253 characters"));
        }
        let dns_label = |part: &str| {
            !part.is_empty()
                && part.len() <= 63
                && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                && !part.starts_with('-')
                && !part.ends_with('-')
        };
        if !prefix.split('.').all(dns_label) {
            return Err(invalid("prefix must be a DNS subdomain"));
        }
    }

    if name.is_empty() || name.len() > 63 {
        return Err(invalid("name must be 1-63 characters"));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(invalid("name must start and end with an alphanumeric character"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid("name may only contain alphanumerics, '-', '_' and '.'"));
    }

    Ok(())
}
