//! Create-or-update with change detection.
//!
//! A write only happens when the mutation actually changed the object, so a
//! converged resource costs one read and nothing else.

use std::fmt;

use cluster_store::{ObjectStore, StoreResource};
use crds::Tenant;
use kube::Resource;
use tracing::debug;

use crate::error::ControllerError;

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Fetch `target` by identity (or start from `target` itself when absent),
/// apply `mutate`, and write if anything changed.
///
/// `target` carries the identity: name and, for namespaced kinds, namespace.
pub async fn upsert<K, S, F>(store: &S, target: &K, mutate: F) -> Result<OperationResult, ControllerError>
where
    K: StoreResource,
    S: ObjectStore<K> + ?Sized,
    F: FnOnce(&mut K) -> Result<(), ControllerError>,
{
    let (namespace, name) = identity(target)?;
    let current = match store.get(namespace.as_deref(), &name).await {
        Ok(current) => Some(current),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    apply_mutation(store, current, target, mutate).await
}

/// Second half of [`upsert`], for callers that already hold a fresh read.
///
/// `current == None` creates `target` after mutating it.
pub async fn apply_mutation<K, S, F>(
    store: &S,
    current: Option<K>,
    target: &K,
    mutate: F,
) -> Result<OperationResult, ControllerError>
where
    K: StoreResource,
    S: ObjectStore<K> + ?Sized,
    F: FnOnce(&mut K) -> Result<(), ControllerError>,
{
    let (namespace, name) = identity(target)?;

    let Some(current) = current else {
        let mut object = target.clone();
        mutate(&mut object)?;
        ensure_identity(&object, &namespace, &name)?;
        store.create(&object).await?;
        return Ok(OperationResult::Created);
    };

    let mut object = current.clone();
    mutate(&mut object)?;
    ensure_identity(&object, &namespace, &name)?;

    if object == current {
        debug!("{} {} unchanged", K::kind(&()), name);
        return Ok(OperationResult::Unchanged);
    }

    store.update(&object).await?;
    Ok(OperationResult::Updated)
}

/// Point `child` at `tenant` as its controlling owner so it is garbage
/// collected with the tenant.
///
/// An existing reference to the same tenant is refreshed in place; a child
/// controlled by anything else is refused.
pub fn set_controller_reference<K: Resource>(tenant: &Tenant, child: &mut K) -> Result<(), ControllerError> {
    let owner = tenant.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::InvalidConfig(format!(
            "Tenant {} has no uid; cannot own children before it is persisted",
            tenant.metadata.name.as_deref().unwrap_or_default()
        ))
    })?;

    let child_name = child.meta().name.clone().unwrap_or_default();
    let refs = child.meta_mut().owner_references.get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(ControllerError::AlreadyOwned(format!(
            "{child_name} (controller {} {})",
            other.kind, other.name
        )));
    }

    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) => *existing = owner,
        None => refs.push(owner),
    }
    Ok(())
}

fn identity<K: StoreResource>(object: &K) -> Result<(Option<String>, String), ControllerError> {
    let name = object.meta().name.clone().ok_or_else(|| {
        ControllerError::InvalidConfig(format!("{} target without metadata.name", K::kind(&())))
    })?;
    Ok((object.meta().namespace.clone(), name))
}

fn ensure_identity<K: StoreResource>(
    object: &K,
    namespace: &Option<String>,
    name: &str,
) -> Result<(), ControllerError> {
    if object.meta().name.as_deref() != Some(name) || &object.meta().namespace != namespace {
        return Err(ControllerError::InvalidConfig(format!(
            "mutation changed the identity of {} {}",
            K::kind(&()),
            name
        )));
    }
    Ok(())
}
