//! Mock object store for unit testing
//!
//! Stores objects in memory as JSON and behaves like the API server where the
//! controller cares:
//! - every write bumps a per-object `resourceVersion`, and a write carrying a
//!   stale one is rejected with [`StoreError::Conflict`]
//! - `update` never changes status; `update_status` applies the same JSON
//!   merge patch the real store sends, so it changes nothing else
//! - every successful write is journaled so tests can assert "no writes"
//!
//! Faults can be injected per kind (conflicts) or per object (failures).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::status_merge_patch;
use crate::error::StoreError;
use crate::selector::LabelSelector;
use crate::store_trait::{ObjectStore, StoreResource, object_name};

type ObjectKey = (String, Option<String>, String);

/// Kind of write recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteVerb {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// One successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub verb: WriteVerb,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

/// In-memory object store for tests
#[derive(Clone, Default)]
pub struct MockClusterStore {
    pub(crate) objects: Arc<Mutex<BTreeMap<ObjectKey, Value>>>,
    pub(crate) next_version: Arc<Mutex<u64>>,
    pub(crate) journal: Arc<Mutex<Vec<WriteRecord>>>,
    pub(crate) pending_conflicts: Arc<Mutex<HashMap<String, usize>>>,
    pub(crate) failing: Arc<Mutex<HashSet<(String, String)>>>,
}

impl std::fmt::Debug for MockClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClusterStore")
            .field("objects", &self.objects.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl MockClusterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object (for test setup); assigns a uid and resourceVersion and
    /// returns the stored copy. Not journaled.
    pub fn insert<K: StoreResource>(&self, object: &K) -> K {
        let mut object = object.clone();
        let meta = object.meta_mut();
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        meta.resource_version = Some(self.next_version());
        let key = Self::key_of(&object).unwrap();
        self.objects
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(&object).unwrap());
        object
    }

    /// Read an object back (for assertions)
    pub fn fetch<K: StoreResource>(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        let key = Self::key::<K>(namespace, name);
        let value = self.objects.lock().unwrap().get(&key).cloned()?;
        Some(serde_json::from_value(value).unwrap())
    }

    /// All stored objects of a kind, optionally restricted to a namespace
    pub fn objects_of<K: StoreResource>(&self, namespace: Option<&str>) -> Vec<K> {
        let kind = K::kind(&()).to_string();
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && (namespace.is_none() || ns.as_deref() == namespace))
            .map(|(_, value)| serde_json::from_value(value.clone()).unwrap())
            .collect()
    }

    /// Bump an object's resourceVersion as if another writer had touched it
    pub fn touch<K: StoreResource>(&self, namespace: Option<&str>, name: &str) {
        let key = Self::key::<K>(namespace, name);
        let version = self.next_version();
        if let Some(value) = self.objects.lock().unwrap().get_mut(&key) {
            value["metadata"]["resourceVersion"] = Value::String(version);
        }
    }

    /// Every successful write so far
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.journal.lock().unwrap().clone()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.journal.lock().unwrap().len()
    }

    /// Forget the journal (e.g. after seeding through the controller)
    pub fn clear_writes(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Reject the next `count` writes of `kind` with a conflict, without applying them
    pub fn inject_conflicts(&self, kind: &str, count: usize) {
        *self
            .pending_conflicts
            .lock()
            .unwrap()
            .entry(kind.to_string())
            .or_default() += count;
    }

    /// Make every read and write of one object fail
    pub fn fail_on(&self, kind: &str, name: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()));
    }

    fn next_version(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    fn key<K: StoreResource>(namespace: Option<&str>, name: &str) -> ObjectKey {
        (
            K::kind(&()).to_string(),
            namespace.map(str::to_string),
            name.to_string(),
        )
    }

    fn key_of<K: StoreResource>(object: &K) -> Result<ObjectKey, StoreError> {
        let name = object_name(object)?;
        Ok(Self::key::<K>(object.meta().namespace.as_deref(), name))
    }

    fn check_failure<K: StoreResource>(&self, name: &str) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        if self.failing.lock().unwrap().contains(&(kind.clone(), name.to_string())) {
            return Err(StoreError::Unavailable(format!("{kind} {name} is failing")));
        }
        Ok(())
    }

    fn take_conflict<K: StoreResource>(&self, name: &str) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        let mut pending = self.pending_conflicts.lock().unwrap();
        match pending.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Err(StoreError::Conflict(format!("injected conflict on {kind} {name}")))
            }
            _ => Ok(()),
        }
    }

    fn record<K: StoreResource>(&self, verb: WriteVerb, namespace: Option<&str>, name: &str) {
        self.journal.lock().unwrap().push(WriteRecord {
            verb,
            kind: K::kind(&()).to_string(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });
    }

    /// Shared path of `update` and `update_status`: checks the token, merges,
    /// bumps the version and journals the write.
    fn replace<K: StoreResource>(&self, object: &K, verb: WriteVerb) -> Result<K, StoreError> {
        let name = object_name(object)?.to_string();
        let namespace = object.meta().namespace.clone();
        self.check_failure::<K>(&name)?;
        self.take_conflict::<K>(&name)?;

        let key = Self::key_of(object)?;
        let version = self.next_version();
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))?;

        let stored_version = stored
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str);
        if object.meta().resource_version.as_deref() != stored_version {
            return Err(StoreError::Conflict(format!(
                "{} {} has been modified; please apply your changes to the latest version",
                K::kind(&()),
                name
            )));
        }

        let mut merged = match verb {
            // Same merge patch the API server receives
            WriteVerb::UpdateStatus => {
                let mut merged = stored.clone();
                json_patch::merge(&mut merged, &status_merge_patch(object)?);
                merged
            }
            _ => {
                let mut merged = serde_json::to_value(object)?;
                merged["status"] = stored.get("status").cloned().unwrap_or(Value::Null);
                merged["metadata"]["uid"] = stored["metadata"]["uid"].clone();
                merged
            }
        };
        if merged["status"].is_null() {
            if let Some(map) = merged.as_object_mut() {
                map.remove("status");
            }
        }
        merged["metadata"]["resourceVersion"] = Value::String(version);

        let result = serde_json::from_value(merged.clone())?;
        objects.insert(key, merged);
        drop(objects);

        self.record::<K>(verb, namespace.as_deref(), &name);
        Ok(result)
    }
}

#[async_trait]
impl<K: StoreResource> ObjectStore<K> for MockClusterStore {
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<K, StoreError> {
        self.check_failure::<K>(name)?;
        let key = Self::key::<K>(namespace, name);
        let value = self
            .objects
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<K>, StoreError> {
        Ok(self
            .objects_of::<K>(namespace)
            .into_iter()
            .filter(|object| selector.matches(object.meta().labels.as_ref()))
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?.to_string();
        self.check_failure::<K>(&name)?;
        self.take_conflict::<K>(&name)?;

        let key = Self::key_of(object)?;
        if self.objects.lock().unwrap().contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} {} already exists",
                K::kind(&()),
                name
            )));
        }
        if object.meta().resource_version.is_some() {
            return Err(StoreError::InvalidRequest(
                "resourceVersion should not be set on objects to be created".to_string(),
            ));
        }

        let stored = self.insert(object);
        self.record::<K>(WriteVerb::Create, object.meta().namespace.as_deref(), &name);
        Ok(stored)
    }

    async fn update(&self, object: &K) -> Result<K, StoreError> {
        self.replace(object, WriteVerb::Update)
    }

    async fn update_status(&self, object: &K) -> Result<K, StoreError> {
        self.replace(object, WriteVerb::UpdateStatus)
    }

    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError> {
        self.check_failure::<K>(name)?;
        let key = Self::key::<K>(namespace, name);
        self.objects
            .lock()
            .unwrap()
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))?;
        self.record::<K>(WriteVerb::Delete, namespace, name);
        Ok(())
    }
}
