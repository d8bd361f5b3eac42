//! Label selectors
//!
//! Only the two requirement types the controller needs: equality and
//! existence. Rendered to the Kubernetes selector syntax for the API server
//! and evaluated locally by the mock store.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    Exists(String),
}

/// A conjunction of label requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// An empty selector, matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value`
    #[must_use]
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(Requirement::Equals(key.into(), value.into()));
        self
    }

    /// Require `key` to be present with any value
    #[must_use]
    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(Requirement::Exists(key.into()));
        self
    }

    /// True when the selector has no requirements
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate the selector against an object's labels
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.requirements.iter().all(|requirement| match requirement {
            Requirement::Equals(key, value) => {
                labels.and_then(|labels| labels.get(key)) == Some(value)
            }
            Requirement::Exists(key) => labels.is_some_and(|labels| labels.contains_key(key)),
        })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .requirements
            .iter()
            .map(|requirement| match requirement {
                Requirement::Equals(key, value) => format!("{key}={value}"),
                Requirement::Exists(key) => key.clone(),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}
