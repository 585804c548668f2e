//! Well-known labels the adapter writes on created resources.
//!
//! The table is an explicit value handed to the operations that need it, so
//! tests and deployments can swap keys without touching global state.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Labels applied to namespaces at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceLabels {
    /// Tells the propagation controller to leave the namespace on the control plane only.
    /// See https://karmada.io/docs/userguide/bestpractices/namespace-management/#labeling-the-namespace
    pub skip_auto_propagation: Label,
}

impl NamespaceLabels {
    pub fn karmada() -> Self {
        Self { skip_auto_propagation: Label::new("namespace.karmada.io/skip-auto-propagation", "true") }
    }

    pub fn with_skip_auto_propagation_key(mut self, key: impl Into<String>) -> Self {
        self.skip_auto_propagation.key = key.into();
        self
    }

    /// Label map for a new namespace, `None` when no label applies.
    pub fn for_namespace(&self, skip_auto_propagation: bool) -> Option<BTreeMap<String, String>> {
        if !skip_auto_propagation { return None; }
        let Label { key, value } = self.skip_auto_propagation.clone();
        Some(BTreeMap::from([(key, value)]))
    }
}

impl Default for NamespaceLabels {
    fn default() -> Self { Self::karmada() }
}
