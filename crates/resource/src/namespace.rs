//! Namespace adapter: creation, listing and the cell exposing namespace
//! properties to data selection.

#![forbid(unsafe_code)]

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kard_core::{ComparableValue, DataCell, PropertyName};
use kard_dataselect::{select, ContinuationToken, DataSelectQuery, ListMeta, Selection, SelectionWarning};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::labels::NamespaceLabels;
use crate::NamespaceClient;

/// Namespace to create.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    pub name: String,
    /// Keep the namespace out of automatic propagation to member clusters.
    #[serde(default)]
    pub skip_auto_propagation: bool,
}

impl NamespaceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), skip_auto_propagation: false }
    }

    pub fn skip_auto_propagation(mut self, skip: bool) -> Self {
        self.skip_auto_propagation = skip;
        self
    }
}

/// Namespace object submitted for `spec`. Name syntax is left to the control plane.
pub fn build_namespace(spec: &NamespaceSpec, labels: &NamespaceLabels) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            labels: labels.for_namespace(spec.skip_auto_propagation),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Create a namespace with a single call to the control plane.
///
/// Errors come back exactly as the client reported them; there is no retry.
pub async fn create_namespace<C>(spec: &NamespaceSpec, labels: &NamespaceLabels, client: &C) -> Result<(), C::Error>
where
    C: NamespaceClient + ?Sized,
{
    info!(name = %spec.name, skip_auto_propagation = spec.skip_auto_propagation, "creating namespace");
    let namespace = build_namespace(spec, labels);
    counter!("namespace_create_total", 1u64);
    match client.create_namespace(&namespace).await {
        Ok(_) => Ok(()),
        Err(e) => {
            counter!("namespace_create_err_total", 1u64);
            warn!(name = %spec.name, error = %e, "namespace create failed");
            Err(e)
        }
    }
}

/// One page of namespaces plus selection metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceList {
    pub list_meta: ListMeta,
    pub namespaces: Vec<Namespace>,
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<ContinuationToken>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SelectionWarning>,
}

impl From<Selection<Namespace>> for NamespaceList {
    fn from(s: Selection<Namespace>) -> Self {
        Self { list_meta: s.list_meta, namespaces: s.items, continue_token: s.continue_token, warnings: s.warnings }
    }
}

/// List namespaces and apply `query` to the response.
pub async fn list_namespaces<C>(client: &C, query: &DataSelectQuery) -> Result<NamespaceList, C::Error>
where
    C: NamespaceClient + ?Sized,
{
    let namespaces = client.list_namespaces().await?;
    debug!(count = namespaces.len(), "namespaces listed");
    Ok(select_namespaces(&namespaces, query))
}

pub fn select_namespaces(namespaces: &[Namespace], query: &DataSelectQuery) -> NamespaceList {
    select(to_cells(namespaces), query).map_items(from_cells).into()
}

/// Read-only view of one namespace for data selection.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceCell<'a>(pub &'a Namespace);

impl DataCell for NamespaceCell<'_> {
    const SUPPORTED: &'static [PropertyName] = &[
        PropertyName::Name,
        PropertyName::Namespace,
        PropertyName::CreationTimestamp,
        PropertyName::Status,
    ];

    fn property(&self, name: PropertyName) -> Option<ComparableValue> {
        let meta = &self.0.metadata;
        match name {
            PropertyName::Name => Some(ComparableValue::string(meta.name.clone().unwrap_or_default())),
            // cluster-scoped: empty string, never absent
            PropertyName::Namespace => Some(ComparableValue::string(meta.namespace.clone().unwrap_or_default())),
            PropertyName::CreationTimestamp => meta.creation_timestamp.as_ref().map(|t| ComparableValue::time(t.0)),
            PropertyName::Status => self
                .0
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .map(ComparableValue::String),
            PropertyName::Type | PropertyName::Capacity => None,
        }
    }
}

pub fn to_cells(namespaces: &[Namespace]) -> Vec<NamespaceCell<'_>> {
    namespaces.iter().map(NamespaceCell).collect()
}

pub fn from_cells(cells: Vec<NamespaceCell<'_>>) -> Vec<Namespace> {
    cells.into_iter().map(|c| c.0.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::core::v1::NamespaceStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn ns(name: &str, phase: Option<&str>, created: Option<i64>) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                creation_timestamp: created.map(|s| Time(Utc.timestamp_opt(s, 0).unwrap())),
                ..Default::default()
            },
            status: phase.map(|p| NamespaceStatus { phase: Some(p.to_string()), ..Default::default() }),
            ..Default::default()
        }
    }

    #[test]
    fn cell_exposes_supported_properties() {
        let n = ns("team-x", Some("Active"), Some(1_700_000_000));
        let cell = NamespaceCell(&n);
        assert_eq!(cell.property(PropertyName::Name), Some("team-x".into()));
        assert_eq!(cell.property(PropertyName::Namespace), Some("".into()));
        assert_eq!(cell.property(PropertyName::Status), Some("Active".into()));
        assert_eq!(
            cell.property(PropertyName::CreationTimestamp),
            Some(ComparableValue::time(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
        );
        assert_eq!(cell.property(PropertyName::Capacity), None);
    }

    #[test]
    fn zero_value_namespace_has_absent_optional_fields() {
        let n = Namespace::default();
        let cell = NamespaceCell(&n);
        assert_eq!(cell.property(PropertyName::Name), Some("".into()));
        assert_eq!(cell.property(PropertyName::CreationTimestamp), None);
        assert_eq!(cell.property(PropertyName::Status), None);
    }

    #[test]
    fn cells_round_trip() {
        let list = vec![ns("a", Some("Active"), Some(1)), Namespace::default(), ns("b", None, None)];
        assert_eq!(from_cells(to_cells(&list)), list);
        let empty: Vec<Namespace> = Vec::new();
        assert_eq!(from_cells(to_cells(&empty)), empty);
    }

    #[test]
    fn build_namespace_labels_only_when_skipping() {
        let labels = NamespaceLabels::default();
        let plain = build_namespace(&NamespaceSpec::new("plain"), &labels);
        assert_eq!(plain.metadata.name.as_deref(), Some("plain"));
        assert_eq!(plain.metadata.labels, None);

        let skipped = build_namespace(&NamespaceSpec::new("team-x").skip_auto_propagation(true), &labels);
        let got = skipped.metadata.labels.expect("label applied");
        assert_eq!(got.get("namespace.karmada.io/skip-auto-propagation").map(String::as_str), Some("true"));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn select_namespaces_filters_on_status() {
        let list = vec![ns("a", Some("Active"), None), ns("b", Some("Terminating"), None), ns("c", None, None)];
        let q = DataSelectQuery::from_params([("filterBy", "status,Active")]).unwrap();
        let page = select_namespaces(&list, &q);
        assert_eq!(page.list_meta.total_items, 1);
        assert_eq!(page.namespaces[0].metadata.name.as_deref(), Some("a"));
        // input untouched
        assert_eq!(list.len(), 3);
    }
}
