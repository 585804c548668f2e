//! Kard data selection: filter, count, sort and paginate any collection of
//! [`DataCell`]s through a declarative [`DataSelectQuery`].
//!
//! The pipeline is a pure function of its inputs. It never fails: unsupported
//! properties and mismatched value kinds degrade per item and are reported as
//! [`SelectionWarning`]s next to the page.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use kard_core::{CompareError, ComparableValue, DataCell, PropertyName, ValueKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod query;

pub use query::{
    ContinuationToken, DataSelectQuery, FilterBy, FilterQuery, Pagination, QueryError, SortBy, SortQuery,
};

/// Pipeline stage a warning was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Filter,
    Sort,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Stage::Filter => "filter", Stage::Sort => "sort" })
    }
}

/// Non-fatal condition met while selecting. Each distinct warning is reported once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SelectionWarning {
    UnsupportedProperty { property: PropertyName, stage: Stage },
    TypeMismatch { property: PropertyName, stage: Stage, expected: ValueKind, found: ValueKind },
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::UnsupportedProperty { property, stage } => {
                write!(f, "{stage}: property {property} is not supported by this resource kind")
            }
            SelectionWarning::TypeMismatch { property, stage, expected, found } => {
                write!(f, "{stage}: property {property} holds {found} values, expected {expected}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Items left after filtering, before pagination.
    pub total_items: usize,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<C> {
    pub list_meta: ListMeta,
    pub items: Vec<C>,
    /// Present when items follow this page.
    pub continue_token: Option<ContinuationToken>,
    pub warnings: Vec<SelectionWarning>,
}

impl<C> Selection<C> {
    /// Convert the page while keeping metadata, e.g. to unwrap cells.
    pub fn map_items<U>(self, f: impl FnOnce(Vec<C>) -> Vec<U>) -> Selection<U> {
        Selection {
            list_meta: self.list_meta,
            items: f(self.items),
            continue_token: self.continue_token,
            warnings: self.warnings,
        }
    }
}

#[derive(Default)]
struct Warnings(Vec<SelectionWarning>);

impl Warnings {
    fn push(&mut self, w: SelectionWarning) {
        if !self.0.contains(&w) { self.0.push(w); }
    }
}

/// Run filter → count → sort → paginate over `cells`.
pub fn select<C: DataCell>(cells: Vec<C>, query: &DataSelectQuery) -> Selection<C> {
    let started = Instant::now();
    let input = cells.len();
    let mut warnings = Warnings::default();

    let kept = apply_filter(cells, query.filter(), &mut warnings);
    let total = kept.len();
    let order = sort_order(&kept, query.sort(), &mut warnings);

    let (offset, limit) = query.pagination().window();
    let start = offset.min(total);
    let end = if limit == 0 { total } else { start.saturating_add(limit).min(total) };

    // Move the selected window out in permutation order; caller storage is never reordered.
    let mut slots: Vec<Option<C>> = kept.into_iter().map(Some).collect();
    let items: Vec<C> = order[start..end].iter().filter_map(|&i| slots[i].take()).collect();
    let continue_token = (end < total).then(|| ContinuationToken::at(end));

    metrics::histogram!("dataselect_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
    if !warnings.0.is_empty() {
        metrics::counter!("dataselect_warnings_total", warnings.0.len() as u64);
    }
    debug!(input, total, offset, limit, page = items.len(), warnings = warnings.0.len(), "data select");

    Selection { list_meta: ListMeta { total_items: total }, items, continue_token, warnings: warnings.0 }
}

fn apply_filter<C: DataCell>(cells: Vec<C>, filter: &FilterQuery, warnings: &mut Warnings) -> Vec<C> {
    if filter.is_empty() { return cells; }
    for f in filter.iter() {
        if !C::supports(f.property) {
            warnings.push(SelectionWarning::UnsupportedProperty { property: f.property, stage: Stage::Filter });
        }
    }
    let mut kept = Vec::with_capacity(cells.len());
    for cell in cells {
        if filter.iter().all(|f| matches(&cell, f, warnings)) {
            kept.push(cell);
        }
    }
    kept
}

/// Absent properties never match; a kind mismatch is a non-match for this item only.
fn matches<C: DataCell>(cell: &C, f: &FilterBy, warnings: &mut Warnings) -> bool {
    let Some(value) = cell.property(f.property) else { return false };
    match value.contains(&f.value) {
        Ok(m) => m,
        Err(CompareError::TypeMismatch { expected, found }) => {
            warnings.push(SelectionWarning::TypeMismatch { property: f.property, stage: Stage::Filter, expected, found });
            false
        }
    }
}

struct SortColumn {
    ascending: bool,
    values: Vec<Option<ComparableValue>>,
}

fn sort_order<C: DataCell>(cells: &[C], sort: &SortQuery, warnings: &mut Warnings) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cells.len()).collect();
    let mut columns: Vec<SortColumn> = Vec::new();
    for key in sort.iter() {
        if !C::supports(key.property) {
            warnings.push(SelectionWarning::UnsupportedProperty { property: key.property, stage: Stage::Sort });
            continue;
        }
        let mut values: Vec<Option<ComparableValue>> = cells.iter().map(|c| c.property(key.property)).collect();
        // Values outside the column's kind are read as absent so the order stays total.
        if let Some(expected) = column_kind(&values) {
            for slot in values.iter_mut() {
                let found = match slot { Some(v) if v.kind() != expected => v.kind(), _ => continue };
                warnings.push(SelectionWarning::TypeMismatch { property: key.property, stage: Stage::Sort, expected, found });
                *slot = None;
            }
        }
        columns.push(SortColumn { ascending: key.ascending, values });
    }
    if columns.is_empty() { return order; }

    // slice::sort_by is stable: equal keys keep input order.
    order.sort_by(|&a, &b| {
        for col in &columns {
            let ord = compare_slots(col.values[a].as_ref(), col.values[b].as_ref(), col.ascending);
            if ord != Ordering::Equal { return ord; }
        }
        Ordering::Equal
    });
    order
}

/// Most frequent kind among present values; ties go to the kind seen first.
fn column_kind(values: &[Option<ComparableValue>]) -> Option<ValueKind> {
    let mut counts: Vec<(ValueKind, usize)> = Vec::new();
    for kind in values.iter().flatten().map(ComparableValue::kind) {
        match counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((kind, 1)),
        }
    }
    let mut best: Option<(ValueKind, usize)> = None;
    for (kind, n) in counts {
        if best.map_or(true, |(_, m)| n > m) { best = Some((kind, n)); }
    }
    best.map(|(kind, _)| kind)
}

/// Absent values sort after present ones in either direction.
fn compare_slots(a: Option<&ComparableValue>, b: Option<&ComparableValue>, ascending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.compare(y).unwrap_or(Ordering::Equal);
            if ascending { ord } else { ord.reverse() }
        }
    }
}
