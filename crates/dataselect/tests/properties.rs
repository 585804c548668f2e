//! Property tests for the selection pipeline: filter correctness, count
//! invariant, sort stability and lexicographic multi-key ordering.

use kard_core::{ComparableValue, DataCell, PropertyName};
use kard_dataselect::{select, DataSelectQuery, FilterBy, Pagination, SortBy};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Row {
    id: usize,
    name: Option<String>,
    rank: Option<i64>,
}

impl DataCell for Row {
    const SUPPORTED: &'static [PropertyName] = &[PropertyName::Name, PropertyName::Type];
    fn property(&self, name: PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Name => self.name.clone().map(ComparableValue::String),
            PropertyName::Type => self.rank.map(ComparableValue::Numeric),
            _ => None,
        }
    }
}

fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    // small alphabets so ties are common
    let row = (proptest::option::weighted(0.8, "[ab]{0,3}"), proptest::option::weighted(0.8, 0i64..4));
    proptest::collection::vec(row, 0..40).prop_map(|v| {
        v.into_iter()
            .enumerate()
            .map(|(id, (name, rank))| Row { id, name, rank })
            .collect()
    })
}

fn ids(rows: &[Row]) -> Vec<usize> { rows.iter().map(|r| r.id).collect() }

proptest! {
    #[test]
    fn filter_keeps_exactly_matching_rows(rows in arb_rows(), needle in "[ab]{0,2}") {
        let q = DataSelectQuery::new().filter_by(FilterBy::new(PropertyName::Name, needle.as_str()));
        let sel = select(rows.clone(), &q);
        let expected: Vec<usize> = rows
            .iter()
            .filter(|r| r.name.as_deref().map(|n| n.contains(needle.as_str())).unwrap_or(false))
            .map(|r| r.id)
            .collect();
        prop_assert_eq!(ids(&sel.items), expected);
    }

    #[test]
    fn total_ignores_pagination(rows in arb_rows(), needle in "[ab]{0,2}", offset in 0usize..50, limit in 0usize..10) {
        let base = DataSelectQuery::new().filter_by(FilterBy::new(PropertyName::Name, needle.as_str()));
        let unpaged = select(rows.clone(), &base);
        let paged = select(rows, &base.clone().paginate(Pagination::Offset { offset, limit }));
        let total = unpaged.items.len();
        prop_assert_eq!(paged.list_meta.total_items, total);
        prop_assert_eq!(unpaged.list_meta.total_items, total);
        let expected_len = if offset >= total { 0 } else if limit == 0 { total - offset } else { limit.min(total - offset) };
        prop_assert_eq!(paged.items.len(), expected_len);
        prop_assert_eq!(paged.continue_token.is_some(), offset + expected_len < total);
    }

    #[test]
    fn sort_preserves_input_order_for_ties(rows in arb_rows()) {
        let q = DataSelectQuery::new().sort_by(SortBy::asc(PropertyName::Type));
        let sel = select(rows, &q);
        for pair in sel.items.windows(2) {
            if pair[0].rank == pair[1].rank {
                prop_assert!(pair[0].id < pair[1].id, "tie reordered: {:?}", pair);
            }
        }
    }

    #[test]
    fn multi_key_equals_chained_stable_sorts(rows in arb_rows()) {
        let combined = DataSelectQuery::new()
            .sort_by(SortBy::asc(PropertyName::Type))
            .sort_by(SortBy::desc(PropertyName::Name));
        let by_secondary = select(rows.clone(), &DataSelectQuery::new().sort_by(SortBy::desc(PropertyName::Name)));
        let chained = select(by_secondary.items, &DataSelectQuery::new().sort_by(SortBy::asc(PropertyName::Type)));
        prop_assert_eq!(ids(&select(rows, &combined).items), ids(&chained.items));
    }
}
