#![forbid(unsafe_code)]

use chrono::{TimeZone, Utc};
use kard_core::{ComparableValue, DataCell, PropertyName};
use kard_dataselect::{select, DataSelectQuery, FilterBy, Pagination, SelectionWarning, SortBy, Stage};

#[derive(Debug, Clone)]
struct Obj {
    name: String,
    ts: Option<i64>,
}

impl DataCell for Obj {
    const SUPPORTED: &'static [PropertyName] = &[PropertyName::Name, PropertyName::CreationTimestamp];
    fn property(&self, name: PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Name => Some(self.name.as_str().into()),
            PropertyName::CreationTimestamp => self.ts.and_then(|s| Utc.timestamp_opt(s, 0).single()).map(Into::into),
            _ => None,
        }
    }
}

fn obj(name: &str, ts: Option<i64>) -> Obj { Obj { name: name.to_string(), ts } }

fn names(items: &[Obj]) -> Vec<&str> { items.iter().map(|o| o.name.as_str()).collect() }

#[test]
fn sort_by_name_then_second_page_of_two() {
    let cells: Vec<Obj> = ["ns-e", "ns-a", "ns-c", "ns-b", "ns-d"].iter().map(|n| obj(n, None)).collect();
    let q = DataSelectQuery::new()
        .sort_by(SortBy::asc(PropertyName::Name))
        .paginate(Pagination::Offset { offset: 1, limit: 2 });
    let sel = select(cells, &q);
    assert_eq!(sel.list_meta.total_items, 5);
    assert_eq!(names(&sel.items), vec!["ns-b", "ns-c"]);
    assert!(sel.warnings.is_empty());
}

#[test]
fn dashboard_params_drive_the_pipeline() {
    let cells = vec![obj("old", Some(100)), obj("new", Some(300)), obj("pending", None), obj("mid", Some(200))];
    let q = DataSelectQuery::from_params([("sortBy", "d,creationTimestamp"), ("itemsPerPage", "2"), ("page", "1")]).unwrap();
    let sel = select(cells.clone(), &q);
    assert_eq!(names(&sel.items), vec!["new", "mid"]);
    assert_eq!(sel.list_meta.total_items, 4);

    let token = sel.continue_token.expect("second page exists").encode();
    let next = DataSelectQuery::from_params([("sortBy", "d,creationTimestamp"), ("continue", token.as_str()), ("limit", "2")]).unwrap();
    let sel = select(cells, &next);
    // objects without a timestamp sort last in either direction
    assert_eq!(names(&sel.items), vec!["old", "pending"]);
    assert!(sel.continue_token.is_none());
}

#[test]
fn timestamp_filter_matches_exact_instant() {
    let cells = vec![obj("a", Some(1)), obj("b", Some(2)), obj("c", None)];
    let q = DataSelectQuery::from_params([("filterBy", "creationTimestamp,1970-01-01T00:00:02Z")]).unwrap();
    let sel = select(cells, &q);
    assert_eq!(names(&sel.items), vec!["b"]);
    assert_eq!(sel.list_meta.total_items, 1);
    assert!(sel.warnings.is_empty());
}

#[test]
fn string_filter_on_time_property_degrades_to_no_match() {
    let cells = vec![obj("a", Some(1)), obj("b", Some(2))];
    let q = DataSelectQuery::new().filter_by(FilterBy::new(PropertyName::CreationTimestamp, "1970"));
    let sel = select(cells, &q);
    assert!(sel.items.is_empty());
    assert_eq!(sel.list_meta.total_items, 0);
    assert!(matches!(
        sel.warnings.as_slice(),
        [SelectionWarning::TypeMismatch { property: PropertyName::CreationTimestamp, stage: Stage::Filter, .. }]
    ));
}

#[test]
fn warnings_serialize_for_api_responses() {
    let w = SelectionWarning::UnsupportedProperty { property: PropertyName::Capacity, stage: Stage::Sort };
    let json = serde_json::to_value(&w).unwrap();
    assert_eq!(json, serde_json::json!({"reason": "unsupportedProperty", "property": "capacity", "stage": "sort"}));
    assert_eq!(w.to_string(), "sort: property capacity is not supported by this resource kind");
}
