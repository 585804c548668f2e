//! Query description: sort keys, filter predicates and pagination.
//!
//! A [`DataSelectQuery`] is built either programmatically through its builder
//! methods or parsed from dashboard query parameters:
//!
//! - `sortBy=a,name,d,creationTimestamp`
//! - `filterBy=name,team,status,Active`
//! - `itemsPerPage=10&page=2` (pages start at 1)
//! - `offset=20&limit=10`
//! - `continue=<token>&limit=10`

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use kard_core::{ComparableValue, PropertyName, Quantity};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{param}: unknown property {name:?}")]
    UnknownProperty { param: &'static str, name: String },
    #[error("sortBy: unknown sort direction {0:?} (expected \"a\" or \"d\")")]
    UnknownSortDirection(String),
    #[error("{param}: expected comma-separated pairs, got {count} items")]
    OddPairs { param: &'static str, count: usize },
    #[error("{param}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { param: &'static str, value: String },
    #[error("continue: invalid token")]
    InvalidContinueToken,
    #[error("conflicting pagination parameters: {0}")]
    ConflictingPagination(String),
    #[error("page: requires itemsPerPage")]
    PageWithoutItemsPerPage,
    #[error("filterBy: {property} expects {expected}, got {value:?}")]
    InvalidFilterValue { property: PropertyName, expected: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBy {
    pub property: PropertyName,
    pub ascending: bool,
}

impl SortBy {
    pub fn asc(property: PropertyName) -> Self { Self { property, ascending: true } }
    pub fn desc(property: PropertyName) -> Self { Self { property, ascending: false } }
}

/// Ordered sort keys; the first key dominates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SortQuery {
    pub sort_by: SmallVec<[SortBy; 4]>,
}

impl SortQuery {
    pub fn is_empty(&self) -> bool { self.sort_by.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &SortBy> { self.sort_by.iter() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBy {
    pub property: PropertyName,
    pub value: ComparableValue,
}

impl FilterBy {
    pub fn new(property: PropertyName, value: impl Into<ComparableValue>) -> Self {
        Self { property, value: value.into() }
    }
}

/// Filter predicates; every one must match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterQuery {
    pub filter_by: SmallVec<[FilterBy; 4]>,
}

impl FilterQuery {
    pub fn is_empty(&self) -> bool { self.filter_by.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &FilterBy> { self.filter_by.iter() }
}

const TOKEN_PREFIX: &str = "kard.v1:";

/// Opaque continuation token pointing at the next page's first item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContinuationToken {
    offset: usize,
}

impl ContinuationToken {
    pub fn at(offset: usize) -> Self { Self { offset } }

    pub fn offset(&self) -> usize { self.offset }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}{}", TOKEN_PREFIX, self.offset))
    }

    pub fn decode(token: &str) -> Result<Self, QueryError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| QueryError::InvalidContinueToken)?;
        let text = String::from_utf8(bytes).map_err(|_| QueryError::InvalidContinueToken)?;
        let offset = text
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or(QueryError::InvalidContinueToken)?;
        Ok(Self { offset })
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.encode()) }
}

impl TryFrom<String> for ContinuationToken {
    type Error = QueryError;
    fn try_from(s: String) -> Result<Self, Self::Error> { Self::decode(&s) }
}

impl From<ContinuationToken> for String {
    fn from(t: ContinuationToken) -> Self { t.encode() }
}

/// Which window of the sorted sequence to return. A `limit` of 0 is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Pagination {
    #[default]
    Unbounded,
    Offset { offset: usize, limit: usize },
    Continue { token: ContinuationToken, limit: usize },
}

impl Pagination {
    /// Page-based window; `page` starts at 1 (0 is read as 1).
    pub fn page(page: usize, items_per_page: usize) -> Self {
        let offset = page.max(1).saturating_sub(1).saturating_mul(items_per_page);
        Pagination::Offset { offset, limit: items_per_page }
    }

    /// Resolve to `(offset, limit)`.
    pub fn window(&self) -> (usize, usize) {
        match *self {
            Pagination::Unbounded => (0, 0),
            Pagination::Offset { offset, limit } => (offset, limit),
            Pagination::Continue { token, limit } => (token.offset(), limit),
        }
    }
}

/// Immutable description of the requested list view. Every axis defaults to
/// identity: no filter, no sort, no pagination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataSelectQuery {
    sort: SortQuery,
    filter: FilterQuery,
    pagination: Pagination,
}

impl DataSelectQuery {
    pub fn new() -> Self { Self::default() }

    pub fn sort_by(mut self, key: SortBy) -> Self {
        self.sort.sort_by.push(key);
        self
    }

    pub fn filter_by(mut self, filter: FilterBy) -> Self {
        self.filter.filter_by.push(filter);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn sort(&self) -> &SortQuery { &self.sort }
    pub fn filter(&self) -> &FilterQuery { &self.filter }
    pub fn pagination(&self) -> &Pagination { &self.pagination }

    pub fn is_identity(&self) -> bool {
        self.sort.is_empty() && self.filter.is_empty() && self.pagination == Pagination::Unbounded
    }

    /// Parse dashboard query parameters. Unknown keys are ignored and an
    /// empty value is the same as an absent one; when a key repeats the last
    /// value wins.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (k, v) in params {
            let v = v.as_ref().trim();
            if v.is_empty() { continue; }
            map.insert(k.as_ref().to_string(), v.to_string());
        }

        let mut query = DataSelectQuery::new();
        if let Some(raw) = map.get("sortBy") {
            query.sort = parse_sort(raw)?;
        }
        if let Some(raw) = map.get("filterBy") {
            query.filter = parse_filter(raw)?;
        }
        query.pagination = parse_pagination(&map)?;
        Ok(query)
    }
}

fn pairs<'a>(param: &'static str, raw: &'a str) -> Result<Vec<(&'a str, &'a str)>, QueryError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() % 2 == 1 {
        return Err(QueryError::OddPairs { param, count: parts.len() });
    }
    Ok(parts.chunks(2).map(|c| (c[0], c[1])).collect())
}

fn property(param: &'static str, name: &str) -> Result<PropertyName, QueryError> {
    name.parse::<PropertyName>()
        .map_err(|_| QueryError::UnknownProperty { param, name: name.to_string() })
}

fn parse_sort(raw: &str) -> Result<SortQuery, QueryError> {
    let mut sort = SortQuery::default();
    for (dir, name) in pairs("sortBy", raw)? {
        let ascending = match dir {
            "a" | "A" => true,
            "d" | "D" => false,
            other => return Err(QueryError::UnknownSortDirection(other.to_string())),
        };
        sort.sort_by.push(SortBy { property: property("sortBy", name)?, ascending });
    }
    Ok(sort)
}

fn parse_filter(raw: &str) -> Result<FilterQuery, QueryError> {
    let mut filter = FilterQuery::default();
    for (name, value) in pairs("filterBy", raw)? {
        let prop = property("filterBy", name)?;
        filter.filter_by.push(FilterBy::new(prop, needle(prop, value)?));
    }
    Ok(filter)
}

/// Filter value typed after the property it is compared with.
fn needle(property: PropertyName, value: &str) -> Result<ComparableValue, QueryError> {
    let invalid = |expected| QueryError::InvalidFilterValue { property, expected, value: value.to_string() };
    match property {
        PropertyName::CreationTimestamp => ComparableValue::rfc3339(value).map_err(|_| invalid("an RFC 3339 timestamp")),
        PropertyName::Capacity => Quantity::parse(value).map(ComparableValue::Quantity).map_err(|_| invalid("a quantity")),
        _ => Ok(ComparableValue::string(value)),
    }
}

fn number(map: &HashMap<String, String>, param: &'static str) -> Result<Option<usize>, QueryError> {
    match map.get(param) {
        None => Ok(None),
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|_| QueryError::InvalidNumber { param, value: v.clone() }),
    }
}

fn parse_pagination(map: &HashMap<String, String>) -> Result<Pagination, QueryError> {
    let items_per_page = number(map, "itemsPerPage")?;
    let page = number(map, "page")?;
    let offset = number(map, "offset")?;
    let limit = number(map, "limit")?;
    let token = map.get("continue").map(|t| ContinuationToken::decode(t)).transpose()?;

    let modes = [items_per_page.is_some(), offset.is_some(), token.is_some()]
        .iter()
        .filter(|m| **m)
        .count();
    if modes > 1 {
        return Err(QueryError::ConflictingPagination(
            "use only one of itemsPerPage/page, offset/limit or continue".to_string(),
        ));
    }
    if page.is_some() && items_per_page.is_none() {
        return Err(QueryError::PageWithoutItemsPerPage);
    }
    if items_per_page.is_some() && limit.is_some() {
        return Err(QueryError::ConflictingPagination("itemsPerPage and limit both set".to_string()));
    }

    let pagination = match (items_per_page, offset, token) {
        (Some(ipp), _, _) => Pagination::page(page.unwrap_or(1), ipp),
        (_, Some(offset), _) => Pagination::Offset { offset, limit: limit.unwrap_or(0) },
        (_, _, Some(token)) => Pagination::Continue { token, limit: limit.unwrap_or(0) },
        (None, None, None) => match limit {
            Some(limit) => Pagination::Offset { offset: 0, limit },
            None => Pagination::Unbounded,
        },
    };
    Ok(pagination)
}
