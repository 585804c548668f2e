//! Comparable values: the common currency for sorting and filtering.
//!
//! A resource field is lifted into one of a small closed set of tagged values.
//! Two values only compare when they carry the same tag; anything else is a
//! [`CompareError::TypeMismatch`] the caller can recover from.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag of a [`ComparableValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    String,
    Time,
    Numeric,
    Quantity,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::String => "string",
            ValueKind::Time => "time",
            ValueKind::Numeric => "numeric",
            ValueKind::Quantity => "quantity",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("type mismatch: cannot compare {expected} value with {found} value")]
    TypeMismatch { expected: ValueKind, found: ValueKind },
}

/// A field value lifted out of a resource for generic sort/filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ComparableValue {
    String(String),
    Time(DateTime<Utc>),
    Numeric(i64),
    Quantity(Quantity),
}

impl ComparableValue {
    pub fn string(s: impl Into<String>) -> Self { Self::String(s.into()) }
    pub fn time(t: DateTime<Utc>) -> Self { Self::Time(t) }
    pub fn numeric(n: i64) -> Self { Self::Numeric(n) }
    pub fn quantity(q: Quantity) -> Self { Self::Quantity(q) }

    /// Parse an RFC3339 timestamp into a `Time` value.
    pub fn rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        let t = DateTime::parse_from_rfc3339(s)?;
        Ok(Self::Time(t.with_timezone(&Utc)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ComparableValue::String(_) => ValueKind::String,
            ComparableValue::Time(_) => ValueKind::Time,
            ComparableValue::Numeric(_) => ValueKind::Numeric,
            ComparableValue::Quantity(_) => ValueKind::Quantity,
        }
    }

    /// Three-way comparison against a value of the same kind.
    pub fn compare(&self, other: &ComparableValue) -> Result<Ordering, CompareError> {
        match (self, other) {
            (ComparableValue::String(a), ComparableValue::String(b)) => Ok(a.cmp(b)),
            (ComparableValue::Time(a), ComparableValue::Time(b)) => Ok(a.cmp(b)),
            (ComparableValue::Numeric(a), ComparableValue::Numeric(b)) => Ok(a.cmp(b)),
            (ComparableValue::Quantity(a), ComparableValue::Quantity(b)) => Ok(a.cmp_value(b)),
            _ => Err(CompareError::TypeMismatch { expected: self.kind(), found: other.kind() }),
        }
    }

    /// Filter predicate. Strings match on case-sensitive substring; every
    /// other kind matches on equality.
    pub fn contains(&self, needle: &ComparableValue) -> Result<bool, CompareError> {
        match (self, needle) {
            (ComparableValue::String(hay), ComparableValue::String(n)) => Ok(hay.contains(n.as_str())),
            _ => self.compare(needle).map(|o| o == Ordering::Equal),
        }
    }
}

impl From<String> for ComparableValue {
    fn from(s: String) -> Self { Self::String(s) }
}

impl From<&str> for ComparableValue {
    fn from(s: &str) -> Self { Self::String(s.to_string()) }
}

impl From<DateTime<Utc>> for ComparableValue {
    fn from(t: DateTime<Utc>) -> Self { Self::Time(t) }
}

impl From<i64> for ComparableValue {
    fn from(n: i64) -> Self { Self::Numeric(n) }
}

impl From<Quantity> for ComparableValue {
    fn from(q: Quantity) -> Self { Self::Quantity(q) }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparableValue::String(s) => f.write_str(s),
            ComparableValue::Time(t) => write!(f, "{}", t.to_rfc3339()),
            ComparableValue::Numeric(n) => write!(f, "{}", n),
            ComparableValue::Quantity(q) => f.write_str(q.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseQuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid quantity number: {0}")]
    InvalidNumber(String),
    #[error("unknown quantity suffix: {0}")]
    UnknownSuffix(String),
}

/// Kubernetes resource quantity (`128Mi`, `500m`, `1.5`, `2e3`).
///
/// Keeps the original text for display and a normalized base-unit value for
/// ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    raw: String,
    value: f64,
}

impl Quantity {
    pub fn parse(s: &str) -> Result<Self, ParseQuantityError> {
        let t = s.trim();
        if t.is_empty() { return Err(ParseQuantityError::Empty); }
        // number part: optional sign, then digits and at most the dots f64 accepts
        let split = t
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '+' || c == '-'))))
            .map(|(i, _)| i)
            .unwrap_or(t.len());
        let (num, suffix) = t.split_at(split);
        let base: f64 = num
            .parse()
            .map_err(|_| ParseQuantityError::InvalidNumber(num.to_string()))?;
        let multiplier = suffix_multiplier(suffix)?;
        let value = base * multiplier;
        if !value.is_finite() {
            return Err(ParseQuantityError::InvalidNumber(t.to_string()));
        }
        Ok(Self { raw: t.to_string(), value })
    }

    pub fn as_str(&self) -> &str { &self.raw }

    /// Value in base units (bytes, cores, ...).
    pub fn value(&self) -> f64 { self.value }

    fn cmp_value(&self, other: &Quantity) -> Ordering { self.value.total_cmp(&other.value) }
}

fn suffix_multiplier(suffix: &str) -> Result<f64, ParseQuantityError> {
    const KI: f64 = 1024.0;
    let m = match suffix {
        "" => 1.0,
        "Ki" => KI,
        "Mi" => KI.powi(2),
        "Gi" => KI.powi(3),
        "Ti" => KI.powi(4),
        "Pi" => KI.powi(5),
        "Ei" => KI.powi(6),
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => {
            // decimal exponent form: 2e3, 1E-2
            let exp = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .and_then(|e| e.parse::<i32>().ok())
                .ok_or_else(|| ParseQuantityError::UnknownSuffix(suffix.to_string()))?;
            10f64.powi(exp)
        }
    };
    Ok(m)
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Quantity {
    type Error = ParseQuantityError;
    fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self { q.raw }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn q(s: &str) -> Quantity { Quantity::parse(s).unwrap() }

    #[test]
    fn strings_compare_lexically() {
        let a = ComparableValue::string("ns-a");
        let b = ComparableValue::string("ns-b");
        assert_eq!(a.compare(&b), Ok(Ordering::Less));
        assert_eq!(b.compare(&a), Ok(Ordering::Greater));
        assert_eq!(a.compare(&a.clone()), Ok(Ordering::Equal));
    }

    #[test]
    fn mismatched_tags_are_a_checked_error() {
        let s = ComparableValue::string("1");
        let n = ComparableValue::numeric(1);
        assert_eq!(
            s.compare(&n),
            Err(CompareError::TypeMismatch { expected: ValueKind::String, found: ValueKind::Numeric })
        );
        assert!(n.contains(&s).is_err());
    }

    #[test]
    fn contains_is_case_sensitive_substring_for_strings() {
        let v = ComparableValue::string("team-platform");
        assert_eq!(v.contains(&"platform".into()), Ok(true));
        assert_eq!(v.contains(&"Platform".into()), Ok(false));
        assert_eq!(v.contains(&"".into()), Ok(true));
    }

    #[test]
    fn contains_is_equality_for_non_strings() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(ComparableValue::time(t).contains(&ComparableValue::time(t)), Ok(true));
        assert_eq!(ComparableValue::numeric(3).contains(&ComparableValue::numeric(30)), Ok(false));
        assert_eq!(ComparableValue::quantity(q("1Ki")).contains(&ComparableValue::quantity(q("1024"))), Ok(true));
    }

    #[test]
    fn time_compares_by_instant() {
        let a = ComparableValue::rfc3339("2024-01-01T10:00:00+02:00").unwrap();
        let b = ComparableValue::rfc3339("2024-01-01T09:00:00Z").unwrap();
        assert_eq!(a.compare(&b), Ok(Ordering::Less));
    }

    #[test]
    fn quantity_suffixes_normalize() {
        assert_eq!(q("1Ki").value(), 1024.0);
        assert_eq!(q("2Mi").value(), 2.0 * 1024.0 * 1024.0);
        assert_eq!(q("500m").value(), 0.5);
        assert_eq!(q("1.5").value(), 1.5);
        assert_eq!(q("2e3").value(), 2000.0);
        assert_eq!(q("1E").value(), 1e18);
        assert_eq!(q("1k").value(), 1000.0);
        assert_eq!(q("1G").as_str(), "1G");
    }

    #[test]
    fn quantity_ordering_spans_suffix_families() {
        let small = ComparableValue::quantity(q("1000M"));
        let big = ComparableValue::quantity(q("1Gi"));
        assert_eq!(small.compare(&big), Ok(Ordering::Less));
    }

    #[test]
    fn quantity_rejects_garbage() {
        assert_eq!(Quantity::parse(""), Err(ParseQuantityError::Empty));
        assert!(matches!(Quantity::parse("Mi"), Err(ParseQuantityError::InvalidNumber(_))));
        assert!(matches!(Quantity::parse("10Xi"), Err(ParseQuantityError::UnknownSuffix(_))));
    }
}
