//! Kard core types: property vocabulary, comparable values and the cell contract
//! every resource kind implements to take part in data selection.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod value;

pub use value::{CompareError, ComparableValue, ParseQuantityError, Quantity, ValueKind};

/// Closed vocabulary of properties a query can sort or filter on.
///
/// Wire names are camelCase; parsing is case-insensitive so `Name` and `name`
/// refer to the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyName {
    Name,
    Namespace,
    CreationTimestamp,
    Status,
    Type,
    Capacity,
}

impl PropertyName {
    pub const ALL: [PropertyName; 6] = [
        PropertyName::Name,
        PropertyName::Namespace,
        PropertyName::CreationTimestamp,
        PropertyName::Status,
        PropertyName::Type,
        PropertyName::Capacity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::Name => "name",
            PropertyName::Namespace => "namespace",
            PropertyName::CreationTimestamp => "creationTimestamp",
            PropertyName::Status => "status",
            PropertyName::Type => "type",
            PropertyName::Capacity => "capacity",
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown property: {0}")]
pub struct UnknownProperty(pub String);

impl FromStr for PropertyName {
    type Err = UnknownProperty;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownProperty(s.to_string()))
    }
}

/// Read-only view over one domain object, exposing named properties as
/// [`ComparableValue`]s.
///
/// `property` returns `None` for every name outside `SUPPORTED`. A supported
/// property may still be `None` for a particular object (field not set).
/// Neither case is an error: the selection pipeline treats the item as if the
/// key did not exist.
pub trait DataCell {
    /// Properties this resource kind can produce.
    const SUPPORTED: &'static [PropertyName];

    fn property(&self, name: PropertyName) -> Option<ComparableValue>;

    fn supports(name: PropertyName) -> bool {
        Self::SUPPORTED.contains(&name)
    }
}

pub mod prelude {
    pub use super::{ComparableValue, CompareError, DataCell, PropertyName, Quantity, ValueKind};
}
