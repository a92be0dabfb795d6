//! Registry data model
//!
//! A registry is an ordered list of JSON objects of one kind. Field order
//! inside each entry is preserved from the source document, which is what
//! gives the CSV its column order.

pub mod aggregate;
pub mod invariants;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use aggregate::{aggregate_regions, RegionStats};
pub use invariants::{check_invariants, InvariantViolation};

/// A single registry entry (one JSON object)
pub type Entry = Map<String, JsonValue>;

/// The kinds of registry this tool knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Countries,
    Regions,
}

impl RegistryKind {
    /// The field that identifies an entry and defines the sort order
    pub fn key_field(&self) -> &'static str {
        match self {
            RegistryKind::Countries => "isoAlpha2",
            RegistryKind::Regions => "region",
        }
    }

    /// Whether derived statistics are computed for this kind before rendering
    pub fn aggregates(&self) -> bool {
        matches!(self, RegistryKind::Regions)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Countries => "countries",
            RegistryKind::Regions => "regions",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown registry type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for RegistryKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "countries" => Ok(RegistryKind::Countries),
            "regions" => Ok(RegistryKind::Regions),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Static description of one registry: where it lives and how it is titled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDescriptor {
    /// Registry kind, also the data/schema file stem (e.g. `countries`)
    pub list_type: RegistryKind,
    /// Template file stem and output file stem
    pub template_type: String,
    /// Singular name used for links inside the page (e.g. `country`)
    pub id_type: String,
    /// Display title (e.g. `Countries`)
    pub list_title: String,
}

impl RegistryDescriptor {
    pub fn new(
        list_type: RegistryKind,
        id_type: impl Into<String>,
        list_title: impl Into<String>,
    ) -> Self {
        Self {
            list_type,
            template_type: list_type.as_str().to_string(),
            id_type: id_type.into(),
            list_title: list_title.into(),
        }
    }

    /// Name used in logs and in the build report
    pub fn name(&self) -> &str {
        &self.template_type
    }

    pub fn defaults() -> Vec<RegistryDescriptor> {
        vec![
            RegistryDescriptor::new(RegistryKind::Countries, "country", "Countries"),
            RegistryDescriptor::new(RegistryKind::Regions, "region", "Regions"),
        ]
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry document must be a JSON array")]
    NotAnArray,

    #[error("Registry entry {index} is not a JSON object")]
    NotAnObject { index: usize },
}

/// An ordered, schema-validated registry of one kind
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    pub kind: RegistryKind,
    pub entries: Vec<Entry>,
}

impl Registry {
    pub fn new(kind: RegistryKind, entries: Vec<Entry>) -> Self {
        Self { kind, entries }
    }

    /// Build a registry from a parsed JSON document
    pub fn from_value(kind: RegistryKind, value: JsonValue) -> Result<Self, RegistryError> {
        let JsonValue::Array(items) = value else {
            return Err(RegistryError::NotAnArray);
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                JsonValue::Object(map) => Ok(map),
                _ => Err(RegistryError::NotAnObject { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { kind, entries })
    }

    /// The entry's key, if it is present and a string
    pub fn key_of<'a>(&self, entry: &'a Entry) -> Option<&'a str> {
        entry.get(self.kind.key_field()).and_then(JsonValue::as_str)
    }
}
