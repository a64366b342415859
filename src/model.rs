//! Core data model shared by the engine, the stores and the transformers
//!
//! Every container, zone and record type is an opaque string as far as the
//! engine is concerned. The aggregated mappings are `BTreeMap`s so that
//! artifact naming and serialization come out in a stable order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bson::Document;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a top-level record container
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque identifier of a storage zone inside a container
///
/// Zones are discovered, never created, and are the unit of bulk deletion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name of a record type holding personal data
pub type RecordType = String;

/// A typed, sparsely keyed record
///
/// No schema is enforced: two records of the same type may carry different
/// field sets. Field order is the order the store delivered them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record type tag
    pub record_type: RecordType,
    /// Field name to value mapping
    pub fields: Document,
}

impl Record {
    pub fn new(record_type: impl Into<RecordType>, fields: Document) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
        }
    }

    /// Field names present on this record
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

/// Which record types of which containers hold personal data
pub type ContainerDeclaration = BTreeMap<ContainerId, BTreeSet<RecordType>>;

/// Human readable container names used to name export artifacts
pub type ContainerNameMapping = BTreeMap<ContainerId, String>;

/// Records of one container grouped by record type
pub type RecordsByType = BTreeMap<RecordType, Vec<Record>>;

/// container -> record type -> records
pub type AggregatedRecords = BTreeMap<ContainerId, RecordsByType>;

/// container -> zones that were actually deleted
pub type DeletionResult = BTreeMap<ContainerId, Vec<ZoneId>>;

/// file name -> file contents
pub type ExportArtifact = BTreeMap<String, String>;

/// Opaque continuation token returned by a paginated query
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor(bson::Bson);

impl Cursor {
    pub fn new(token: bson::Bson) -> Self {
        Self(token)
    }

    pub fn token(&self) -> &bson::Bson {
        &self.0
    }

    pub fn into_token(self) -> bson::Bson {
        self.0
    }
}

/// Filter applied to every page of a walk
///
/// An empty filter document matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    filter: Document,
}

impl Predicate {
    /// Predicate matching every record
    pub fn always_true() -> Self {
        Self::default()
    }

    pub fn from_filter(filter: Document) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    /// Equality match of every filter entry against the record fields
    pub fn matches(&self, record: &Record) -> bool {
        self.filter
            .iter()
            .all(|(key, value)| record.fields.get(key) == Some(value))
    }
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    /// Present when more pages remain
    pub next_cursor: Option<Cursor>,
}
