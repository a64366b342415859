//! Output transformers turning aggregated records into export artifacts
//!
//! Three transformers ship with the crate:
//! - [`CsvTransformer`]: one CSV file per (container, record type)
//! - [`JsonTransformer`]: one JSON array file per (container, record type)
//! - [`IdentityTransformer`]: the aggregated mapping, untouched
//!
//! Artifact file names are `{prefix}_{recordType}.{ext}` where the prefix is
//! the container's display name, or a generated token if it has none.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ConfigError, GdprError, Result};
use crate::model::{AggregatedRecords, ContainerId, ContainerNameMapping, ExportArtifact};

pub mod csv;
pub mod identity;
pub mod json;

pub use csv::CsvTransformer;
pub use identity::IdentityTransformer;
pub use json::JsonTransformer;

/// Turns the merged result of an export into the caller's output type
#[async_trait]
pub trait DataTransformer: Send + Sync {
    type Output: Send;

    /// Transform the aggregated records
    ///
    /// # Arguments
    /// * `data` - Records of every declared container grouped by type
    /// * `names` - Display names used to name artifacts
    async fn transform_data(
        &self,
        data: AggregatedRecords,
        names: &ContainerNameMapping,
    ) -> Result<Self::Output>;
}

/// How a container without a display name is named in artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// Fresh random token on every export
    #[default]
    Random,
    /// Token derived from the container id, identical across exports
    Stable,
}

impl FromStr for NamingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(NamingStrategy::Random),
            "stable" => Ok(NamingStrategy::Stable),
            other => Err(ConfigError::InvalidValue {
                field: "export.naming".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Resolves artifact name prefixes for one transform call
///
/// Every file of one container within one call shares its prefix.
pub(crate) struct ArtifactNamer<'a> {
    names: &'a ContainerNameMapping,
    strategy: NamingStrategy,
    tokens: BTreeMap<ContainerId, String>,
}

impl<'a> ArtifactNamer<'a> {
    pub(crate) fn new(names: &'a ContainerNameMapping, strategy: NamingStrategy) -> Self {
        Self {
            names,
            strategy,
            tokens: BTreeMap::new(),
        }
    }

    /// Display name of the container, or its token
    pub(crate) fn prefix(&mut self, container: &ContainerId) -> String {
        if let Some(name) = self.names.get(container) {
            return name.clone();
        }

        let strategy = self.strategy;
        self.tokens
            .entry(container.clone())
            .or_insert_with(|| match strategy {
                NamingStrategy::Random => Uuid::new_v4().to_string(),
                NamingStrategy::Stable => {
                    Uuid::new_v5(&Uuid::NAMESPACE_OID, container.as_str().as_bytes()).to_string()
                }
            })
            .clone()
    }

    /// Full artifact file name
    pub(crate) fn file_name(&mut self, container: &ContainerId, record_type: &str, ext: &str) -> String {
        format!("{}_{}.{}", self.prefix(container), record_type, ext)
    }
}

/// Add one file to an artifact
///
/// Containers sharing a display name produce the same file names; the later
/// file replaces the earlier one.
///
/// # Returns
/// * `bool` - true if an earlier file of the same name was replaced
pub(crate) fn insert_file(artifact: &mut ExportArtifact, name: String, contents: String) -> bool {
    if artifact.contains_key(&name) {
        warn!("Artifact file '{}' produced twice, keeping the later one", name);
    }
    artifact.insert(name, contents).is_some()
}

/// Run a formatting routine on the blocking pool
pub(crate) async fn run_blocking<T, F>(label: &'static str, routine: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(routine)
        .await
        .map_err(|e| GdprError::Generic(format!("{label} transformer task failed: {e}")))?
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_wins() {
        let mut names = ContainerNameMapping::new();
        names.insert("app".into(), "default".to_string());
        let mut namer = ArtifactNamer::new(&names, NamingStrategy::Random);
        assert_eq!(namer.file_name(&"app".into(), "log", "csv"), "default_log.csv");
    }

    #[test]
    fn test_random_token_shared_within_call() {
        let names = ContainerNameMapping::new();
        let mut namer = ArtifactNamer::new(&names, NamingStrategy::Random);
        let first = namer.prefix(&"app".into());
        assert_eq!(namer.prefix(&"app".into()), first);
        assert!(Uuid::parse_str(&first).is_ok());

        let mut next_call = ArtifactNamer::new(&names, NamingStrategy::Random);
        assert_ne!(next_call.prefix(&"app".into()), first);
    }

    #[test]
    fn test_stable_token_is_deterministic() {
        let names = ContainerNameMapping::new();
        let a = ArtifactNamer::new(&names, NamingStrategy::Stable).prefix(&"app".into());
        let b = ArtifactNamer::new(&names, NamingStrategy::Stable).prefix(&"app".into());
        let other = ArtifactNamer::new(&names, NamingStrategy::Stable).prefix(&"docs".into());
        assert_eq!(a, b);
        assert_ne!(a, other);
    }

    #[test]
    fn test_insert_file_reports_replacement() {
        let mut artifact = ExportArtifact::new();
        assert!(!insert_file(&mut artifact, "a_log.csv".to_string(), "1".to_string()));
        assert!(insert_file(&mut artifact, "a_log.csv".to_string(), "2".to_string()));
        assert_eq!(artifact.len(), 1);
        assert_eq!(artifact["a_log.csv"], "2");
    }

    #[test]
    fn test_naming_strategy_from_str() {
        assert_eq!("Stable".parse::<NamingStrategy>().unwrap(), NamingStrategy::Stable);
        assert!("hash".parse::<NamingStrategy>().is_err());
    }
}
