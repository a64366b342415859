use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;
use crate::model::{ContainerId, RecordType, ZoneId};

/// Crate-wide `Result` type using [`GdprError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, GdprError>;

/// Top-level error type for export and erasure operations.
///
/// An operation resolves to exactly one of these, the first failure observed
/// among all of its concurrently running units.
#[derive(Debug)]
pub enum GdprError {
    /// Listing the zones of a container failed at the transport level.
    ZoneDiscoveryFailed {
        container: ContainerId,
        cause: StoreError,
    },

    /// The transport reported success but returned no zone list at all.
    NoZonesReturned(ContainerId),

    /// One page of a paginated walk failed.
    PageFetchFailed {
        container: ContainerId,
        zone: ZoneId,
        record_type: RecordType,
        cause: StoreError,
    },

    /// Bulk zone deletion failed for a container.
    ///
    /// `zone` names the rejected zone when the store reported a per-zone
    /// failure; `deleted` lists the zones acknowledged before the failure.
    ZoneDeletionFailed {
        container: ContainerId,
        zone: Option<ZoneId>,
        deleted: Vec<ZoneId>,
        cause: StoreError,
    },

    /// A transformer could not encode its output.
    SerializationFailed(String),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors outside of a store call (connecting, pinging).
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Failures reported by a record store backend.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Transport failure described by a message.
    Transport(String),

    /// MongoDB driver failure.
    MongoDb(mongodb::error::Error),

    /// The container is not known to the store.
    UnknownContainer(ContainerId),

    /// The zone is not known to the store.
    UnknownZone(ZoneId),

    /// A continuation cursor the store did not issue.
    InvalidCursor(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Anything else.
    Generic(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for GdprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GdprError::ZoneDiscoveryFailed { container, cause } => {
                write!(f, "Failed to fetch zones of container '{container}': {cause}")
            }
            GdprError::NoZonesReturned(container) => {
                write!(f, "No zone list returned for container '{container}'")
            }
            GdprError::PageFetchFailed {
                container,
                zone,
                record_type,
                cause,
            } => write!(
                f,
                "Failed to fetch '{record_type}' records from zone '{zone}' of container '{container}': {cause}"
            ),
            GdprError::ZoneDeletionFailed {
                container,
                zone,
                deleted,
                cause,
            } => {
                match zone {
                    Some(zone) => write!(
                        f,
                        "Failed to delete zone '{zone}' of container '{container}': {cause}"
                    )?,
                    None => write!(
                        f,
                        "Failed to delete zones of container '{container}': {cause}"
                    )?,
                }
                if !deleted.is_empty() {
                    write!(f, " ({} zone(s) already deleted)", deleted.len())?;
                }
                Ok(())
            }
            GdprError::SerializationFailed(msg) => write!(f, "Serialization failed: {msg}"),
            GdprError::Config(e) => write!(f, "Configuration error: {e}"),
            GdprError::Io(e) => write!(f, "I/O error: {e}"),
            GdprError::MongoDb(e) => format_mongodb_error(f, e),
            GdprError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Transport(msg) => write!(f, "{msg}"),
            StoreError::MongoDb(e) => format_mongodb_error(f, e),
            StoreError::UnknownContainer(container) => {
                write!(f, "Unknown container: {container}")
            }
            StoreError::UnknownZone(zone) => write!(f, "Unknown zone: {zone}"),
            StoreError::InvalidCursor(msg) => write!(f, "Invalid cursor: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GdprError {}
impl std::error::Error for StoreError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions ========================= */

impl From<io::Error> for GdprError {
    fn from(err: io::Error) -> Self {
        GdprError::Io(err)
    }
}

impl From<mongodb::error::Error> for GdprError {
    fn from(err: mongodb::error::Error) -> Self {
        GdprError::MongoDb(err)
    }
}

impl From<ConfigError> for GdprError {
    fn from(err: ConfigError) -> Self {
        GdprError::Config(err)
    }
}

impl From<serde_json::Error> for GdprError {
    fn from(err: serde_json::Error) -> Self {
        GdprError::SerializationFailed(err.to_string())
    }
}

impl From<String> for GdprError {
    fn from(msg: String) -> Self {
        GdprError::Generic(msg)
    }
}

impl From<&str> for GdprError {
    fn from(msg: &str) -> Self {
        GdprError::Generic(msg.to_owned())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::MongoDb(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::InvalidFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_discovery_display() {
        let err = GdprError::ZoneDiscoveryFailed {
            container: "docs".into(),
            cause: StoreError::Transport("network unreachable".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch zones of container 'docs': network unreachable"
        );
    }

    #[test]
    fn test_zone_deletion_display_mentions_partial_progress() {
        let err = GdprError::ZoneDeletionFailed {
            container: "docs".into(),
            zone: Some("z2".into()),
            deleted: vec!["z1".into()],
            cause: StoreError::Transport("quota".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("zone 'z2'"));
        assert!(msg.contains("1 zone(s) already deleted"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: GdprError = ConfigError::MissingField("containers".to_string()).into();
        assert!(matches!(err, GdprError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field: containers"
        );
    }
}
