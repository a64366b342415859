//! Zone discovery for one container

use tracing::debug;

use crate::error::{GdprError, Result};
use crate::model::{ContainerId, ZoneId};
use crate::store::RecordStore;

/// List every zone of a container
///
/// # Arguments
/// * `store` - Record store to ask
/// * `container` - Declared container
///
/// # Returns
/// * `Result<Vec<ZoneId>>` - Zones (possibly none), `ZoneDiscoveryFailed` on
///   transport failure, `NoZonesReturned` when no zone list came back
pub async fn discover_zones(store: &dyn RecordStore, container: &ContainerId) -> Result<Vec<ZoneId>> {
    match store.discover_zones(container).await {
        Ok(Some(zones)) => {
            debug!(
                "Discovered {} zone(s) in container '{}' ({})",
                zones.len(),
                container,
                store.backend_name()
            );
            Ok(zones)
        }
        Ok(None) => Err(GdprError::NoZonesReturned(container.clone())),
        Err(cause) => Err(GdprError::ZoneDiscoveryFailed {
            container: container.clone(),
            cause,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_empty_zone_list_is_not_an_error() {
        let store = MemoryStore::new();
        store.add_container("app");
        let zones = tokio_test::assert_ok!(discover_zones(&store, &"app".into()).await);
        assert!(zones.is_empty());
    }

    #[tokio::test]
    async fn test_missing_zone_list() {
        let store = MemoryStore::new();
        store.add_container("app");
        store.omit_zone_list("app");
        let err = tokio_test::assert_err!(discover_zones(&store, &"app".into()).await);
        assert!(matches!(err, GdprError::NoZonesReturned(c) if c.as_str() == "app"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let store = MemoryStore::new();
        store.fail_discovery("app", StoreError::Transport("offline".to_string()));
        let err = discover_zones(&store, &"app".into()).await.unwrap_err();
        assert!(matches!(err, GdprError::ZoneDiscoveryFailed { .. }));
        assert_eq!(store.discover_calls(), 1);
    }
}
