//! Erasure aggregation
//!
//! Fans out one zone discovery per declared container, then one bulk zone
//! deletion per container for exactly the zones it discovered.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::discovery::discover_zones;
use super::join::{CompletionGroup, SharedState};
use super::progress::ProgressTracker;
use crate::error::{GdprError, Result, StoreError};
use crate::model::{ContainerDeclaration, ContainerId, DeletionResult, ZoneId};
use crate::store::{RecordStore, ZoneDeletion};

/// Delete every zone of every declared container
///
/// Resolves once every container is done, with the zones actually deleted per
/// container or the first failure observed.
pub(crate) async fn erase_zones(
    store: Arc<dyn RecordStore>,
    declaration: &ContainerDeclaration,
    progress: Option<Arc<ProgressTracker>>,
) -> Result<DeletionResult> {
    let state = SharedState::new(DeletionResult::new());
    let group = CompletionGroup::new();

    info!(
        "Erasing {} container(s) from {} store",
        declaration.len(),
        store.backend_name()
    );

    for container in declaration.keys() {
        if state.failed() {
            debug!("Not launching erasure of '{}' after a failure", container);
            break;
        }

        let unit = ContainerErasure {
            store: Arc::clone(&store),
            state: state.clone(),
            progress: progress.clone(),
            container: container.clone(),
        };
        group.spawn(&state, unit.run());
    }

    group.wait().await;
    let result = state.into_result()?;

    let total: usize = result.values().map(Vec::len).sum();
    info!("Deleted {} zone(s) across {} container(s)", total, result.len());
    Ok(result)
}

/// Erasure work of one container
struct ContainerErasure {
    store: Arc<dyn RecordStore>,
    state: SharedState<DeletionResult>,
    progress: Option<Arc<ProgressTracker>>,
    container: ContainerId,
}

impl ContainerErasure {
    async fn run(self) {
        let zones = match discover_zones(self.store.as_ref(), &self.container).await {
            Ok(zones) => zones,
            Err(e) => {
                self.state.fail(e);
                return;
            }
        };

        if self.state.failed() {
            debug!("Not deleting zones of '{}' after a failure", self.container);
            return;
        }

        debug!("Deleting {} zone(s) of '{}'", zones.len(), self.container);
        match self.delete(zones).await {
            Ok(deleted) => {
                let container = self.container.clone();
                self.state.merge_unless_failed(move |result| {
                    result.insert(container, deleted);
                });
            }
            Err(e) => {
                self.state.fail(e);
            }
        }
    }

    /// Drive one bulk deletion stream to its final outcome
    async fn delete(&self, zones: Vec<ZoneId>) -> Result<Vec<ZoneId>> {
        let mut events = self.store.delete_zones(&self.container, zones);
        let mut deleted = Vec::new();
        let mut rejection: Option<(ZoneId, StoreError)> = None;

        while let Some(event) = events.next().await {
            match event {
                ZoneDeletion::Acknowledged(zone) => {
                    debug!("Deleted zone '{}' of '{}'", zone, self.container);
                    if let Some(ref progress) = self.progress {
                        progress.add_zone();
                    }
                    deleted.push(zone);
                }
                ZoneDeletion::Rejected { zone, cause } => {
                    warn!("Zone '{}' of '{}' was not deleted: {}", zone, self.container, cause);
                    if rejection.is_none() {
                        rejection = Some((zone, cause));
                    }
                }
                ZoneDeletion::Finished(outcome) => {
                    return match (rejection, outcome) {
                        (Some((zone, cause)), _) => Err(self.failure(Some(zone), deleted, cause)),
                        (None, Err(cause)) => Err(self.failure(None, deleted, cause)),
                        (None, Ok(())) => Ok(deleted),
                    };
                }
            }
        }

        let cause = StoreError::Transport("deletion stream ended without an outcome".to_string());
        let zone = rejection.map(|(zone, _)| zone);
        Err(self.failure(zone, deleted, cause))
    }

    fn failure(&self, zone: Option<ZoneId>, deleted: Vec<ZoneId>, cause: StoreError) -> GdprError {
        GdprError::ZoneDeletionFailed {
            container: self.container.clone(),
            zone,
            deleted,
            cause,
        }
    }
}
