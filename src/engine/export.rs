//! Export aggregation
//!
//! Fans out one zone discovery per declared container, then one walker per
//! (zone, record type), and fans the records back into a single
//! [`AggregatedRecords`] mapping.

use std::sync::Arc;

use tracing::{debug, info};

use super::discovery::discover_zones;
use super::join::{CompletionGroup, SharedState};
use super::walker::QueryWalker;
use crate::error::Result;
use crate::model::{AggregatedRecords, ContainerDeclaration, ContainerId, RecordType, ZoneId};
use crate::store::RecordStore;

/// Fetch every declared record of every declared container
///
/// Resolves once every discovery and every walker has finished, with either
/// the merged records or the first failure observed.
pub(crate) async fn aggregate_records(
    store: Arc<dyn RecordStore>,
    declaration: &ContainerDeclaration,
    walker: QueryWalker,
) -> Result<AggregatedRecords> {
    let state = SharedState::new(AggregatedRecords::new());
    let group = CompletionGroup::new();

    info!(
        "Exporting {} container(s) from {} store",
        declaration.len(),
        store.backend_name()
    );

    for (container, record_types) in declaration {
        if state.failed() {
            debug!("Not launching export of '{}' after a failure", container);
            break;
        }

        let unit = ContainerExport {
            store: Arc::clone(&store),
            walker: walker.clone(),
            state: state.clone(),
            group: group.clone(),
            container: container.clone(),
            record_types: record_types.iter().cloned().collect(),
        };
        group.spawn(&state, unit.run());
    }

    group.wait().await;
    let records = state.into_result()?;

    let total: usize = records
        .values()
        .flat_map(|by_type| by_type.values())
        .map(Vec::len)
        .sum();
    info!("Fetched {} record(s) across {} container(s)", total, records.len());
    Ok(records)
}

/// Export work of one container
struct ContainerExport {
    store: Arc<dyn RecordStore>,
    walker: QueryWalker,
    state: SharedState<AggregatedRecords>,
    group: CompletionGroup,
    container: ContainerId,
    record_types: Vec<RecordType>,
}

impl ContainerExport {
    async fn run(self) {
        let zones = match discover_zones(self.store.as_ref(), &self.container).await {
            Ok(zones) => zones,
            Err(e) => {
                self.state.fail(e);
                return;
            }
        };

        // A container without zones still shows up, with no record types.
        let launched = self.state.merge_unless_failed(|records| {
            records.entry(self.container.clone()).or_default();
        });
        if !launched {
            debug!("Discarding zones of '{}' after a failure", self.container);
            return;
        }

        for zone in zones {
            for record_type in &self.record_types {
                self.group.spawn(
                    &self.state,
                    walk_partition(
                        self.walker.clone(),
                        self.state.clone(),
                        self.container.clone(),
                        zone.clone(),
                        record_type.clone(),
                    ),
                );
            }
        }
    }
}

async fn walk_partition(
    walker: QueryWalker,
    state: SharedState<AggregatedRecords>,
    container: ContainerId,
    zone: ZoneId,
    record_type: RecordType,
) {
    match walker.walk(&container, &zone, &record_type).await {
        Ok(records) => {
            let merged = state.merge_unless_failed(|aggregated| {
                aggregated
                    .entry(container.clone())
                    .or_default()
                    .entry(record_type.clone())
                    .or_default()
                    .extend(records);
            });
            if !merged {
                debug!(
                    "Discarding '{}' records of {}/{} after a failure",
                    record_type, container, zone
                );
            }
        }
        Err(e) => {
            state.fail(e);
        }
    }
}
