//! In-process record store
//!
//! Holds containers, zones and records in memory and paginates exactly like
//! a remote store would: each page is bounded by the requested limit and a
//! cursor is handed back while records remain. Faults can be injected per
//! container, zone or page, which makes this the backend used by the engine
//! tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bson::Bson;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::debug;

use super::{RecordStore, StoreResult, ZoneDeletion};
use crate::error::StoreError;
use crate::model::{ContainerId, Cursor, Page, Predicate, Record, ZoneId};

type Zones = BTreeMap<ZoneId, Vec<Record>>;

#[derive(Default)]
struct Faults {
    discovery: HashMap<ContainerId, StoreError>,
    missing_zone_list: HashSet<ContainerId>,
    pages: HashMap<(ZoneId, String), (usize, StoreError)>,
    rejected_zones: HashMap<ZoneId, StoreError>,
    deletion: HashMap<ContainerId, StoreError>,
    truncated_deletion: HashSet<ContainerId>,
}

#[derive(Default)]
struct MemoryState {
    containers: BTreeMap<ContainerId, Zones>,
    faults: Faults,
}

impl MemoryState {
    fn delete_zone(&mut self, container: &ContainerId, zone: ZoneId) -> ZoneDeletion {
        if let Some(cause) = self.faults.rejected_zones.get(&zone) {
            return ZoneDeletion::Rejected {
                zone,
                cause: cause.clone(),
            };
        }

        match self.containers.get_mut(container) {
            Some(zones) => {
                // Deleting a zone that is already gone still succeeds.
                zones.remove(&zone);
                ZoneDeletion::Acknowledged(zone)
            }
            None => ZoneDeletion::Rejected {
                zone,
                cause: StoreError::UnknownContainer(container.clone()),
            },
        }
    }

    fn finish_deletion(&self, container: &ContainerId, rejected: usize) -> StoreResult<()> {
        if let Some(cause) = self.faults.deletion.get(container) {
            return Err(cause.clone());
        }
        if rejected > 0 {
            return Err(StoreError::Transport(format!(
                "{rejected} zone(s) could not be deleted"
            )));
        }
        Ok(())
    }
}

/// In-memory [`RecordStore`]
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    latency: Option<Duration>,
    discover_calls: Arc<AtomicUsize>,
    page_calls: Arc<AtomicUsize>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every store call by `latency` so that concurrent units interleave
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register an empty container
    pub fn add_container(&self, container: impl Into<ContainerId>) {
        lock(&self.state)
            .containers
            .entry(container.into())
            .or_default();
    }

    /// Register an empty zone, creating the container if needed
    pub fn add_zone(&self, container: impl Into<ContainerId>, zone: impl Into<ZoneId>) {
        lock(&self.state)
            .containers
            .entry(container.into())
            .or_default()
            .entry(zone.into())
            .or_default();
    }

    /// Store a record, creating its container and zone if needed
    pub fn insert(
        &self,
        container: impl Into<ContainerId>,
        zone: impl Into<ZoneId>,
        record: Record,
    ) {
        lock(&self.state)
            .containers
            .entry(container.into())
            .or_default()
            .entry(zone.into())
            .or_default()
            .push(record);
    }

    /// Zones currently present in a container
    pub fn zones(&self, container: &ContainerId) -> Vec<ZoneId> {
        lock(&self.state)
            .containers
            .get(container)
            .map(|zones| zones.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make zone discovery of `container` fail
    pub fn fail_discovery(&self, container: impl Into<ContainerId>, cause: StoreError) {
        lock(&self.state)
            .faults
            .discovery
            .insert(container.into(), cause);
    }

    /// Make zone discovery of `container` succeed without a zone list
    pub fn omit_zone_list(&self, container: impl Into<ContainerId>) {
        lock(&self.state)
            .faults
            .missing_zone_list
            .insert(container.into());
    }

    /// Make the `page_index`-th page (zero based) of a walk fail
    pub fn fail_page(
        &self,
        zone: impl Into<ZoneId>,
        record_type: &str,
        page_index: usize,
        cause: StoreError,
    ) {
        lock(&self.state)
            .faults
            .pages
            .insert((zone.into(), record_type.to_string()), (page_index, cause));
    }

    /// Make the store refuse to delete `zone`
    pub fn reject_zone(&self, zone: impl Into<ZoneId>, cause: StoreError) {
        lock(&self.state)
            .faults
            .rejected_zones
            .insert(zone.into(), cause);
    }

    /// Make the final outcome of deleting zones of `container` a failure
    pub fn fail_deletion(&self, container: impl Into<ContainerId>, cause: StoreError) {
        lock(&self.state)
            .faults
            .deletion
            .insert(container.into(), cause);
    }

    /// End the deletion stream of `container` without a final outcome
    pub fn truncate_deletion(&self, container: impl Into<ContainerId>) {
        lock(&self.state)
            .faults
            .truncated_deletion
            .insert(container.into());
    }

    /// Number of zone discoveries served
    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    /// Number of pages served, failed ones included
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn decode_cursor(cursor: Option<Cursor>) -> StoreResult<usize> {
        match cursor.map(Cursor::into_token) {
            None => Ok(0),
            Some(Bson::Int64(offset)) if offset >= 0 => Ok(offset as usize),
            Some(other) => Err(StoreError::InvalidCursor(format!("{other}"))),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn discover_zones(&self, container: &ContainerId) -> StoreResult<Option<Vec<ZoneId>>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let state = lock(&self.state);
        if let Some(cause) = state.faults.discovery.get(container) {
            return Err(cause.clone());
        }
        if state.faults.missing_zone_list.contains(container) {
            return Ok(None);
        }

        state
            .containers
            .get(container)
            .map(|zones| Some(zones.keys().cloned().collect()))
            .ok_or_else(|| StoreError::UnknownContainer(container.clone()))
    }

    async fn query_page(
        &self,
        container: &ContainerId,
        zone: &ZoneId,
        record_type: &str,
        predicate: &Predicate,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> StoreResult<Page> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let offset = Self::decode_cursor(cursor)?;
        let limit = limit.max(1);

        let state = lock(&self.state);
        if let Some((failing_page, cause)) = state
            .faults
            .pages
            .get(&(zone.clone(), record_type.to_string()))
        {
            if offset / limit == *failing_page {
                return Err(cause.clone());
            }
        }

        let records = state
            .containers
            .get(container)
            .ok_or_else(|| StoreError::UnknownContainer(container.clone()))?
            .get(zone)
            .ok_or_else(|| StoreError::UnknownZone(zone.clone()))?;

        let matching: Vec<&Record> = records
            .iter()
            .filter(|record| record.record_type == record_type && predicate.matches(record))
            .collect();

        let page: Vec<Record> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|record| (*record).clone())
            .collect();

        let next = offset + page.len();
        let next_cursor = (next < matching.len()).then(|| Cursor::new(Bson::Int64(next as i64)));

        debug!(
            "memory store served {} '{}' records from {}/{} at offset {}",
            page.len(),
            record_type,
            container,
            zone,
            offset
        );

        Ok(Page {
            records: page,
            next_cursor,
        })
    }

    fn delete_zones(
        &self,
        container: &ContainerId,
        zones: Vec<ZoneId>,
    ) -> BoxStream<'static, ZoneDeletion> {
        let store = self.clone();
        let container = container.clone();
        let truncated = lock(&self.state)
            .faults
            .truncated_deletion
            .contains(&container);

        stream::unfold(
            Some((zones.into_iter(), 0usize)),
            move |progress| {
                let store = store.clone();
                let container = container.clone();
                async move {
                    let (mut pending, rejected) = progress?;
                    store.simulate_latency().await;

                    let mut state = lock(&store.state);
                    match pending.next() {
                        Some(zone) => {
                            let event = state.delete_zone(&container, zone);
                            let rejected = rejected
                                + usize::from(matches!(event, ZoneDeletion::Rejected { .. }));
                            Some((event, Some((pending, rejected))))
                        }
                        None if truncated => None,
                        None => {
                            let outcome = state.finish_deletion(&container, rejected);
                            Some((ZoneDeletion::Finished(outcome), None))
                        }
                    }
                }
            },
        )
        .boxed()
    }
}
