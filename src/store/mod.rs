//! Record store abstraction
//!
//! The engine never talks to a backend directly. It consumes the three
//! operations of [`RecordStore`]:
//!
//! 1. **discover_zones**: list every zone of a container's private scope
//! 2. **query_page**: fetch one bounded page of records of one type in one zone
//! 3. **delete_zones**: drop a batch of zones, acknowledging each as it goes
//!
//! Two backends ship with the crate: an in-process [`MemoryStore`] and a
//! MongoDB backed [`MongoStore`].

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::model::{ContainerId, Cursor, Page, Predicate, ZoneId};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Result type of a single store call
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One item of a bulk zone deletion stream
///
/// A well-behaved stream yields any number of `Acknowledged`/`Rejected`
/// items and ends with exactly one `Finished`.
#[derive(Debug, Clone)]
pub enum ZoneDeletion {
    /// The zone and every record in it is gone
    Acknowledged(ZoneId),
    /// The store refused to delete this zone
    Rejected { zone: ZoneId, cause: StoreError },
    /// Final outcome of the whole batch
    Finished(StoreResult<()>),
}

/// Remote record store consumed by the engine
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human readable backend name for logging
    fn backend_name(&self) -> &'static str;

    /// List every zone of the container
    ///
    /// `Ok(None)` means the transport succeeded without returning a zone list,
    /// which is not the same as an empty list.
    async fn discover_zones(&self, container: &ContainerId) -> StoreResult<Option<Vec<ZoneId>>>;

    /// Fetch one page of at most `limit` records of `record_type`
    ///
    /// A `None` cursor starts a new walk. The returned page carries a
    /// continuation cursor when more records remain.
    async fn query_page(
        &self,
        container: &ContainerId,
        zone: &ZoneId,
        record_type: &str,
        predicate: &Predicate,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> StoreResult<Page>;

    /// Delete exactly the given zones of the container
    fn delete_zones(
        &self,
        container: &ContainerId,
        zones: Vec<ZoneId>,
    ) -> BoxStream<'static, ZoneDeletion>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_store_trait_object() {
        fn _accepts_store(_store: Arc<dyn RecordStore>) {}
        _accepts_store(Arc::new(MemoryStore::new()));
    }
}
