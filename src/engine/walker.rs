//! Paginated query walker
//!
//! Walks every page of one partition (container, zone, record type) by
//! following the continuation cursor until the store stops returning one.

use std::sync::Arc;

use tracing::debug;

use super::progress::ProgressTracker;
use crate::error::{GdprError, Result};
use crate::model::{ContainerId, Predicate, Record, ZoneId};
use crate::store::RecordStore;

/// Default number of records requested per page
pub const DEFAULT_PAGE_LIMIT: usize = 400;

/// Sequential page-by-page fetcher for one partition at a time
#[derive(Clone)]
pub struct QueryWalker {
    store: Arc<dyn RecordStore>,
    predicate: Predicate,
    page_limit: usize,
    progress: Option<Arc<ProgressTracker>>,
}

impl QueryWalker {
    /// Walker matching every record with the default page limit
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            predicate: Predicate::always_true(),
            page_limit: DEFAULT_PAGE_LIMIT,
            progress: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Set the per-page limit, zero is raised to one
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetch every record of `record_type` in one zone
    ///
    /// Page N+1 is only requested once page N's cursor is known. Records keep
    /// store order within a page and pages are concatenated in cursor order.
    ///
    /// # Returns
    /// * `Result<Vec<Record>>` - All records, or `PageFetchFailed` for the
    ///   first failing page (records already fetched are discarded)
    pub async fn walk(
        &self,
        container: &ContainerId,
        zone: &ZoneId,
        record_type: &str,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut cursor = None;
        let mut page_count = 0usize;

        loop {
            let page = self
                .store
                .query_page(
                    container,
                    zone,
                    record_type,
                    &self.predicate,
                    self.page_limit,
                    cursor.take(),
                )
                .await
                .map_err(|cause| GdprError::PageFetchFailed {
                    container: container.clone(),
                    zone: zone.clone(),
                    record_type: record_type.to_string(),
                    cause,
                })?;

            page_count += 1;
            debug!(
                "Page #{} of '{}' in {}/{}: {} record(s)",
                page_count,
                record_type,
                container,
                zone,
                page.records.len()
            );

            if let Some(ref progress) = self.progress {
                progress.add_records(page.records.len() as u64);
            }
            records.extend(page.records);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use bson::doc;

    fn store_with_logs(count: i32) -> MemoryStore {
        let store = MemoryStore::new();
        for n in 0..count {
            store.insert("app", "zone", Record::new("log", doc! { "n": n }));
        }
        store
    }

    #[tokio::test]
    async fn test_walk_sums_every_page() {
        let store = store_with_logs(11);
        let walker = QueryWalker::new(Arc::new(store.clone())).with_page_limit(4);

        let records = walker.walk(&"app".into(), &"zone".into(), "log").await.unwrap();

        // pages of 4, 4 and 3
        assert_eq!(records.len(), 11);
        assert_eq!(store.page_calls(), 3);
        let order: Vec<i32> = records
            .iter()
            .map(|r| r.fields.get_i32("n").unwrap())
            .collect();
        assert_eq!(order, (0..11).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_walk_empty_partition_is_one_page() {
        let store = store_with_logs(0);
        store.add_zone("app", "zone");
        let walker = QueryWalker::new(Arc::new(store.clone()));

        let records = walker.walk(&"app".into(), &"zone".into(), "log").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(store.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_walk() {
        let store = store_with_logs(10);
        store.fail_page("zone", "log", 1, StoreError::Transport("throttled".to_string()));
        let walker = QueryWalker::new(Arc::new(store.clone())).with_page_limit(3);

        let err = walker
            .walk(&"app".into(), &"zone".into(), "log")
            .await
            .unwrap_err();

        match err {
            GdprError::PageFetchFailed { zone, record_type, .. } => {
                assert_eq!(zone.as_str(), "zone");
                assert_eq!(record_type, "log");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.page_calls(), 2);
    }

    #[tokio::test]
    async fn test_walk_reports_progress() {
        let store = store_with_logs(5);
        let progress = Arc::new(ProgressTracker::hidden());
        let walker = QueryWalker::new(Arc::new(store))
            .with_page_limit(2)
            .with_progress(Arc::clone(&progress));

        walker.walk(&"app".into(), &"zone".into(), "log").await.unwrap();
        assert_eq!(progress.records(), 5);
    }

    #[tokio::test]
    async fn test_walk_with_predicate() {
        let store = MemoryStore::new();
        store.insert("app", "zone", Record::new("log", doc! { "owner": "ana" }));
        store.insert("app", "zone", Record::new("log", doc! { "owner": "bob" }));
        let walker = QueryWalker::new(Arc::new(store))
            .with_predicate(Predicate::from_filter(doc! { "owner": "bob" }));

        let records = walker.walk(&"app".into(), &"zone".into(), "log").await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
