//! Export and erasure engine
//!
//! [`Gdpr`] holds the declaration of which containers and record types carry
//! personal data, and runs the two operations over a [`RecordStore`]:
//!
//! 1. **export**: discover zones, walk every (zone, record type) partition,
//!    merge the records, then hand them to a [`DataTransformer`]
//! 2. **delete_data**: discover zones, then delete every one of them
//!
//! Both fan out on the ambient tokio runtime and resolve to a single result:
//! the merged value, or the first failure any unit observed. Later failures
//! are dropped and in-flight work is left to finish.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::model::{ContainerDeclaration, ContainerNameMapping, DeletionResult};
use crate::store::RecordStore;
use crate::transform::DataTransformer;

pub mod discovery;
mod erasure;
mod export;
pub mod join;
pub mod progress;
pub mod walker;

pub use progress::ProgressTracker;
pub use walker::{DEFAULT_PAGE_LIMIT, QueryWalker};

/// Personal data export and erasure over a record store
pub struct Gdpr {
    declaration: ContainerDeclaration,
    names: ContainerNameMapping,
    store: Arc<dyn RecordStore>,
    page_limit: usize,
    progress: Option<Arc<ProgressTracker>>,
}

impl Gdpr {
    /// Create an engine for the declared containers
    ///
    /// # Arguments
    /// * `declaration` - Record types holding personal data, per container
    /// * `store` - Store the containers live in
    pub fn new(declaration: ContainerDeclaration, store: Arc<dyn RecordStore>) -> Self {
        Self {
            declaration,
            names: ContainerNameMapping::new(),
            store,
            page_limit: DEFAULT_PAGE_LIMIT,
            progress: None,
        }
    }

    /// Display names used to name export artifacts
    ///
    /// Entries for undeclared containers are ignored.
    pub fn with_name_mapping(mut self, names: ContainerNameMapping) -> Self {
        self.names = names
            .into_iter()
            .filter(|(container, _)| self.declaration.contains_key(container))
            .collect();
        self
    }

    /// Records requested per page, zero is raised to one
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Report records fetched and zones deleted to a tracker
    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn declaration(&self) -> &ContainerDeclaration {
        &self.declaration
    }

    pub fn name_mapping(&self) -> &ContainerNameMapping {
        &self.names
    }

    fn walker(&self) -> QueryWalker {
        let walker = QueryWalker::new(Arc::clone(&self.store)).with_page_limit(self.page_limit);
        match self.progress {
            Some(ref progress) => walker.with_progress(Arc::clone(progress)),
            None => walker,
        }
    }

    /// Export every declared record through `transformer`
    ///
    /// # Returns
    /// * `Result<T::Output>` - Transformer output, or the first failure of
    ///   any zone discovery, page fetch or the transformer itself
    pub async fn export<T: DataTransformer>(&self, transformer: &T) -> Result<T::Output> {
        let records =
            export::aggregate_records(Arc::clone(&self.store), &self.declaration, self.walker())
                .await?;

        info!("Transforming records of {} container(s)", records.len());
        transformer.transform_data(records, &self.names).await
    }

    /// Delete every zone of every declared container
    ///
    /// Removing local copies of the deleted records is up to the caller.
    ///
    /// # Returns
    /// * `Result<DeletionResult>` - Zones actually deleted per container, or
    ///   the first failure of any zone discovery or deletion
    pub async fn delete_data(&self) -> Result<DeletionResult> {
        erasure::erase_zones(
            Arc::clone(&self.store),
            &self.declaration,
            self.progress.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::time::Duration;

    use bson::doc;
    use futures::stream::BoxStream;

    use crate::error::{GdprError, StoreError};
    use crate::model::{AggregatedRecords, ContainerId, Cursor, Page, Predicate, Record, ZoneId};
    use crate::store::{MemoryStore, StoreResult, ZoneDeletion};
    use crate::transform::{CsvTransformer, IdentityTransformer, JsonTransformer};

    fn declaration(entries: &[(&str, &[&str])]) -> ContainerDeclaration {
        entries
            .iter()
            .map(|(container, types)| {
                (
                    ContainerId::from(*container),
                    types.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
                )
            })
            .collect()
    }

    fn engine(store: &MemoryStore, entries: &[(&str, &[&str])]) -> Gdpr {
        Gdpr::new(declaration(entries), Arc::new(store.clone()))
    }

    /// Three containers, several zones, enough records for multiple pages
    fn populated_store() -> MemoryStore {
        let store = MemoryStore::new().with_latency(Duration::from_millis(1));
        for n in 0..7 {
            store.insert("app_default", "zone-a", Record::new("log", doc! { "n": n }));
        }
        for n in 0..3 {
            store.insert("app_default", "zone-b", Record::new("log", doc! { "n": 100 + n }));
        }
        store.insert("app_default", "zone-b", Record::new("verboseLog", doc! { "msg": "hi" }));
        store.insert("app_docs", "docs", Record::new("textDocument", doc! { "title": "CV" }));
        store.insert("app_docs", "docs", Record::new("unrelated", doc! { "x": 1 }));
        store.add_container("app_settings");
        store
    }

    const FULL: &[(&str, &[&str])] = &[
        ("app_default", &["log", "verboseLog"]),
        ("app_docs", &["textDocument", "spreadsheet"]),
        ("app_settings", &["preference"]),
    ];

    #[tokio::test]
    async fn test_export_merges_all_partitions() {
        let store = populated_store();
        let gdpr = engine(&store, FULL).with_page_limit(2);

        let records = gdpr.export(&IdentityTransformer).await.unwrap();

        let default = &records[&ContainerId::from("app_default")];
        assert_eq!(default["log"].len(), 10);
        assert_eq!(default["verboseLog"].len(), 1);

        let docs = &records[&ContainerId::from("app_docs")];
        assert_eq!(docs["textDocument"].len(), 1);
        assert!(docs["spreadsheet"].is_empty());
        assert!(!docs.contains_key("unrelated"));

        assert_eq!(store.discover_calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_zones_export_and_delete() {
        let store = MemoryStore::new();
        store.add_container("app_settings");
        let gdpr = engine(&store, &[("app_settings", &["preference"])]);

        let records = gdpr.export(&IdentityTransformer).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[&ContainerId::from("app_settings")].is_empty());

        let deleted = gdpr.delete_data().await.unwrap();
        assert_eq!(deleted[&ContainerId::from("app_settings")], Vec::<ZoneId>::new());
    }

    #[tokio::test]
    async fn test_page_count_sums_to_record_count() {
        let store = MemoryStore::new();
        for n in 0..25 {
            store.insert("app", "zone", Record::new("log", doc! { "n": n }));
        }
        let gdpr = engine(&store, &[("app", &["log"])]).with_page_limit(10);

        let records = gdpr.export(&IdentityTransformer).await.unwrap();
        assert_eq!(records[&ContainerId::from("app")]["log"].len(), 25);
        assert_eq!(store.page_calls(), 3);
    }

    #[tokio::test]
    async fn test_single_discovery_failure_fails_export() {
        let store = populated_store();
        store.fail_discovery("app_docs", StoreError::Transport("offline".to_string()));
        let gdpr = engine(&store, FULL);

        let err = gdpr.export(&IdentityTransformer).await.unwrap_err();
        assert!(
            matches!(err, GdprError::ZoneDiscoveryFailed { ref container, .. } if container.as_str() == "app_docs")
        );
    }

    #[tokio::test]
    async fn test_missing_zone_list_fails_export() {
        let store = populated_store();
        store.omit_zone_list("app_settings");
        let gdpr = engine(&store, FULL);

        let err = gdpr.export(&CsvTransformer::new()).await.unwrap_err();
        assert!(matches!(err, GdprError::NoZonesReturned(_)));
    }

    #[tokio::test]
    async fn test_single_page_failure_fails_export() {
        let store = populated_store();
        store.fail_page("zone-a", "log", 2, StoreError::Transport("throttled".to_string()));
        let gdpr = engine(&store, FULL).with_page_limit(2);

        let err = gdpr.export(&IdentityTransformer).await.unwrap_err();
        assert!(matches!(err, GdprError::PageFetchFailed { ref zone, .. } if zone.as_str() == "zone-a"));
    }

    #[tokio::test]
    async fn test_many_failures_yield_one_error() {
        let store = populated_store();
        store.fail_discovery("app_default", StoreError::Transport("a".to_string()));
        store.fail_discovery("app_docs", StoreError::Transport("b".to_string()));
        store.fail_discovery("app_settings", StoreError::Transport("c".to_string()));
        let gdpr = engine(&store, FULL);

        let err = gdpr.export(&IdentityTransformer).await.unwrap_err();
        assert!(matches!(err, GdprError::ZoneDiscoveryFailed { .. }));
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let store = populated_store();
        let gdpr = engine(&store, FULL).with_page_limit(3);

        let first = gdpr.export(&IdentityTransformer).await.unwrap();
        let second = gdpr.export(&IdentityTransformer).await.unwrap();
        assert_eq!(sorted(first), sorted(second));
    }

    /// Cross-zone order is unspecified, compare as sorted field renderings
    fn sorted(records: AggregatedRecords) -> BTreeMap<ContainerId, BTreeMap<String, Vec<String>>> {
        records
            .into_iter()
            .map(|(container, by_type)| {
                let by_type = by_type
                    .into_iter()
                    .map(|(record_type, records)| {
                        let mut rendered: Vec<String> =
                            records.iter().map(|r| r.fields.to_string()).collect();
                        rendered.sort();
                        (record_type, rendered)
                    })
                    .collect();
                (container, by_type)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_identity_matches_store_contents() {
        let store = MemoryStore::new();
        let record = Record::new("log", doc! { "id": "1", "nested": { "a": [1, 2] } });
        store.insert("app", "zone", record.clone());
        let gdpr = engine(&store, &[("app", &["log"])]);

        let records = gdpr.export(&IdentityTransformer).await.unwrap();
        assert_eq!(records[&ContainerId::from("app")]["log"], vec![record]);
    }

    #[tokio::test]
    async fn test_export_csv_and_json_named_by_mapping() {
        let store = MemoryStore::new();
        store.insert("app_default", "zone", Record::new("log", doc! { "id": "1" }));
        store.insert("app_default", "zone", Record::new("log", doc! { "id": "2", "name": "Bob" }));
        let mut names = ContainerNameMapping::new();
        names.insert("app_default".into(), "default".to_string());
        names.insert("undeclared".into(), "ghost".to_string());
        let gdpr = engine(&store, &[("app_default", &["log"])]).with_name_mapping(names);
        assert_eq!(gdpr.name_mapping().len(), 1);

        let csv = gdpr.export(&CsvTransformer::new()).await.unwrap();
        assert_eq!(csv["default_log.csv"], "\"id\",\"name\"\n\"1\",\"\"\n\"2\",\"Bob\"\n");

        let json = gdpr.export(&JsonTransformer::new()).await.unwrap();
        assert!(json.contains_key("default_log.json"));
    }

    #[tokio::test]
    async fn test_unnamed_container_gets_fresh_token_per_export() {
        let store = MemoryStore::new();
        store.insert("app", "zone", Record::new("log", doc! { "id": "1" }));
        let gdpr = engine(&store, &[("app", &["log"])]);

        let first = gdpr.export(&JsonTransformer::new()).await.unwrap();
        let second = gdpr.export(&JsonTransformer::new()).await.unwrap();
        let first_name = first.keys().next().unwrap();
        let second_name = second.keys().next().unwrap();
        assert!(first_name.ends_with("_log.json"));
        assert_ne!(first_name, second_name);
    }

    #[tokio::test]
    async fn test_export_reports_progress() {
        let store = populated_store();
        let progress = Arc::new(ProgressTracker::hidden());
        let gdpr = engine(&store, FULL).with_progress(Arc::clone(&progress));

        gdpr.export(&IdentityTransformer).await.unwrap();
        assert_eq!(progress.records(), 12);
    }

    #[tokio::test]
    async fn test_delete_data_removes_every_zone() {
        let store = populated_store();
        let progress = Arc::new(ProgressTracker::hidden());
        let gdpr = engine(&store, FULL).with_progress(Arc::clone(&progress));

        let deleted = gdpr.delete_data().await.unwrap();

        assert_eq!(
            deleted[&ContainerId::from("app_default")],
            vec![ZoneId::from("zone-a"), ZoneId::from("zone-b")]
        );
        assert_eq!(deleted[&ContainerId::from("app_docs")], vec![ZoneId::from("docs")]);
        assert!(deleted[&ContainerId::from("app_settings")].is_empty());
        assert!(store.zones(&"app_default".into()).is_empty());
        assert_eq!(progress.zones(), 3);

        let again = gdpr.delete_data().await.unwrap();
        assert!(again.values().all(Vec::is_empty));
    }

    #[tokio::test]
    async fn test_rejected_zone_fails_delete() {
        let store = populated_store();
        store.reject_zone("zone-b", StoreError::Transport("locked".to_string()));
        let gdpr = engine(&store, FULL);

        let err = gdpr.delete_data().await.unwrap_err();
        match err {
            GdprError::ZoneDeletionFailed {
                container,
                zone,
                deleted,
                ..
            } => {
                assert_eq!(container.as_str(), "app_default");
                assert_eq!(zone, Some(ZoneId::from("zone-b")));
                assert_eq!(deleted, vec![ZoneId::from("zone-a")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_batch_outcome_fails_delete() {
        let store = populated_store();
        store.fail_deletion("app_docs", StoreError::Transport("quota".to_string()));
        let gdpr = engine(&store, FULL);

        let err = gdpr.delete_data().await.unwrap_err();
        assert!(matches!(
            err,
            GdprError::ZoneDeletionFailed { ref container, zone: None, .. } if container.as_str() == "app_docs"
        ));
    }

    #[tokio::test]
    async fn test_truncated_deletion_stream_fails_delete() {
        let store = populated_store();
        store.truncate_deletion("app_docs");
        let gdpr = engine(&store, FULL);

        let err = gdpr.delete_data().await.unwrap_err();
        assert!(matches!(err, GdprError::ZoneDeletionFailed { .. }));
    }

    #[tokio::test]
    async fn test_discovery_failure_fails_delete() {
        let store = populated_store();
        store.fail_discovery("app_settings", StoreError::Transport("offline".to_string()));
        let gdpr = engine(&store, FULL);

        let err = gdpr.delete_data().await.unwrap_err();
        assert!(matches!(err, GdprError::ZoneDiscoveryFailed { .. }));
    }

    /// Store whose calls panic for one zone and one container
    struct PanickingStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl RecordStore for PanickingStore {
        fn backend_name(&self) -> &'static str {
            "panicking"
        }

        async fn discover_zones(
            &self,
            container: &ContainerId,
        ) -> StoreResult<Option<Vec<ZoneId>>> {
            self.inner.discover_zones(container).await
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
            if zone.as_str() == "bad" {
                panic!("page fetch crashed");
            }
            self.inner
                .query_page(container, zone, record_type, predicate, limit, cursor)
                .await
        }

        fn delete_zones(
            &self,
            container: &ContainerId,
            zones: Vec<ZoneId>,
        ) -> BoxStream<'static, ZoneDeletion> {
            if container.as_str() == "broken" {
                panic!("deletion crashed");
            }
            self.inner.delete_zones(container, zones)
        }
    }

    fn panicking_store() -> PanickingStore {
        let inner = MemoryStore::new();
        inner.insert("app_default", "good", Record::new("log", doc! { "n": 1 }));
        inner.insert("app_default", "bad", Record::new("log", doc! { "n": 2 }));
        inner.insert("broken", "zone", Record::new("log", doc! { "n": 3 }));
        PanickingStore { inner }
    }

    #[tokio::test]
    async fn test_panicking_walker_fails_export() {
        let gdpr = Gdpr::new(
            declaration(&[("app_default", &["log"])]),
            Arc::new(panicking_store()),
        );

        let err = gdpr.export(&IdentityTransformer).await.unwrap_err();
        assert!(matches!(err, GdprError::Generic(ref msg) if msg.contains("page fetch crashed")));
    }

    #[tokio::test]
    async fn test_panicking_deletion_fails_delete() {
        let store = panicking_store();
        let gdpr = Gdpr::new(
            declaration(&[("app_default", &["log"]), ("broken", &["log"])]),
            Arc::new(store),
        );

        let err = gdpr.delete_data().await.unwrap_err();
        assert!(matches!(err, GdprError::Generic(ref msg) if msg.contains("deletion crashed")));
    }
}
