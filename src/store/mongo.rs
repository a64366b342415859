//! MongoDB backed record store
//!
//! Maps the record store model onto a MongoDB deployment:
//! - container: a database
//! - zone: a collection of that database (`system.*` collections excluded)
//! - record type: the value of a configurable tag field on each document
//!
//! Pages are keyset paginated on `_id` ascending; the continuation cursor is
//! the last `_id` of the previous page. Deleting a zone drops its collection.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info, warn};

use super::{RecordStore, StoreResult, ZoneDeletion};
use crate::config::ConnectionConfig;
use crate::error::{Result, StoreError};
use crate::model::{ContainerId, Cursor, Page, Predicate, Record, ZoneId};

/// Default document field holding the record type
pub const DEFAULT_RECORD_TYPE_FIELD: &str = "_type";

/// Open a client and verify the deployment answers a ping
///
/// # Arguments
/// * `config` - Connection configuration
///
/// # Returns
/// * `Result<Client>` - Connected client or error
pub async fn connect(config: &ConnectionConfig) -> Result<Client> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    let timeout = config.timeout_duration();
    options.app_name = Some(config.app_name.clone());
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);

    let client = Client::with_options(options)?;
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await?;

    info!("Connected to {}", sanitize_uri(&config.uri));
    Ok(client)
}

/// Hide credentials in a connection URI before it is logged or displayed
pub fn sanitize_uri(uri: &str) -> String {
    if let Some(proto_end) = uri.find("://") {
        if let Some(host_start) = uri.rfind('@') {
            if host_start > proto_end {
                let proto = &uri[..proto_end + 3];
                let host = &uri[host_start..];
                return format!("{}***{}", proto, host);
            }
        }
    }
    if uri.contains('@') {
        "mongodb://***".to_string()
    } else {
        uri.to_string()
    }
}

/// Build the filter of one page
///
/// Combines the record type tag, the predicate and the keyset bound taken
/// from the cursor.
fn page_filter(
    record_type_field: &str,
    record_type: &str,
    predicate: &Predicate,
    cursor: Option<&Cursor>,
) -> Document {
    let mut filter = predicate.filter().clone();
    filter.insert(record_type_field, record_type);
    if let Some(cursor) = cursor {
        filter.insert("_id", doc! { "$gt": cursor.token().clone() });
    }
    filter
}

/// [`RecordStore`] over a MongoDB client
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    record_type_field: String,
}

impl MongoStore {
    /// Create a store over an already connected client
    ///
    /// # Arguments
    /// * `client` - MongoDB client
    /// * `record_type_field` - Document field holding the record type
    pub fn new(client: Client, record_type_field: impl Into<String>) -> Self {
        Self {
            client,
            record_type_field: record_type_field.into(),
        }
    }

    fn collection(&self, container: &ContainerId, zone: &ZoneId) -> Collection<Document> {
        self.client
            .database(container.as_str())
            .collection(zone.as_str())
    }

    /// Cursor for the page after `docs`, if the page was full
    fn next_cursor(docs: &[Document], limit: usize) -> Option<Cursor> {
        if docs.len() < limit {
            return None;
        }
        docs.last()
            .and_then(|doc| doc.get("_id"))
            .cloned()
            .map(Cursor::new)
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn discover_zones(&self, container: &ContainerId) -> StoreResult<Option<Vec<ZoneId>>> {
        let names = self
            .client
            .database(container.as_str())
            .list_collection_names()
            .await?;

        let zones: Vec<ZoneId> = names
            .into_iter()
            .filter(|name| !name.starts_with("system."))
            .map(ZoneId::new)
            .collect();

        debug!("Database '{}' holds {} collection(s)", container, zones.len());
        Ok(Some(zones))
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
        let limit = limit.max(1);
        let filter = page_filter(&self.record_type_field, record_type, predicate, cursor.as_ref());

        let docs: Vec<Document> = self
            .collection(container, zone)
            .find(filter)
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?;

        let next_cursor = Self::next_cursor(&docs, limit);
        let records = docs
            .into_iter()
            .map(|fields| Record::new(record_type, fields))
            .collect();

        Ok(Page {
            records,
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

        stream::unfold(Some((zones.into_iter(), 0usize)), move |progress| {
            let store = store.clone();
            let container = container.clone();
            async move {
                let (mut pending, failed) = progress?;
                match pending.next() {
                    Some(zone) => {
                        let event = match store.collection(&container, &zone).drop().await {
                            Ok(()) => ZoneDeletion::Acknowledged(zone),
                            Err(e) => {
                                warn!("Failed to drop {}.{}: {}", container, zone, e);
                                ZoneDeletion::Rejected {
                                    zone,
                                    cause: StoreError::MongoDb(e),
                                }
                            }
                        };
                        let failed =
                            failed + usize::from(matches!(event, ZoneDeletion::Rejected { .. }));
                        Some((event, Some((pending, failed))))
                    }
                    None => {
                        let outcome = if failed == 0 {
                            Ok(())
                        } else {
                            Err(StoreError::Transport(format!(
                                "{failed} collection(s) of '{container}' could not be dropped"
                            )))
                        };
                        Some((ZoneDeletion::Finished(outcome), None))
                    }
                }
            }
        })
        .boxed()
    }
}
