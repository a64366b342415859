//! cloudgdpr library
//!
//! Exports and erases a user's personal data held across several record
//! containers of a remote record store. Which containers and record types
//! hold personal data is declared once; the engine then discovers every zone,
//! walks every paginated partition concurrently and either merges the records
//! into CSV or JSON artifacts, or deletes every zone.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `engine`: Export and erasure aggregation
//! - `error`: Error types and handling
//! - `model`: Containers, zones, records and the aggregated mappings
//! - `output`: Writing artifacts to disk
//! - `render`: Plain text rendering of field values
//! - `store`: Record store trait with in-memory and MongoDB backends
//! - `transform`: CSV, JSON and pass-through transformers
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! use cloudgdpr::engine::Gdpr;
//! use cloudgdpr::model::ContainerDeclaration;
//! use cloudgdpr::store::MemoryStore;
//! use cloudgdpr::transform::CsvTransformer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut declaration = ContainerDeclaration::new();
//!     declaration.insert("app_default".into(), BTreeSet::from(["log".to_string()]));
//!
//!     let store = MemoryStore::new();
//!     store.add_container("app_default");
//!
//!     let gdpr = Gdpr::new(declaration, Arc::new(store));
//!     let files = gdpr.export(&CsvTransformer::new()).await?;
//!     for (name, contents) in files {
//!         println!("{name}: {} bytes", contents.len());
//!     }
//!
//!     let deleted = gdpr.delete_data().await?;
//!     println!("{deleted:?}");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod render;
pub mod store;
pub mod transform;

// Re-export commonly used types
pub use config::Config;
pub use engine::Gdpr;
pub use error::{GdprError, Result};
pub use store::RecordStore;
pub use transform::DataTransformer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
