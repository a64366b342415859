//! Error handling module.
//!
//! This module provides:
//! - The operation-level error type surfaced by export and erasure
//! - Transport errors reported by record store backends
//! - Configuration errors
//! - Structured information extracted from MongoDB driver errors
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudgdpr::error::{GdprError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(GdprError::NoZonesReturned("docs".into()))
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{ConfigError, GdprError, Result, StoreError};
pub use mongo::ErrorInfo;
