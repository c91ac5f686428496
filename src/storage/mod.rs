//! Flat-file storage layer
//!
//! This module persists records as one small file each, keyed by three fields:
//!
//! - **types**: Core data structures (Record, Schema, KeyFields)
//! - **paths**: Store layout, key values to paths and filters to glob patterns
//! - **import**: Delimited input reader
//! - **engine**: Import, schema access, and filtered scans
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   Input rows → Record → {root}/{partition}/{date}/{item} → schema file (last)
//!
//! Read Path:
//!   Filters → Glob pattern → Record files → Zip with schema → Field filters
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use flatstore::storage::{FlatStore, StoreConfig};
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FlatStore::new(StoreConfig::new("./data"))?;
//!
//!     let input = "STB|TITLE|DATE\nstb1|the matrix|2014-04-01\n";
//!     store.import_records(input.as_bytes(), true)?;
//!
//!     let mut filters = HashMap::new();
//!     filters.insert("STB".to_string(), "stb1".to_string());
//!     for record in store.iter_filtered_records(&filters)? {
//!         println!("{:?}", record?.get("TITLE"));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod import;
pub mod paths;
pub mod types;

// Re-export commonly used types
pub use engine::{FilteredRecords, FlatStore, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use import::RecordReader;
pub use paths::StoreLayout;
pub use types::{KeyFields, Record, Schema};
