//! # Flatstore
//!
//! A flat-file record store with a tabular query layer. Delimited records are
//! imported into a directory hierarchy keyed by three fields, then filtered,
//! ordered, grouped, and aggregated into a delimited report.
//!
//! ## Modules
//!
//! - [`storage`]: Path layout, import, schema, and filtered scans
//! - [`query`]: Grouping, aggregation, ordering, and report output
//! - [`config`]: TOML and environment configuration
//!
//! ## Operating constraints
//!
//! The store has no locking. It assumes one writer and no queries running
//! during an import. Each import replaces the schema wholesale, so importing
//! a different field set without deleting first leaves older record files
//! misaligned with the schema.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flatstore::query::{Query, QueryExecutor};
//! use flatstore::storage::{FlatStore, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FlatStore::new(StoreConfig::new("./data"))?;
//!     store.import_path(std::path::Path::new("views.psv"), true)?;
//!
//!     let executor = QueryExecutor::new(store);
//!     let query = Query::select(&["TITLE:count"])
//!         .group_by("TITLE")
//!         .order_by(&["TITLE"])
//!         .build()?;
//!     print!("{}", executor.query_to_string(&query)?);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{FlatStore, KeyFields, Record, Schema, StorageError, StorageResult, StoreConfig};

pub use query::{
    AggValue, AggregateOp, Coercion, CoercionTable, Query, QueryError, QueryExecutor,
    QueryResult, ReportStats, SelectField,
};

pub use config::{Config, ConfigError, LoggingConfig, QueryConfig};
