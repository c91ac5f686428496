//! Report query engine
//!
//! Filters, groups, orders, and aggregates stored records into a delimited
//! report:
//!
//! - **AST**: Query description and builder
//! - **Coercion**: Field name to value interpretation table
//! - **Aggregate**: Per-group seed and fold
//! - **Executor**: Run queries against the store
//!
//! # Example
//!
//! ```rust,ignore
//! use flatstore::query::{Query, QueryExecutor};
//!
//! let query = Query::select(&["TITLE", "REV:sum", "STB:collect"])
//!     .group_by("TITLE")
//!     .order_by(&["TITLE"])
//!     .build()?;
//!
//! executor.query(&query, &mut std::io::stdout())?;
//! // TITLE|REV:sum|STB:collect
//! // the hobbit|8.00|[stb2]
//! // the matrix|8.00|[stb1,stb3]
//! ```

mod aggregate;
mod ast;
mod coercion;
mod error;
mod executor;

pub use aggregate::{AggValue, AggregateSpec, Aggregates, Aggregator};
pub use ast::{AggregateOp, Query, QueryBuilder, SelectField};
pub use coercion::{format_minutes, parse_minutes, Coercion, CoercionTable};
pub use error::{QueryError, QueryResult};
pub use executor::{QueryExecutor, ReportStats};
