//! Store layout
//!
//! Maps a record's key values to a file path and key filters to a glob
//! pattern over the same hierarchy:
//!
//! ```text
//! {root}/{headers_file}
//! {root}/{partition}/{date}/{item}
//! ```

use crate::storage::error::StorageResult;
use std::path::{Path, PathBuf};

/// Wildcard used for any key level that is not constrained
pub const WILDCARD: &str = "*";

/// Filesystem layout of a store root
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
    headers_file: String,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>, headers_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            headers_file: headers_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the persisted schema
    pub fn headers_path(&self) -> PathBuf {
        self.root.join(&self.headers_file)
    }

    /// Path of the file holding the record with these key values.
    ///
    /// Key values are used verbatim as path components.
    pub fn record_path(&self, partition: &str, date: &str, item: &str) -> PathBuf {
        self.root.join(partition).join(date).join(item)
    }

    /// Same as [`record_path`](Self::record_path), creating the parent directories
    pub fn prepare_record_path(
        &self,
        partition: &str,
        date: &str,
        item: &str,
    ) -> StorageResult<PathBuf> {
        let dir = self.root.join(partition).join(date);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(item))
    }

    /// Glob pattern for a set of key filters.
    ///
    /// `None` matches any value at that level. Literal values are escaped so
    /// glob metacharacters inside them only match themselves.
    pub fn pattern(
        &self,
        partition: Option<&str>,
        date: Option<&str>,
        item: Option<&str>,
    ) -> String {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let level = |filter: Option<&str>| match filter {
            Some(value) => glob::Pattern::escape(value),
            None => WILDCARD.to_string(),
        };

        format!(
            "{}/{}/{}/{}",
            root.trim_end_matches('/'),
            level(partition),
            level(date),
            level(item)
        )
    }
}
