//! Core data types for the flat-file store
//!
//! - `Record`: one imported row, field name to raw string value
//! - `Schema`: the sorted field names every stored record is read with
//! - `KeyFields`: the three fields that place a record in the directory hierarchy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single stored row
///
/// Fields are kept sorted by name, which is also the order values are
/// serialized in on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record by zipping names against values positionally.
    ///
    /// Extra names or extra values are dropped, like a plain `zip`.
    pub fn from_pairs<N, V>(names: N, values: V) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let fields = names
            .into_iter()
            .zip(values)
            .map(|(n, v)| (n.into(), v.into()))
            .collect();
        Self { fields }
    }

    /// Builder method: set a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Values ordered by field name
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every `(field, value)` pair matches exactly
    pub fn matches_all<I, K, V>(&self, filters: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        filters
            .into_iter()
            .all(|(field, value)| self.get(field.as_ref()) == Some(value.as_ref()))
    }
}

/// Field names valid for the current store contents, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    /// Build a schema, sorting and de-duplicating the names
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        fields.sort();
        fields.dedup();
        Self { fields }
    }

    /// Schema of a record's key set
    pub fn of(record: &Record) -> Self {
        Self {
            fields: record.names().map(str::to_string).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.binary_search_by(|f| f.as_str().cmp(name)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The fields that determine a record's storage path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFields {
    /// First directory level (e.g. set-top box id)
    #[serde(default = "default_partition")]
    pub partition: String,
    /// Second directory level
    #[serde(default = "default_date")]
    pub date: String,
    /// Leaf file name
    #[serde(default = "default_item")]
    pub item: String,
}

fn default_partition() -> String {
    "STB".to_string()
}

fn default_date() -> String {
    "DATE".to_string()
}

fn default_item() -> String {
    "TITLE".to_string()
}

impl Default for KeyFields {
    fn default() -> Self {
        Self {
            partition: default_partition(),
            date: default_date(),
            item: default_item(),
        }
    }
}

impl KeyFields {
    pub fn new(
        partition: impl Into<String>,
        date: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            date: date.into(),
            item: item.into(),
        }
    }

    /// Key field names in path order
    pub fn names(&self) -> [&str; 3] {
        [self.partition.as_str(), self.date.as_str(), self.item.as_str()]
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.names().contains(&name)
    }
}
