//! Flat-file storage engine
//!
//! - Write path: delimited input → Record → `{root}/{partition}/{date}/{item}`,
//!   then the schema file once every record is on disk
//! - Read path: key filters → glob pattern → file → Record (zipped against
//!   the schema) → remaining field filters
//!
//! There is no locking. The store assumes a single writer and no queries
//! running while an import is in progress.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::import::RecordReader;
use crate::storage::paths::StoreLayout;
use crate::storage::types::{KeyFields, Record, Schema};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Configuration for the storage engine
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding the schema file and the record hierarchy
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Schema file name, relative to `data_dir`
    #[serde(default = "default_headers_file")]
    pub headers_file: String,
    /// Field delimiter of import files
    #[serde(default = "default_delimiter")]
    pub input_delimiter: char,
    /// Field delimiter of stored record files and the schema file
    #[serde(default = "default_delimiter")]
    pub store_delimiter: char,
    /// Fields that place a record in the directory hierarchy
    #[serde(default)]
    pub key_fields: KeyFields,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_headers_file() -> String {
    "headers.csv".to_string()
}

fn default_delimiter() -> char {
    '|'
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            headers_file: default_headers_file(),
            input_delimiter: default_delimiter(),
            store_delimiter: default_delimiter(),
            key_fields: KeyFields::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }
}

/// Convert a configured delimiter to the single byte the delimited reader expects
fn delimiter_byte(name: &str, delimiter: char) -> StorageResult<u8> {
    if delimiter.is_ascii() && delimiter != '\n' && delimiter != '\r' {
        Ok(delimiter as u8)
    } else {
        Err(StorageError::Config(format!(
            "{} must be a single ASCII character other than a line break, got {:?}",
            name, delimiter
        )))
    }
}

/// The flat-file record store
#[derive(Debug, Clone)]
pub struct FlatStore {
    layout: StoreLayout,
    key_fields: KeyFields,
    input_delimiter: u8,
    store_delimiter: u8,
}

impl FlatStore {
    /// Create a store handle. Nothing is touched on disk until the first import.
    pub fn new(config: StoreConfig) -> StorageResult<Self> {
        Ok(Self {
            layout: StoreLayout::new(config.data_dir, config.headers_file),
            key_fields: config.key_fields,
            input_delimiter: delimiter_byte("input_delimiter", config.input_delimiter)?,
            store_delimiter: delimiter_byte("store_delimiter", config.store_delimiter)?,
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn key_fields(&self) -> &KeyFields {
        &self.key_fields
    }

    /// Import the file at `path`. See [`import_records`](Self::import_records).
    pub fn import_path(&self, path: &Path, delete_first: bool) -> StorageResult<usize> {
        let file = File::open(path)?;
        self.import_records(BufReader::new(file), delete_first)
    }

    /// Import a delimited stream, returning the number of records written.
    ///
    /// Records whose keys collide with an existing file overwrite it. The
    /// schema file is replaced only after every record has been written.
    pub fn import_records<R: Read>(&self, input: R, delete_first: bool) -> StorageResult<usize> {
        let start = Instant::now();

        if delete_first && self.layout.root().exists() {
            tracing::info!("Deleting existing store at {:?}", self.layout.root());
            std::fs::remove_dir_all(self.layout.root())?;
        }

        let reader = RecordReader::new(input, self.input_delimiter)?;
        let mut schema = Schema::new(reader.headers().iter().cloned());
        let mut count = 0;

        for (row_num, result) in reader.enumerate() {
            let record = result?;
            // Header is line 1
            self.save_record(&record, row_num + 2)?;
            schema = Schema::of(&record);
            count += 1;
        }

        self.write_schema(&schema)?;

        tracing::info!(
            "Imported {} records into {:?} in {}ms",
            count,
            self.layout.root(),
            start.elapsed().as_millis()
        );
        Ok(count)
    }

    fn save_record(&self, record: &Record, line: usize) -> StorageResult<()> {
        let key = |name: &str| {
            record.get(name).ok_or_else(|| {
                StorageError::MalformedInput(format!("line {}: missing key field {}", line, name))
            })
        };
        let path = self.layout.prepare_record_path(
            key(self.key_fields.partition.as_str())?,
            key(self.key_fields.date.as_str())?,
            key(self.key_fields.item.as_str())?,
        )?;

        self.write_line(&path, record.values())
    }

    /// Replace the schema file via a temp file and rename
    fn write_schema(&self, schema: &Schema) -> StorageResult<()> {
        std::fs::create_dir_all(self.layout.root())?;
        let path = self.layout.headers_path();
        let tmp = path.with_extension("tmp");

        self.write_line(&tmp, schema.fields().iter().map(String::as_str))?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!("Wrote schema {:?} to {:?}", schema.fields(), path);
        Ok(())
    }

    fn write_line<'a, I>(&self, path: &Path, values: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.store_delimiter)
            .flexible(true)
            .from_path(path)?;
        writer.write_record(values)?;
        writer.flush()?;
        Ok(())
    }

    /// Read the schema persisted by the last completed import
    pub fn read_schema(&self) -> StorageResult<Schema> {
        let path = self.layout.headers_path();
        if !path.is_file() {
            return Err(StorageError::SchemaUnavailable(path));
        }
        let fields = read_line(&path, self.store_delimiter)?;
        Ok(Schema::new(fields))
    }

    /// Lazily scan records matching every `(field, value)` filter.
    ///
    /// Key-field filters narrow the glob pattern. All other filters are
    /// checked against each record read. Matches come back ordered by path
    /// (partition, then date, then item).
    pub fn iter_filtered_records(
        &self,
        filters: &HashMap<String, String>,
    ) -> StorageResult<FilteredRecords> {
        let schema = self.read_schema()?;

        let key_filter = |name: &str| filters.get(name).map(String::as_str);
        let pattern = self.layout.pattern(
            key_filter(self.key_fields.partition.as_str()),
            key_filter(self.key_fields.date.as_str()),
            key_filter(self.key_fields.item.as_str()),
        );
        let remaining: Vec<(String, String)> = filters
            .iter()
            .filter(|(field, _)| !self.key_fields.is_key(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        tracing::debug!(
            "Scanning {} with {} field filter(s)",
            pattern,
            remaining.len()
        );

        Ok(FilteredRecords {
            paths: glob::glob(&pattern)?,
            schema,
            filters: remaining,
            delimiter: self.store_delimiter,
        })
    }
}

/// Read the first delimited line of a file
fn read_line(path: &Path, delimiter: u8) -> StorageResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    match reader.records().next() {
        Some(row) => Ok(row?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Single-pass scan over matching record files
///
/// Each file is opened, read, and closed before the next is visited.
pub struct FilteredRecords {
    paths: glob::Paths,
    schema: Schema,
    filters: Vec<(String, String)>,
    delimiter: u8,
}

impl FilteredRecords {
    fn read_record(&self, path: &Path) -> StorageResult<Record> {
        let values = read_line(path, self.delimiter)?;
        if values.len() != self.schema.len() {
            tracing::warn!(
                "{:?} holds {} values but the schema has {} fields",
                path,
                values.len(),
                self.schema.len()
            );
        }
        Ok(Record::from_pairs(self.schema.fields().iter().cloned(), values))
    }
}

impl Iterator for FilteredRecords {
    type Item = StorageResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = match self.paths.next()? {
                Ok(path) => path,
                Err(e) => return Some(Err(e.into())),
            };
            if !path.is_file() {
                continue;
            }

            match self.read_record(&path) {
                Ok(record) => {
                    if record.matches_all(self.filters.iter().map(|(k, v)| (k, v))) {
                        return Some(Ok(record));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
