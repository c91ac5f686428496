//! Delimited record import
//!
//! Reads a delimited text stream whose first row names the fields. Every
//! following row becomes a [`Record`] by positional correspondence with
//! that header row.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::Record;
use std::io::Read;

/// Streaming reader over an import file
pub struct RecordReader<R: Read> {
    headers: Vec<String>,
    rows: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> RecordReader<R> {
    /// Open a stream and consume its header row
    pub fn new(input: R, delimiter: u8) -> StorageResult<Self> {
        let mut rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(input)
            .into_records();

        let headers = match rows.next() {
            Some(header_row) => header_row?.iter().map(str::to_string).collect(),
            None => {
                return Err(StorageError::MalformedInput(
                    "input stream is empty, expected a header row".to_string(),
                ))
            }
        };

        Ok(Self { headers, rows })
    }

    /// Field names from the header row, in input order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = StorageResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.map(|row| Record::from_pairs(self.headers.iter().cloned(), row.iter()))
                .map_err(StorageError::from),
        )
    }
}
