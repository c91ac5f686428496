//! Query Executor
//!
//! Runs a [`Query`] against the [`FlatStore`] and writes a delimited report:
//! 1. Scan records matching the filters
//! 2. Group by a field, seeding and folding aggregates per group
//! 3. Stable sort by the order fields (raw string values)
//! 4. Project the select list and format each value
//!
//! # Execution Pipeline
//!
//! ```text
//! Query → Validate → Scan → Group/Aggregate → Sort → Project → Report
//! ```

use crate::query::aggregate::{Aggregates, Aggregator};
use crate::query::ast::{AggregateOp, Query, SelectField};
use crate::query::coercion::CoercionTable;
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{FlatStore, Record, Schema};
use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;

/// Summary of a written report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStats {
    /// Output column names
    pub columns: Vec<String>,
    /// Records returned by the filtered scan
    pub records_scanned: usize,
    /// Data rows written, excluding the header
    pub rows_written: usize,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// A surviving output row: a record plus its group's aggregate values
#[derive(Debug, Clone)]
struct Row {
    record: Record,
    aggregates: Aggregates,
}

impl Row {
    fn plain(record: Record) -> Self {
        Self {
            record,
            aggregates: Aggregates::new(),
        }
    }

    /// Formatted value of an output column
    fn value(&self, column: &str, aggregator: &Aggregator<'_>) -> QueryResult<String> {
        if let Some(value) = self.aggregates.get(column) {
            return Ok(aggregator.format(column, value));
        }
        self.record
            .get(column)
            .map(str::to_string)
            .ok_or_else(|| QueryError::FieldNotFound(column.to_string()))
    }
}

/// Query executor
pub struct QueryExecutor {
    store: FlatStore,
    coercions: CoercionTable,
    output_delimiter: String,
}

impl QueryExecutor {
    /// Create an executor with the default coercion table and `|` output
    pub fn new(store: FlatStore) -> Self {
        Self {
            store,
            coercions: CoercionTable::default(),
            output_delimiter: "|".to_string(),
        }
    }

    pub fn with_coercions(mut self, coercions: CoercionTable) -> Self {
        self.coercions = coercions;
        self
    }

    pub fn with_output_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.output_delimiter = delimiter.into();
        self
    }

    pub fn store(&self) -> &FlatStore {
        &self.store
    }

    /// Run a query and return the report as a string
    pub fn query_to_string(&self, query: &Query) -> QueryResult<String> {
        let mut out = Vec::new();
        self.query(query, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Run a query, writing the header line and one line per surviving row to `out`
    pub fn query<W: Write>(&self, query: &Query, out: &mut W) -> QueryResult<ReportStats> {
        let start = Instant::now();

        // 1. Validate names against the current schema
        let schema = self.store.read_schema()?;
        validate_fields(&schema, query)?;

        let select: Vec<SelectField> = if query.select.is_empty() {
            schema.fields().iter().map(SelectField::new).collect()
        } else {
            query.select.clone()
        };
        let aggregator = Aggregator::for_query(query, &self.coercions);

        // 2. Scan; order here is the store's path order
        let records = self
            .store
            .iter_filtered_records(&query.filters)?
            .collect::<Result<Vec<Record>, _>>()?;
        let records_scanned = records.len();

        // 3. Group and aggregate
        let rows = match &query.group_by {
            Some(group_by) => group_rows(records, group_by, &aggregator)?,
            None if !aggregator.is_empty() => records
                .into_iter()
                .map(|record| {
                    let aggregates = aggregator.seed(&record)?;
                    Ok(Row { record, aggregates })
                })
                .collect::<QueryResult<Vec<Row>>>()?,
            None => records.into_iter().map(Row::plain).collect(),
        };

        // 4. Order
        let rows = if query.order_fields.is_empty() {
            rows
        } else {
            sort_rows(rows, &query.order_fields)?
        };

        // 5. Project and write
        let columns = output_columns(&select);
        writeln!(out, "{}", columns.join(self.output_delimiter.as_str()))?;
        for row in &rows {
            let values = columns
                .iter()
                .map(|column| row.value(column, &aggregator))
                .collect::<QueryResult<Vec<String>>>()?;
            writeln!(out, "{}", values.join(self.output_delimiter.as_str()))?;
        }
        out.flush()?;

        let stats = ReportStats {
            columns,
            records_scanned,
            rows_written: rows.len(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Query scanned {} records, wrote {} rows in {}ms",
            stats.records_scanned,
            stats.rows_written,
            stats.execution_time_ms
        );
        Ok(stats)
    }
}

/// Check every referenced field exists in the schema
fn validate_fields(schema: &Schema, query: &Query) -> QueryResult<()> {
    let referenced = query
        .filters
        .keys()
        .chain(query.order_fields.iter())
        .chain(query.group_by.iter())
        .chain(query.select.iter().map(|s| &s.field));

    for field in referenced {
        if !schema.contains(field) {
            return Err(QueryError::FieldNotFound(field.clone()));
        }
    }
    Ok(())
}

/// Collapse records into one row per distinct `group_by` value, in
/// first-seen order. The first record of each group is its representative.
fn group_rows(
    records: Vec<Record>,
    group_by: &str,
    aggregator: &Aggregator<'_>,
) -> QueryResult<Vec<Row>> {
    let mut rows: Vec<Row> = Vec::new();
    let mut groups: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record
            .get(group_by)
            .ok_or_else(|| QueryError::FieldNotFound(group_by.to_string()))?
            .to_string();

        let existing = groups.get(&key).copied();
        match existing {
            Some(idx) => aggregator.fold(&record, &mut rows[idx].aggregates)?,
            None => {
                let aggregates = aggregator.seed(&record)?;
                groups.insert(key, rows.len());
                rows.push(Row { record, aggregates });
            }
        }
    }

    tracing::debug!("Grouped by {} into {} groups", group_by, rows.len());
    Ok(rows)
}

/// Stable sort on the raw string values of `order_fields`, primary first
fn sort_rows(rows: Vec<Row>, order_fields: &[String]) -> QueryResult<Vec<Row>> {
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let key = order_fields
                .iter()
                .map(|field| {
                    row.record
                        .get(field)
                        .map(str::to_string)
                        .ok_or_else(|| QueryError::FieldNotFound(field.clone()))
                })
                .collect::<QueryResult<Vec<String>>>()?;
            Ok((key, row))
        })
        .collect::<QueryResult<Vec<(Vec<String>, Row)>>>()?;

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Report columns. A `count` column is preceded by its plain field.
fn output_columns(select: &[SelectField]) -> Vec<String> {
    let mut columns = Vec::with_capacity(select.len());
    for item in select {
        if item.aggregate == Some(AggregateOp::Count) {
            columns.push(item.field.clone());
        }
        columns.push(item.column());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreConfig;
    use tempfile::tempdir;

    const INPUT: &str = "STB|TITLE|PROVIDER|DATE|REV|VIEW_TIME
stb1|the matrix|warner bros|2014-04-01|4.00|1:30
stb1|unbreakable|buena vista|2014-04-03|6.00|2:05
stb2|the hobbit|warner bros|2014-04-02|8.00|2:45
stb3|the matrix|warner bros|2014-04-02|4.00|1:05
";

    fn create_test_executor() -> (QueryExecutor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = FlatStore::new(StoreConfig::new(dir.path().join("data"))).unwrap();
        store.import_records(INPUT.as_bytes(), true).unwrap();
        (QueryExecutor::new(store), dir)
    }

    fn run(executor: &QueryExecutor, query: Query) -> String {
        executor.query_to_string(&query).unwrap()
    }

    #[test]
    fn test_select_input_order_reproduces_input() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["STB", "TITLE", "PROVIDER", "DATE", "REV", "VIEW_TIME"])
            .build()
            .unwrap();
        assert_eq!(run(&executor, query), INPUT);
    }

    #[test]
    fn test_select_single_field() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["STB"]).build().unwrap();
        assert_eq!(run(&executor, query), "STB\nstb1\nstb1\nstb2\nstb3\n");
    }

    #[test]
    fn test_default_projection_is_schema_order() {
        let (executor, _dir) = create_test_executor();
        let query = Query::all().build().unwrap();
        assert_eq!(
            run(&executor, query),
            "DATE|PROVIDER|REV|STB|TITLE|VIEW_TIME
2014-04-01|warner bros|4.00|stb1|the matrix|1:30
2014-04-03|buena vista|6.00|stb1|unbreakable|2:05
2014-04-02|warner bros|8.00|stb2|the hobbit|2:45
2014-04-02|warner bros|4.00|stb3|the matrix|1:05
"
        );
    }

    #[test]
    fn test_filters() {
        let (executor, _dir) = create_test_executor();

        let query = Query::all().filter("REV", "8.00").build().unwrap();
        assert_eq!(
            run(&executor, query),
            "DATE|PROVIDER|REV|STB|TITLE|VIEW_TIME
2014-04-02|warner bros|8.00|stb2|the hobbit|2:45
"
        );

        let query = Query::all().filter("REV", "4.00").build().unwrap();
        assert_eq!(
            run(&executor, query),
            "DATE|PROVIDER|REV|STB|TITLE|VIEW_TIME
2014-04-01|warner bros|4.00|stb1|the matrix|1:30
2014-04-02|warner bros|4.00|stb3|the matrix|1:05
"
        );

        let query = Query::all()
            .filter("REV", "4.00")
            .filter("STB", "stb3")
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "DATE|PROVIDER|REV|STB|TITLE|VIEW_TIME
2014-04-02|warner bros|4.00|stb3|the matrix|1:05
"
        );

        let query = Query::select(&["TITLE"]).filter("TITLE", "matrix").build().unwrap();
        assert_eq!(run(&executor, query), "TITLE\n");
    }

    #[test]
    fn test_multiple_order_fields() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "REV", "DATE"])
            .order_by(&["DATE", "TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|REV|DATE
the matrix|4.00|2014-04-01
the hobbit|8.00|2014-04-02
the matrix|4.00|2014-04-02
unbreakable|6.00|2014-04-03
"
        );
    }

    #[test]
    fn test_group_by_without_aggregates() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE\nthe hobbit\nthe matrix\nunbreakable\n"
        );
    }

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "STB"]).group_by("TITLE").build().unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|STB\nthe matrix|stb1\nunbreakable|stb1\nthe hobbit|stb2\n"
        );
    }

    #[test]
    fn test_group_by_sum() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "REV:sum"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|REV:sum\nthe hobbit|8.00\nthe matrix|8.00\nunbreakable|6.00\n"
        );
    }

    #[test]
    fn test_group_by_min_and_filtered_max() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "DATE:min"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|DATE:min\nthe hobbit|2014-04-02\nthe matrix|2014-04-01\nunbreakable|2014-04-03\n"
        );

        let query = Query::select(&["TITLE", "DATE:max"])
            .filter("TITLE", "the matrix")
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(run(&executor, query), "TITLE|DATE:max\nthe matrix|2014-04-02\n");
    }

    #[test]
    fn test_count_duplicates_group_column() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE:count"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|TITLE:count\nthe hobbit|1\nthe matrix|2\nunbreakable|1\n"
        );
    }

    #[test]
    fn test_collect_and_sum() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "REV:sum", "STB:collect"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|REV:sum|STB:collect
the hobbit|8.00|[stb2]
the matrix|8.00|[stb1,stb3]
unbreakable|6.00|[stb1]
"
        );
    }

    #[test]
    fn test_aggregates_for_all_fields() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&[
            "TITLE:count",
            "REV:sum",
            "STB:collect",
            "PROVIDER:collect",
            "VIEW_TIME:sum",
            "DATE:max",
        ])
        .group_by("TITLE")
        .order_by(&["TITLE"])
        .build()
        .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|TITLE:count|REV:sum|STB:collect|PROVIDER:collect|VIEW_TIME:sum|DATE:max
the hobbit|1|8.00|[stb2]|[warner bros]|2:45|2014-04-02
the matrix|2|8.00|[stb1,stb3]|[warner bros]|2:35|2014-04-02
unbreakable|1|6.00|[stb1]|[buena vista]|2:05|2014-04-03
"
        );
    }

    #[test]
    fn test_aggregates_without_group_by_are_per_record() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "REV:sum", "STB:collect"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|REV:sum|STB:collect
the matrix|4.00|[stb1]
unbreakable|6.00|[stb1]
the hobbit|8.00|[stb2]
the matrix|4.00|[stb3]
"
        );
    }

    #[test]
    fn test_order_by_uses_raw_strings() {
        let dir = tempdir().unwrap();
        let store = FlatStore::new(StoreConfig::new(dir.path().join("data"))).unwrap();
        store
            .import_records(
                "STB|TITLE|DATE|REV\nstb1|a|2014-04-01|10.00\nstb1|b|2014-04-01|9.00\n".as_bytes(),
                true,
            )
            .unwrap();
        let executor = QueryExecutor::new(store);

        let query = Query::select(&["REV"]).order_by(&["REV"]).build().unwrap();
        assert_eq!(run(&executor, query), "REV\n10.00\n9.00\n");
    }

    #[test]
    fn test_unknown_fields() {
        let (executor, _dir) = create_test_executor();

        for query in [
            Query::all().order_by(&["RATING"]).build().unwrap(),
            Query::select(&["RATING"]).build().unwrap(),
            Query::all().group_by("RATING").build().unwrap(),
            Query::all().filter("RATING", "5").build().unwrap(),
        ] {
            let result = executor.query_to_string(&query);
            assert!(
                matches!(result, Err(QueryError::FieldNotFound(ref f)) if f == "RATING"),
                "unexpected result {:?}",
                result
            );
        }
    }

    #[test]
    fn test_query_before_import() {
        let dir = tempdir().unwrap();
        let store = FlatStore::new(StoreConfig::new(dir.path().join("data"))).unwrap();
        let executor = QueryExecutor::new(store);

        let result = executor.query_to_string(&Query::all().build().unwrap());
        assert!(matches!(
            result,
            Err(QueryError::Storage(crate::storage::StorageError::SchemaUnavailable(_)))
        ));
    }

    #[test]
    fn test_sum_over_text_concatenates() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["TITLE", "PROVIDER:sum"])
            .group_by("TITLE")
            .order_by(&["TITLE"])
            .build()
            .unwrap();
        assert_eq!(
            run(&executor, query),
            "TITLE|PROVIDER:sum
the hobbit|warner bros
the matrix|warner broswarner bros
unbreakable|buena vista
"
        );
    }

    #[test]
    fn test_count_over_duration_renders_as_duration() {
        let (executor, _dir) = create_test_executor();
        let query = Query::select(&["VIEW_TIME:count"])
            .filter("TITLE", "the matrix")
            .group_by("TITLE")
            .build()
            .unwrap();
        assert_eq!(run(&executor, query), "VIEW_TIME|VIEW_TIME:count\n1:30|0:02\n");
    }

    #[test]
    fn test_report_stats_and_delimiter() {
        let (executor, _dir) = create_test_executor();
        let executor = executor.with_output_delimiter(",");
        let query = Query::select(&["STB:count"]).group_by("STB").build().unwrap();

        let mut out = Vec::new();
        let stats = executor.query(&query, &mut out).unwrap();

        assert_eq!(stats.columns, vec!["STB", "STB:count"]);
        assert_eq!(stats.records_scanned, 4);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "STB,STB:count\nstb1,2\nstb2,1\nstb3,1\n"
        );
    }
}
