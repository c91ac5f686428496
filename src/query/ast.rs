//! Query description
//!
//! A report request is a set of exact-match filters, an optional group-by
//! field, order fields, and select fields. A select field may carry an
//! aggregate suffix:
//!
//! ```text
//! TITLE            plain field
//! REV:sum          aggregate over the group
//! TITLE:count      count, shown alongside TITLE itself
//! ```

use crate::query::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// A parsed report request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Fields to sort by, primary first
    pub order_fields: Vec<String>,
    /// Exact-match filters, field to value
    pub filters: HashMap<String, String>,
    /// Columns to output. Empty means every schema field.
    pub select: Vec<SelectField>,
    /// Optional grouping field
    pub group_by: Option<String>,
}

impl Query {
    /// Start building a query with the given select tokens
    pub fn select(fields: &[&str]) -> QueryBuilder {
        QueryBuilder::new(fields)
    }

    /// Start building a query over every schema field
    pub fn all() -> QueryBuilder {
        QueryBuilder::new(&[])
    }

    /// Select fields that carry an aggregate
    pub fn aggregates(&self) -> impl Iterator<Item = &SelectField> {
        self.select.iter().filter(|s| s.aggregate.is_some())
    }
}

/// An item of the select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    /// Underlying record field
    pub field: String,
    /// Optional aggregate applied over the group
    pub aggregate: Option<AggregateOp>,
}

impl SelectField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            aggregate: None,
        }
    }

    pub fn with_aggregate(mut self, op: AggregateOp) -> Self {
        self.aggregate = Some(op);
        self
    }

    /// Report column name, `FIELD` or `FIELD:op`
    pub fn column(&self) -> String {
        match self.aggregate {
            Some(op) => format!("{}:{}", self.field, op),
            None => self.field.clone(),
        }
    }
}

impl FromStr for SelectField {
    type Err = QueryError;

    fn from_str(token: &str) -> QueryResult<Self> {
        match token.split_once(':') {
            Some((field, op)) => Ok(Self::new(field).with_aggregate(op.parse()?)),
            None => Ok(Self::new(token)),
        }
    }
}

/// Aggregate operators available on select fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Count,
    /// Set of distinct raw values
    Collect,
}

impl FromStr for AggregateOp {
    type Err = QueryError;

    fn from_str(s: &str) -> QueryResult<Self> {
        match s {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            "count" => Ok(Self::Count),
            "collect" => Ok(Self::Collect),
            other => Err(QueryError::UnsupportedAggregate(format!(
                "unknown operator {:?} (expected min, max, sum, count or collect)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Sum => write!(f, "sum"),
            Self::Count => write!(f, "count"),
            Self::Collect => write!(f, "collect"),
        }
    }
}

/// Builder for [`Query`]
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    select: Vec<String>,
    order_fields: Vec<String>,
    filters: HashMap<String, String>,
    group_by: Option<String>,
}

impl QueryBuilder {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            select: fields.iter().map(|s| s.to_string()).collect(),
            order_fields: Vec::new(),
            filters: HashMap::new(),
            group_by: None,
        }
    }

    /// Add an exact-match filter
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Add several filters at once
    pub fn filters(mut self, filters: HashMap<String, String>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Sort by these fields, primary first
    pub fn order_by(mut self, fields: &[&str]) -> Self {
        self.order_fields
            .extend(fields.iter().map(|s| s.to_string()));
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    /// Parse the select tokens and build the query
    pub fn build(self) -> QueryResult<Query> {
        let select = self
            .select
            .iter()
            .map(|token| token.parse())
            .collect::<QueryResult<Vec<SelectField>>>()?;

        Ok(Query {
            order_fields: self.order_fields,
            filters: self.filters,
            select,
            group_by: self.group_by.filter(|g| !g.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_field() {
        let plain: SelectField = "TITLE".parse().unwrap();
        assert_eq!(plain, SelectField::new("TITLE"));
        assert_eq!(plain.column(), "TITLE");

        let agg: SelectField = "REV:sum".parse().unwrap();
        assert_eq!(agg, SelectField::new("REV").with_aggregate(AggregateOp::Sum));
        assert_eq!(agg.column(), "REV:sum");
    }

    #[test]
    fn test_unknown_operator() {
        let result = "REV:avg".parse::<SelectField>();
        assert!(matches!(result, Err(QueryError::UnsupportedAggregate(_))));

        // Operators are case-sensitive, like field names
        assert!("REV:SUM".parse::<SelectField>().is_err());
        assert!("REV:sum:extra".parse::<SelectField>().is_err());
    }

    #[test]
    fn test_builder() {
        let query = Query::select(&["TITLE", "REV:sum", "STB:collect"])
            .filter("PROVIDER", "warner bros")
            .order_by(&["TITLE"])
            .group_by("TITLE")
            .build()
            .unwrap();

        assert_eq!(query.select.len(), 3);
        assert_eq!(query.aggregates().count(), 2);
        assert_eq!(query.order_fields, vec!["TITLE"]);
        assert_eq!(query.group_by.as_deref(), Some("TITLE"));
        assert_eq!(query.filters.get("PROVIDER").map(String::as_str), Some("warner bros"));
    }

    #[test]
    fn test_empty_group_by_is_none() {
        let query = Query::all().group_by("").build().unwrap();
        assert!(query.group_by.is_none());
        assert!(query.select.is_empty());
    }
}
