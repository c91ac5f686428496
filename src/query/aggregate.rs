//! Group aggregation
//!
//! The first record of a group seeds one running value per aggregate column.
//! Every later record of the group is folded into those values.
//!
//! | op        | seed                    | fold                     |
//! |-----------|-------------------------|--------------------------|
//! | `min`     | coerced value           | smaller of the two       |
//! | `max`     | coerced value           | larger of the two        |
//! | `sum`     | coerced value           | addition, text appends   |
//! | `count`   | 1                       | +1                       |
//! | `collect` | `{raw}`                 | set union of raw values  |

use crate::query::ast::{AggregateOp, Query};
use crate::query::coercion::{format_minutes, Coercion, CoercionTable};
use crate::query::error::{QueryError, QueryResult};
use crate::storage::Record;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// A running or final aggregate value
///
/// Values of one column always share a variant, so the derived ordering
/// only ever compares like with like.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AggValue {
    Text(String),
    Decimal(Decimal),
    /// Total minutes of an `H:MM` duration
    Minutes(i64),
    Count(u64),
    /// Distinct raw values, kept sorted
    Set(BTreeSet<String>),
}

impl std::fmt::Display for AggValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Minutes(m) => write!(f, "{}", format_minutes(*m)),
            Self::Count(n) => write!(f, "{}", n),
            Self::Set(values) => {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                write!(f, "[{}]", joined.join(","))
            }
        }
    }
}

/// One `(field, op)` pair and the column it fills
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub field: String,
    pub op: AggregateOp,
    pub column: String,
}

impl AggregateSpec {
    pub fn new(field: impl Into<String>, op: AggregateOp) -> Self {
        let field = field.into();
        let column = format!("{}:{}", field, op);
        Self { field, op, column }
    }
}

/// Aggregate values of one group, keyed by column name
pub type Aggregates = BTreeMap<String, AggValue>;

/// Seeds and folds the aggregate columns of a query
#[derive(Debug, Clone)]
pub struct Aggregator<'a> {
    specs: Vec<AggregateSpec>,
    coercions: &'a CoercionTable,
}

impl<'a> Aggregator<'a> {
    pub fn new(specs: Vec<AggregateSpec>, coercions: &'a CoercionTable) -> Self {
        Self { specs, coercions }
    }

    /// Aggregator for every aggregate select field of a query
    pub fn for_query(query: &Query, coercions: &'a CoercionTable) -> Self {
        let specs = query
            .aggregates()
            .filter_map(|s| s.aggregate.map(|op| AggregateSpec::new(s.field.clone(), op)))
            .collect();
        Self::new(specs, coercions)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[AggregateSpec] {
        &self.specs
    }

    /// Initial aggregate values from a group's first record
    pub fn seed(&self, record: &Record) -> QueryResult<Aggregates> {
        let mut aggregates = Aggregates::new();
        for spec in &self.specs {
            let value = match spec.op {
                AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => {
                    self.coerced(record, &spec.field)?
                }
                AggregateOp::Count => AggValue::Count(1),
                AggregateOp::Collect => {
                    AggValue::Set(BTreeSet::from([raw(record, &spec.field)?.to_string()]))
                }
            };
            aggregates.insert(spec.column.clone(), value);
        }
        Ok(aggregates)
    }

    /// Combine another record of the group into the running values
    pub fn fold(&self, record: &Record, aggregates: &mut Aggregates) -> QueryResult<()> {
        for spec in &self.specs {
            let current = aggregates
                .remove(&spec.column)
                .ok_or_else(|| QueryError::FieldNotFound(spec.column.clone()))?;

            let combined = match (spec.op, current) {
                // Ties keep the newer value: `4.0` then `4.00` gives `4.00`
                (AggregateOp::Min, current) => self.coerced(record, &spec.field)?.min(current),
                (AggregateOp::Max, current) => current.max(self.coerced(record, &spec.field)?),
                (AggregateOp::Sum, current) => {
                    add(&spec.field, current, self.coerced(record, &spec.field)?)?
                }
                (AggregateOp::Count, AggValue::Count(n)) => AggValue::Count(n + 1),
                (AggregateOp::Collect, AggValue::Set(mut values)) => {
                    values.insert(raw(record, &spec.field)?.to_string());
                    AggValue::Set(values)
                }
                (op, other) => {
                    return Err(QueryError::UnsupportedAggregate(format!(
                        "{} cannot fold into {:?} for {}",
                        op, other, spec.column
                    )))
                }
            };
            aggregates.insert(spec.column.clone(), combined);
        }
        Ok(())
    }

    /// Output text of an aggregate column. A count over a duration field
    /// renders as `H:MM` like the field itself; everything else uses
    /// the value's own formatting.
    pub fn format(&self, column: &str, value: &AggValue) -> String {
        let field = column.split_once(':').map_or(column, |(field, _)| field);
        match value {
            AggValue::Count(n) if self.coercions.strategy(field) == Coercion::Duration => {
                i64::try_from(*n).map_or_else(|_| n.to_string(), format_minutes)
            }
            other => other.to_string(),
        }
    }

    fn coerced(&self, record: &Record, field: &str) -> QueryResult<AggValue> {
        self.coercions.coerce(field, raw(record, field)?)
    }
}

fn raw<'r>(record: &'r Record, field: &str) -> QueryResult<&'r str> {
    record
        .get(field)
        .ok_or_else(|| QueryError::FieldNotFound(field.to_string()))
}

fn add(field: &str, a: AggValue, b: AggValue) -> QueryResult<AggValue> {
    let overflow = || QueryError::InvalidValue {
        field: field.to_string(),
        value: String::new(),
        reason: "sum overflowed".to_string(),
    };

    match (a, b) {
        (AggValue::Decimal(a), AggValue::Decimal(b)) => {
            a.checked_add(b).map(AggValue::Decimal).ok_or_else(overflow)
        }
        (AggValue::Minutes(a), AggValue::Minutes(b)) => {
            a.checked_add(b).map(AggValue::Minutes).ok_or_else(overflow)
        }
        (AggValue::Text(mut a), AggValue::Text(b)) => {
            a.push_str(&b);
            Ok(AggValue::Text(a))
        }
        (a, _) => Err(QueryError::UnsupportedAggregate(format!(
            "sum is not defined for {:?} in {}",
            a, field
        ))),
    }
}
