//! Field value coercion
//!
//! Aggregation compares and adds some fields as numbers rather than
//! strings. Which fields get which treatment is a fixed table keyed by
//! field name; everything not in the table is opaque text.

use crate::query::aggregate::AggValue;
use crate::query::error::{QueryError, QueryResult};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// How a field's raw string is interpreted for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Compare as the raw string
    #[default]
    Text,
    /// Exact decimal, e.g. a money amount `4.00`
    Decimal,
    /// `H:MM` clock duration, as total minutes
    Duration,
}

/// Field name to coercion lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoercionTable {
    fields: HashMap<String, Coercion>,
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::empty()
            .with("REV", Coercion::Decimal)
            .with("VIEW_TIME", Coercion::Duration)
    }
}

impl CoercionTable {
    /// Table treating every field as text
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, coercion: Coercion) -> Self {
        self.fields.insert(field.into(), coercion);
        self
    }

    pub fn strategy(&self, field: &str) -> Coercion {
        self.fields.get(field).copied().unwrap_or_default()
    }

    /// Convert a raw value for comparison and addition
    pub fn coerce(&self, field: &str, raw: &str) -> QueryResult<AggValue> {
        let invalid = |reason: String| QueryError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason,
        };

        match self.strategy(field) {
            Coercion::Text => Ok(AggValue::Text(raw.to_string())),
            Coercion::Decimal => Decimal::from_str(raw.trim())
                .map(AggValue::Decimal)
                .map_err(|e| invalid(e.to_string())),
            Coercion::Duration => parse_minutes(raw)
                .map(AggValue::Minutes)
                .ok_or_else(|| invalid("expected H:MM".to_string())),
        }
    }
}

fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+):(\d+)\s*$").ok())
        .as_ref()
}

/// Parse `H:MM` into total minutes
pub fn parse_minutes(raw: &str) -> Option<i64> {
    let caps = duration_regex()?.captures(raw)?;
    let hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Render total minutes back to `H:MM`
pub fn format_minutes(total: i64) -> String {
    format!("{}:{:02}", total / 60, total % 60)
}
