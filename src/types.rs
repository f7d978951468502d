//! Query values, rows and results
//!
//! This module provides:
//! - `Value`: the small SQL value model passed as statement arguments and
//!   returned in rows
//! - `Row`: a column-name addressable result row
//! - `ExecResult`: the raw result a driver produces for one connection
//! - `QueryResult`: the merged logical result across all participating
//!   connections
//! - `QueryOption` / `ShardTarget`: per-query routing options

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A SQL value as seen by the router.
///
/// Deliberately small: the router moves values between caller and driver
/// without interpreting them, so only the shapes needed for argument
/// binding and map aggregation are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Bytes),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, when it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Stringified form used as an aggregation key in batch lookups.
    /// `Null` has no key form; a row whose key column is `Null` is treated
    /// as unmatched.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One result row, column names paired positionally with values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value by column name, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// Raw result a driver produced for a single connection.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub rows: Vec<Row>,
    /// Identifier generated by an insert, if the statement produced one.
    pub insert_id: Option<u64>,
    pub affected_rows: u64,
    pub changed_rows: u64,
}

impl ExecResult {
    /// Result carrying only rows, the common read-query shape.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }
}

/// Logical result of one `query` call, merged across every participating
/// connection.
///
/// Rows concatenate in participation order, `insert_ids` collects only the
/// identifiers that were actually produced, and the affected/changed
/// counters sum across connections.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub insert_ids: Vec<u64>,
    pub affected_rows: u64,
    pub changed_rows: u64,
}

impl QueryResult {
    /// Fold one per-connection result into the merged total.
    pub fn absorb(&mut self, result: ExecResult) {
        self.rows.extend(result.rows);
        if let Some(id) = result.insert_id {
            self.insert_ids.push(id);
        }
        self.affected_rows += result.affected_rows;
        self.changed_rows += result.changed_rows;
    }
}

impl From<ExecResult> for QueryResult {
    fn from(result: ExecResult) -> Self {
        let mut merged = QueryResult::default();
        merged.absorb(result);
        merged
    }
}

/// Shard selection for a query against a shard topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardTarget {
    /// Route to the single member owning this identifier.
    Id(i64),
    /// Fan out to every member and merge the results.
    All,
}

/// Per-query routing options.
#[derive(Debug, Clone, Default)]
pub struct QueryOption {
    /// Force the primary on a replica topology.
    pub master: bool,
    /// Shard selection; mandatory when the adapter topology is `Shard`.
    pub shard_of: Option<ShardTarget>,
    /// Column used as the aggregation key in `query_map` (default `"id"`).
    pub id_column: Option<String>,
}

impl QueryOption {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force primary selection on replica topologies.
    pub fn with_master(mut self) -> Self {
        self.master = true;
        self
    }

    /// Route to the shard member owning `id`.
    pub fn with_shard(mut self, id: i64) -> Self {
        self.shard_of = Some(ShardTarget::Id(id));
        self
    }

    /// Fan out to every shard member.
    pub fn with_all_shards(mut self) -> Self {
        self.shard_of = Some(ShardTarget::All);
        self
    }

    /// Set the aggregation key column for `query_map`.
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }
}
