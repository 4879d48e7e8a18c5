//! Result collection returned by every action.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::table::Record;

/// Rows returned by an action, plus an optional row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResult {
    pub entity: String,
    pub action: String,
    rows: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<Value>,
}

impl ApiResult {
    pub fn new(entity: impl Into<String>, action: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            entity: entity.into(),
            action: action.into(),
            rows,
            row_count: None,
            debug: None,
        }
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_debug(mut self, debug: Value) -> Self {
        self.debug = Some(debug);
        self
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&Record> {
        self.rows.first()
    }

    /// Row count when one was selected, otherwise the number of rows.
    pub fn count(&self) -> usize {
        self.row_count.unwrap_or(self.rows.len())
    }

    /// Number of rows actually returned.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn debug(&self) -> Option<&Value> {
        self.debug.as_ref()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    /// Values of one column, `null` where a row lacks it.
    pub fn column(&self, name: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Rows keyed by the string form of one column; later rows win.
    pub fn index_by(&self, name: &str) -> BTreeMap<String, Record> {
        self.rows
            .iter()
            .filter_map(|row| {
                let key = match row.get(name)? {
                    Value::String(s) => s.clone(),
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some((key, row.clone()))
            })
            .collect()
    }
}

impl IntoIterator for ApiResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ApiResult {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
