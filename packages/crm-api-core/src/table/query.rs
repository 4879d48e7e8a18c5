//! Query conditions and filtering over table rows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::{FieldSpec, Record, Table};
use crate::error::{ApiError, Result};

/// Where-clause comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Like,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes no comparison value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Evaluates the operator for a stored value.
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            Operator::IsNull => actual.is_null(),
            Operator::IsNotNull => !actual.is_null(),
            Operator::Eq => values_equal(actual, expected),
            Operator::NotEq => !values_equal(actual, expected),
            Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::In => expected
                .as_array()
                .is_some_and(|list| list.iter().any(|v| values_equal(actual, v))),
            Operator::NotIn => expected
                .as_array()
                .is_some_and(|list| !list.iter().any(|v| values_equal(actual, v))),
            Operator::Like => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(pattern)) => like(
                    &text.to_lowercase().chars().collect::<Vec<_>>(),
                    &pattern.to_lowercase().chars().collect::<Vec<_>>(),
                ),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "LIKE" => Operator::Like,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            _ => return Err(ApiError::InvalidOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Single `field operator value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Condition matching exactly one id.
    pub fn id(id: i64) -> Self {
        Self::new("id", Operator::Eq, Value::from(id))
    }

    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        self.operator.matches(actual, &self.value)
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Read query against a single entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conditions combined with AND
    pub conditions: Vec<Condition>,
    /// Fields to return; empty means every stored field
    pub select: Vec<String>,
    /// Sort keys applied in order; rows default to ascending id
    pub order_by: Vec<(String, SortDirection)>,
    /// Maximum number of rows to return
    pub limit: Option<usize>,
    /// Number of matching rows to skip
    pub offset: Option<usize>,
}

impl Query {
    /// Query for a single record by id.
    pub fn by_id(id: i64) -> Self {
        Self {
            conditions: vec![Condition::id(id)],
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

impl Table {
    /// Returns rows matching `query`, ordered, paginated and projected.
    ///
    /// Every condition, select and sort field must exist in the schema;
    /// `id` is always part of a projection.
    pub fn query_records(&self, query: &Query) -> Result<Vec<Record>> {
        check_query_fields(&self.name, &self.fields(), query)?;
        Ok(run_query(self.snapshot().values(), query))
    }

    /// Counts rows matching the query conditions, ignoring pagination.
    pub fn count_records(&self, query: &Query) -> Result<usize> {
        check_query_fields(&self.name, &self.fields(), query)?;
        Ok(self.snapshot().values().filter(|r| query.matches(r)).count())
    }
}

/// Fails if the query names a field missing from `fields`.
pub fn check_query_fields(label: &str, fields: &[FieldSpec], query: &Query) -> Result<()> {
    let names = query
        .conditions
        .iter()
        .map(|c| c.field.as_str())
        .chain(query.select.iter().map(String::as_str))
        .chain(query.order_by.iter().map(|(f, _)| f.as_str()));
    for name in names {
        if !fields.iter().any(|f| f.name == name) {
            return Err(ApiError::FieldNotFound {
                entity: label.to_string(),
                field: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Filters, sorts, paginates and projects `rows` according to `query`.
pub fn run_query<'a>(rows: impl IntoIterator<Item = &'a Record>, query: &Query) -> Vec<Record> {
    let mut matching: Vec<&Record> = rows.into_iter().filter(|r| query.matches(r)).collect();

    if !query.order_by.is_empty() {
        matching.sort_by(|a, b| {
            for (field, direction) in &query.order_by {
                let left = a.get(field).unwrap_or(&Value::Null);
                let right = b.get(field).unwrap_or(&Value::Null);
                let ord = compare(left, right).unwrap_or(Ordering::Equal);
                let ord = match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    let skip = query.offset.unwrap_or(0);
    let take = query.limit.unwrap_or(usize::MAX);

    matching
        .into_iter()
        .skip(skip)
        .take(take)
        .map(|record| project(record, &query.select))
        .collect()
}

fn project(record: &Record, select: &[String]) -> Record {
    if select.is_empty() {
        return record.clone();
    }
    let mut out = Record::new();
    if let Some(id) = record.get("id") {
        out.insert("id".into(), id.clone());
    }
    for name in select {
        out.insert(
            name.clone(),
            record.get(name).cloned().unwrap_or(Value::Null),
        );
    }
    out
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// SQL LIKE with `%` (any run) and `_` (any single char).
///
/// Greedy two-pointer match; backtracks only to the most recent `%`.
fn like(text: &[char], pattern: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p).copied() {
            Some('%') => {
                star = Some((p, t));
                p += 1;
            }
            Some(c) if c == '_' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
