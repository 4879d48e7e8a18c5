//! Action parameter specs, validation and parsing.

use serde_json::Value;

use super::ActionKind;
use crate::error::{ApiError, Result};
use crate::table::{Condition, Operator, Query, Record, SortDirection};
use crate::types::json_type_name;

/// JSON type an action parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    Integer,
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Bool => "bool",
            ParamType::Integer => "int",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// `null` counts as unset and is always accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ParamType::Bool, Value::Bool(_)) => true,
            (ParamType::Integer, Value::Number(n)) => n.is_u64(),
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Array, Value::Array(_)) => true,
            (ParamType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

/// Declared parameter of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
}

const fn spec(name: &'static str, param_type: ParamType) -> ParamSpec {
    ParamSpec { name, param_type }
}

const COMMON: [ParamSpec; 2] = [
    spec("check_permissions", ParamType::Bool),
    spec("debug", ParamType::Bool),
];

const GET: [ParamSpec; 5] = [
    spec("where", ParamType::Array),
    spec("select", ParamType::Array),
    spec("order_by", ParamType::Object),
    spec("limit", ParamType::Integer),
    spec("offset", ParamType::Integer),
];

const WRITE: [ParamSpec; 1] = [spec("values", ParamType::Object)];

const UPDATE: [ParamSpec; 2] = [
    spec("where", ParamType::Array),
    spec("values", ParamType::Object),
];

const DELETE: [ParamSpec; 1] = [spec("where", ParamType::Array)];

const GET_FIELDS: [ParamSpec; 1] = [spec("include_custom", ParamType::Bool)];

/// Parameters accepted by an action, common ones first.
pub fn param_specs(action: ActionKind) -> Vec<ParamSpec> {
    let own: &[ParamSpec] = match action {
        ActionKind::Get => &GET,
        ActionKind::Create | ActionKind::Save => &WRITE,
        ActionKind::Update => &UPDATE,
        ActionKind::Delete => &DELETE,
        ActionKind::GetFields => &GET_FIELDS,
        ActionKind::GetActions => &[],
    };
    COMMON.iter().chain(own).copied().collect()
}

/// Rejects unknown parameters and values of the wrong JSON type.
pub fn validate(entity: &str, action: ActionKind, params: &Record) -> Result<()> {
    let specs = param_specs(action);
    for (name, value) in params {
        let spec = specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ApiError::UnknownParam {
                entity: entity.to_string(),
                action: action.as_str().to_string(),
                param: name.clone(),
            })?;
        if !spec.param_type.accepts(value) {
            return Err(ApiError::WrongParamType {
                param: name.clone(),
                expected: spec.param_type.name(),
                got: json_type_name(value),
            });
        }
    }
    Ok(())
}

/// Reads a boolean parameter, falling back to `default` when unset.
pub fn flag(params: &Record, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Reads the `values` object.
pub fn values(params: &Record) -> Record {
    params
        .get("values")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Parses `where` clauses of the form `[field, operator, value]`.
pub fn parse_where(params: &Record) -> Result<Vec<Condition>> {
    let Some(clauses) = params.get("where").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    clauses
        .iter()
        .map(|clause| {
            let parts = clause
                .as_array()
                .ok_or_else(|| ApiError::InvalidWhereClause(clause.to_string()))?;
            let field = parts
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::InvalidWhereClause(clause.to_string()))?;
            let operator: Operator = parts
                .get(1)
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::InvalidWhereClause(clause.to_string()))?
                .parse()?;
            let value = match parts.get(2) {
                Some(v) => v.clone(),
                None if operator.is_unary() => Value::Null,
                None => return Err(ApiError::InvalidWhereClause(clause.to_string())),
            };
            if matches!(operator, Operator::In | Operator::NotIn) && !value.is_array() {
                return Err(ApiError::InvalidWhereClause(format!(
                    "{} expects a list in {}",
                    operator, clause
                )));
            }
            Ok(Condition::new(field, operator, value))
        })
        .collect()
}

/// Builds a read query from get parameters.
///
/// The `row_count` pseudo-field is stripped from `select`; the second
/// element of the returned tuple says whether it was requested.
pub fn parse_query(params: &Record) -> Result<(Query, bool)> {
    let mut select = Vec::new();
    let mut row_count = false;
    if let Some(fields) = params.get("select").and_then(Value::as_array) {
        for field in fields {
            match field.as_str() {
                Some("row_count") => row_count = true,
                Some(name) => select.push(name.to_string()),
                None => {
                    return Err(ApiError::WrongParamType {
                        param: "select".to_string(),
                        expected: "string",
                        got: json_type_name(field),
                    })
                }
            }
        }
    }

    let mut order_by = Vec::new();
    if let Some(order) = params.get("order_by").and_then(Value::as_object) {
        for (field, direction) in order {
            let direction = match direction.as_str().map(str::to_ascii_uppercase).as_deref() {
                Some("ASC") => SortDirection::Asc,
                Some("DESC") => SortDirection::Desc,
                _ => {
                    return Err(ApiError::WrongParamType {
                        param: "order_by".to_string(),
                        expected: "\"ASC\" or \"DESC\"",
                        got: json_type_name(direction),
                    })
                }
            };
            order_by.push((field.clone(), direction));
        }
    }

    let query = Query {
        conditions: parse_where(params)?,
        select,
        order_by,
        limit: params
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .filter(|&n| n > 0),
        offset: params
            .get("offset")
            .and_then(Value::as_u64)
            .map(|n| n as usize),
    };
    Ok((query, row_count))
}
