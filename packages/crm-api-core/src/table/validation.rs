//! Validation for table schemas and record values.

use std::collections::HashSet;

use super::field::FieldSpec;
use super::Record;
use crate::error::{ApiError, Result};
use crate::types::{json_type_name, DataType};

/// Validates that field names are unique and that an integer `id` exists.
pub(crate) fn validate_schema(label: &str, fields: &[FieldSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ApiError::FieldAlreadyExists {
                entity: label.to_string(),
                field: field.name.clone(),
            });
        }
    }

    match fields.iter().find(|f| f.name == "id") {
        Some(id) if id.data_type == DataType::Integer => Ok(()),
        Some(id) => Err(ApiError::InvalidValue {
            entity: label.to_string(),
            field: "id".to_string(),
            message: format!("id must be Integer, declared as {}", id.data_type),
        }),
        None => Err(ApiError::FieldNotFound {
            entity: label.to_string(),
            field: "id".to_string(),
        }),
    }
}

/// Validates that every value names a known field and matches its type.
pub(crate) fn validate_values(label: &str, fields: &[FieldSpec], values: &Record) -> Result<()> {
    for (name, value) in values {
        let field = fields
            .iter()
            .find(|f| &f.name == name)
            .ok_or_else(|| ApiError::FieldNotFound {
                entity: label.to_string(),
                field: name.clone(),
            })?;
        if !field.data_type.accepts(value) {
            return Err(ApiError::FieldTypeMismatch {
                entity: label.to_string(),
                field: name.clone(),
                expected: field.data_type.expected(),
                got: json_type_name(value).to_string(),
            });
        }
    }
    Ok(())
}

/// Fails with every required field that create values leave empty.
pub fn check_required(label: &str, fields: &[FieldSpec], values: &Record) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|f| f.needs_value_on_create())
        .filter(|f| values.get(&f.name).map_or(true, |v| v.is_null()))
        .map(|f| f.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::MissingRequiredFields {
            entity: label.to_string(),
            fields: missing.join(", "),
        })
    }
}
