//! API error types.

use thiserror::Error;

/// Errors raised by the entity API.
///
/// Callers are expected to treat every variant as the same "API exception"
/// and inspect the rendered message when they need to tell failures apart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Entity not registered or its component is disabled
    #[error("API entity '{entity}' not found")]
    EntityNotFound { entity: String },

    /// Component name not recognised
    #[error("Unknown component '{0}'")]
    UnknownComponent(String),

    /// Entity registered twice
    #[error("API entity '{0}' is already registered")]
    EntityAlreadyRegistered(String),

    /// Action not offered by the entity
    #[error("Action '{action}' not found for entity '{entity}'")]
    ActionNotFound { entity: String, action: String },

    /// Field not found on entity or table
    #[error("Field '{field}' not found on '{entity}'")]
    FieldNotFound { entity: String, field: String },

    /// Field declared twice in a schema
    #[error("Field '{field}' already exists on '{entity}'")]
    FieldAlreadyExists { entity: String, field: String },

    /// Parameter not accepted by the action
    #[error("Unknown parameter \"{param}\" for {entity}.{action}")]
    UnknownParam {
        entity: String,
        action: String,
        param: String,
    },

    /// Parameter set with a value of the wrong JSON type
    #[error("Parameter \"{param}\" is of the wrong type. Expected {expected}, got {got}")]
    WrongParamType {
        param: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Parameter the action cannot run without
    #[error("Parameter \"{param}\" is required to {action} {entity}")]
    MissingRequiredParam {
        entity: String,
        action: String,
        param: String,
    },

    /// Create action was handed an existing record id
    #[error("Cannot pass id to {entity}.create; use update or save to modify record {id}")]
    IdNotAllowedOnCreate { entity: String, id: String },

    /// Unsupported where-clause operator
    #[error("Invalid operator '{0}'")]
    InvalidOperator(String),

    /// Where clause that is not a [field, operator, value] triple
    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    /// Field value does not match the field's data type
    #[error("Value for {entity}.{field} must be {expected}, got {got}")]
    FieldTypeMismatch {
        entity: String,
        field: String,
        expected: &'static str,
        got: String,
    },

    /// Required field missing from create values
    #[error("Mandatory values missing from {entity}.create: {fields}")]
    MissingRequiredFields { entity: String, fields: String },

    /// Value rejected by entity-specific rules
    #[error("Invalid value for {entity}.{field}: {message}")]
    InvalidValue {
        entity: String,
        field: String,
        message: String,
    },

    /// Record not found by id
    #[error("{entity} record {id} not found")]
    RecordNotFound { entity: String, id: i64 },

    /// Session lacks the permission an action requires
    #[error("Authorization failed: {action} on {entity} requires permission '{permission}'")]
    Unauthorized {
        entity: String,
        action: String,
        permission: String,
    },

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
