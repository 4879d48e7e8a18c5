//! Table schema, field definitions, and record queries.

mod field;
mod query;
#[allow(clippy::module_inception)]
mod table;
pub(crate) mod validation;

pub use field::FieldSpec;
pub use query::{check_query_fields, run_query, Condition, Operator, Query, SortDirection};
pub use table::{Rows, Table};
pub use validation::check_required;

/// A stored or returned record: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;
