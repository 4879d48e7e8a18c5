//! Field definition within an entity schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;
use crate::types::DataType;

/// Field definition within an entity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Display title
    pub title: String,
    /// Data type of stored values
    pub data_type: DataType,
    /// Whether create must supply a value (unless a default exists)
    pub required: bool,
    /// Value stored when create omits the field
    pub default_value: Option<Value>,
    /// Entity referenced by this field's value
    pub fk_entity: Option<String>,
    /// Id of the custom field backing this spec, if it is custom data
    pub custom_field_id: Option<i64>,
}

impl FieldSpec {
    /// Creates an optional field with a title derived from its name.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            title: title_from_name(&name),
            name,
            data_type,
            required: false,
            default_value: None,
            fk_entity: None,
            custom_field_id: None,
        }
    }

    /// The auto-assigned primary key field.
    pub fn id() -> Self {
        Self::new("id", DataType::Integer).title("ID")
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Marks the field as a foreign key to `entity`.
    pub fn fk(mut self, entity: impl Into<String>) -> Self {
        self.fk_entity = Some(entity.into());
        self
    }

    pub fn custom(mut self, custom_field_id: i64) -> Self {
        self.custom_field_id = Some(custom_field_id);
        self
    }

    pub fn is_custom(&self) -> bool {
        self.custom_field_id.is_some()
    }

    /// Whether create must be handed a value for this field.
    pub fn needs_value_on_create(&self) -> bool {
        self.required && self.default_value.is_none() && self.name != "id"
    }

    /// Field metadata as an API record.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("name".into(), Value::String(self.name.clone()));
        record.insert("title".into(), Value::String(self.title.clone()));
        record.insert(
            "data_type".into(),
            Value::String(self.data_type.as_str().to_string()),
        );
        record.insert("required".into(), Value::Bool(self.required));
        record.insert(
            "default_value".into(),
            self.default_value.clone().unwrap_or(Value::Null),
        );
        record.insert(
            "fk_entity".into(),
            self.fk_entity.clone().map(Value::String).unwrap_or(Value::Null),
        );
        record.insert(
            "custom_field_id".into(),
            self.custom_field_id.map(Value::from).unwrap_or(Value::Null),
        );
        record
    }
}

/// "contact_type" -> "Contact Type"
fn title_from_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
