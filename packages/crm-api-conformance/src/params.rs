//! Creation parameters for arbitrary entities.
//!
//! Values are derived from each entity's field list through the API, so the
//! provider works for any entity without knowing its concrete type.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crm_api_core::types::DataType;
use crm_api_core::{EntityRegistry, Record};

use crate::error::ParamProviderError;

/// Depth of foreign-key chains followed before giving up.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Produces values for every required field of an entity.
///
/// Foreign keys are satisfied by creating the referenced record through the
/// API. Those records are left in place.
#[derive(Debug)]
pub struct CreationParamProvider<'a> {
    registry: &'a EntityRegistry,
    overrides: BTreeMap<String, Record>,
    max_depth: usize,
}

impl<'a> CreationParamProvider<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        Self {
            registry,
            overrides: BTreeMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
        .with_override("Contact", "contact_type", json!("Individual"))
        .with_override("CustomGroup", "extends", json!("Contact"))
        .with_override("CustomField", "data_type", json!("String"))
        .with_override("Note", "entity_table", json!("civicrm_contact"))
    }

    /// Uses `value` for `entity.field` instead of a generated one.
    pub fn with_override(mut self, entity: &str, field: &str, value: Value) -> Self {
        self.overrides
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string(), value);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Values for every required field of `entity` that has no default.
    pub fn required(&self, entity: &str) -> Result<Record, ParamProviderError> {
        self.required_at(entity, 0)
    }

    fn required_at(&self, entity: &str, depth: usize) -> Result<Record, ParamProviderError> {
        if depth > self.max_depth {
            return Err(ParamProviderError::TooDeep {
                entity: entity.to_string(),
                max_depth: self.max_depth,
            });
        }

        let fields = self
            .registry
            .api(entity)?
            .get_fields(false)
            .set_include_custom(false)
            .execute()?;

        let mut values = Record::new();
        for field in &fields {
            let Some(name) = field.get("name").and_then(Value::as_str) else {
                continue;
            };
            let required = field.get("required").and_then(Value::as_bool).unwrap_or(false);
            let has_default = field.get("default_value").is_some_and(|v| !v.is_null());
            if name == "id" || !required || has_default {
                continue;
            }

            let value = if let Some(value) = self.override_for(entity, name) {
                value.clone()
            } else if let Some(fk) = field.get("fk_entity").and_then(Value::as_str) {
                Value::from(self.create_referenced(fk, depth + 1)?)
            } else {
                let data_type = field.get("data_type").and_then(Value::as_str).unwrap_or("");
                sample_value(entity, name, data_type)?
            };
            values.insert(name.to_string(), value);
        }
        tracing::debug!(entity, fields = values.len(), "creation values ready");
        Ok(values)
    }

    fn create_referenced(&self, entity: &str, depth: usize) -> Result<i64, ParamProviderError> {
        let values = self.required_at(entity, depth)?;
        let created = self
            .registry
            .api(entity)?
            .create(false)
            .set_values(values)
            .execute()?;
        let id = created
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| ParamProviderError::MissingId {
                entity: entity.to_string(),
            })?;
        tracing::debug!(entity, id, "created referenced record");
        Ok(id)
    }

    fn override_for(&self, entity: &str, field: &str) -> Option<&Value> {
        self.overrides.get(entity)?.get(field)
    }
}

fn sample_value(entity: &str, field: &str, data_type: &str) -> Result<Value, ParamProviderError> {
    let unsupported = || ParamProviderError::UnsupportedField {
        entity: entity.to_string(),
        field: field.to_string(),
        data_type: data_type.to_string(),
    };
    let value = match data_type.parse::<DataType>().map_err(|_| unsupported())? {
        DataType::Integer => json!(1),
        DataType::String | DataType::Text => json!(format!("{} {}", entity, field)),
        DataType::Boolean => json!(true),
        DataType::Float => json!(1.5),
        DataType::Money => json!(10.0),
        DataType::Date => json!("2020-01-01"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_api_core::ApiConfig;

    fn registry() -> EntityRegistry {
        EntityRegistry::with_builtin_entities(ApiConfig::all_components()).unwrap()
    }

    #[test]
    fn test_plain_entity() {
        let registry = registry();
        let values = CreationParamProvider::new(&registry).required("Tag").unwrap();
        assert_eq!(Value::Object(values), json!({"name": "Tag name"}));
    }

    #[test]
    fn test_overrides_apply() {
        let registry = registry();
        let provider = CreationParamProvider::new(&registry);
        let values = provider.required("Contact").unwrap();
        assert_eq!(values["contact_type"], json!("Individual"));

        let provider = provider.with_override("Contact", "contact_type", json!("Household"));
        assert_eq!(provider.required("Contact").unwrap()["contact_type"], json!("Household"));
    }

    #[test]
    fn test_foreign_keys_create_referenced_records() {
        let registry = registry();
        let values = CreationParamProvider::new(&registry).required("Participant").unwrap();
        let contact_id = values["contact_id"].as_i64().unwrap();
        let event_id = values["event_id"].as_i64().unwrap();

        let contact = registry
            .api("Contact")
            .unwrap()
            .get(false)
            .add_where("id", "=", contact_id)
            .execute()
            .unwrap();
        assert_eq!(contact.len(), 1);
        let event = registry
            .api("Event")
            .unwrap()
            .get(false)
            .add_where("id", "=", event_id)
            .execute()
            .unwrap();
        assert_eq!(event.first().unwrap()["start_date"], json!("2020-01-01"));
    }

    #[test]
    fn test_custom_field_gets_a_group() {
        let registry = registry();
        let values = CreationParamProvider::new(&registry).required("CustomField").unwrap();
        assert_eq!(values["data_type"], json!("String"));
        let created = registry
            .api("CustomField")
            .unwrap()
            .create(false)
            .set_values(values)
            .execute()
            .unwrap();
        assert!(created.first().unwrap()["column_name"].is_string());
    }

    #[test]
    fn test_depth_limit() {
        let registry = registry();
        let err = CreationParamProvider::new(&registry)
            .with_max_depth(0)
            .required("Address")
            .unwrap_err();
        assert_eq!(
            err,
            ParamProviderError::TooDeep {
                entity: "Contact".to_string(),
                max_depth: 0,
            }
        );
    }

    #[test]
    fn test_disabled_entity() {
        let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
        let err = CreationParamProvider::new(&registry).required("Case").unwrap_err();
        assert!(matches!(err, ParamProviderError::Api(_)));
    }
}
