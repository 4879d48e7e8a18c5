//! Entity info and declarative schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Component;
use crate::table::{FieldSpec, Record};

/// Descriptive entity metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub title: String,
    pub title_plural: String,
    /// Traits of the entity, e.g. `["DAOEntity"]`
    #[serde(rename = "type")]
    pub entity_type: Vec<String>,
    pub description: String,
    /// Backing table, if the entity is table-backed
    pub table_name: Option<String>,
    /// Component owning the entity, if any
    pub component: Option<Component>,
}

impl EntityInfo {
    /// Creates info with titles derived from the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            title_plural: format!("{}s", name),
            entity_type: Vec::new(),
            description: String::new(),
            table_name: None,
            component: None,
            name,
        }
    }

    /// Info as an API record.
    pub fn to_record(&self) -> Record {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Record::new(),
        }
    }
}

/// Permissions checked when an action runs with permission checks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPermissions {
    /// Required by get
    pub view: String,
    /// Required by create, update, save and delete
    pub edit: String,
}

impl Default for EntityPermissions {
    fn default() -> Self {
        Self {
            view: "access CiviCRM".to_string(),
            edit: "administer CiviCRM".to_string(),
        }
    }
}

/// Declarative description of a table-backed entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub info: EntityInfo,
    /// Backing table name
    pub table: String,
    pub fields: Vec<FieldSpec>,
    pub permissions: EntityPermissions,
}

impl EntitySchema {
    /// Starts a schema with only the `id` field.
    pub fn new(name: &str, table: &str) -> Self {
        let mut info = EntityInfo::new(name);
        info.entity_type = vec!["DAOEntity".to_string()];
        info.table_name = Some(table.to_string());
        Self {
            info,
            table: table.to_string(),
            fields: vec![FieldSpec::id()],
            permissions: EntityPermissions::default(),
        }
    }

    pub fn titles(mut self, title: &str, title_plural: &str) -> Self {
        self.info.title = title.to_string();
        self.info.title_plural = title_plural.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.info.description = description.to_string();
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.info.component = Some(component);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn edit_permission(mut self, permission: &str) -> Self {
        self.permissions.edit = permission.to_string();
        self
    }
}
