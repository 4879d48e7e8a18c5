//! API handles and action builders.
//!
//! An [`Api`] wraps one entity. Its builders collect JSON parameters and
//! validate them only when `execute()` runs, so a request built from
//! untrusted input fails the same way as one built in code.
//!
//! Validation order is fixed: action availability, parameter types,
//! required parameters, write-value rules, permissions, then the operation.

mod params;
mod result;

pub use params::{param_specs, ParamSpec, ParamType};
pub use result::ApiResult;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::entity::{Entity, EntityInfo, Mutable, Queryable};
use crate::error::{ApiError, Result};
use crate::table::{Condition, Query, Record};

/// Actions an entity can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Get,
    Create,
    Update,
    Save,
    Delete,
    GetFields,
    GetActions,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Get => "get",
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Save => "save",
            ActionKind::Delete => "delete",
            ActionKind::GetFields => "getFields",
            ActionKind::GetActions => "getActions",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::Get => "Get records matching the where clause",
            ActionKind::Create => "Create a new record",
            ActionKind::Update => "Update records matching the where clause",
            ActionKind::Save => "Create or update a record depending on its id",
            ActionKind::Delete => "Delete records matching the where clause",
            ActionKind::GetFields => "List the fields of this entity",
            ActionKind::GetActions => "List the actions of this entity",
        }
    }

    /// Whether the action writes records.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ActionKind::Create | ActionKind::Update | ActionKind::Save | ActionKind::Delete
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            ActionKind::Get,
            ActionKind::Create,
            ActionKind::Update,
            ActionKind::Save,
            ActionKind::Delete,
            ActionKind::GetFields,
            ActionKind::GetActions,
        ]
        .into_iter()
        .find(|a| a.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown action '{}'", s))
    }
}

/// Permission that grants every other permission.
pub const SUPER_PERMISSION: &str = "all CiviCRM permissions and ACLs";

/// Handle to one entity's API.
#[derive(Clone)]
pub struct Api {
    entity: Arc<dyn Entity>,
    granted: Arc<BTreeSet<String>>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("entity", &self.entity.name())
            .finish()
    }
}

impl Api {
    pub fn new(entity: Arc<dyn Entity>, granted: Arc<BTreeSet<String>>) -> Self {
        Self { entity, granted }
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    /// Entity info (name, titles, type, description).
    pub fn info(&self) -> EntityInfo {
        self.entity.info()
    }

    /// Actions derived from the entity's capabilities.
    pub fn actions(&self) -> Vec<ActionKind> {
        let mut actions = Vec::new();
        if self.entity.as_queryable().is_some() {
            actions.push(ActionKind::Get);
        }
        if self.entity.as_mutable().is_some() {
            actions.extend([
                ActionKind::Create,
                ActionKind::Update,
                ActionKind::Save,
                ActionKind::Delete,
            ]);
        }
        actions.extend([ActionKind::GetFields, ActionKind::GetActions]);
        actions
    }

    pub fn get(&self, check_permissions: bool) -> Get {
        Get(ActionCall::new(self.clone(), ActionKind::Get, check_permissions))
    }

    pub fn create(&self, check_permissions: bool) -> Create {
        Create(ActionCall::new(self.clone(), ActionKind::Create, check_permissions))
    }

    pub fn update(&self, check_permissions: bool) -> Update {
        Update(ActionCall::new(self.clone(), ActionKind::Update, check_permissions))
    }

    pub fn save(&self, check_permissions: bool) -> Save {
        Save(ActionCall::new(self.clone(), ActionKind::Save, check_permissions))
    }

    pub fn delete(&self, check_permissions: bool) -> Delete {
        Delete(ActionCall::new(self.clone(), ActionKind::Delete, check_permissions))
    }

    pub fn get_fields(&self, check_permissions: bool) -> GetFields {
        GetFields(ActionCall::new(self.clone(), ActionKind::GetFields, check_permissions))
    }

    pub fn get_actions(&self, check_permissions: bool) -> GetActions {
        GetActions(ActionCall::new(self.clone(), ActionKind::GetActions, check_permissions))
    }

    /// Runs an action with raw JSON parameters.
    pub fn execute(&self, action: ActionKind, params: &Record) -> Result<ApiResult> {
        if !self.actions().contains(&action) {
            return Err(self.action_not_found(action));
        }
        params::validate(self.name(), action, params)?;

        let check_permissions = params::flag(params, "check_permissions", true);
        let debug = params::flag(params, "debug", false);
        tracing::debug!(entity = self.name(), %action, check_permissions, "executing action");

        let result = match action {
            ActionKind::Get => self.run_get(params, check_permissions),
            ActionKind::Create => self.run_create(params, check_permissions),
            ActionKind::Update => self.run_update(params, check_permissions),
            ActionKind::Save => self.run_save(params, check_permissions),
            ActionKind::Delete => self.run_delete(params, check_permissions),
            ActionKind::GetFields => self.run_get_fields(params),
            ActionKind::GetActions => Ok(self.run_get_actions()),
        }?;

        if debug {
            let info = json!({
                "entity": self.name(),
                "action": action.as_str(),
                "params": Value::Object(params.clone()),
                "rows": result.len(),
            });
            return Ok(result.with_debug(info));
        }
        Ok(result)
    }

    fn run_get(&self, params: &Record, check_permissions: bool) -> Result<ApiResult> {
        let (query, row_count) = params::parse_query(params)?;
        self.authorize(ActionKind::Get, check_permissions)?;
        let queryable = self.queryable(ActionKind::Get)?;

        if row_count {
            let count = queryable.count(&query)?;
            let rows = if query.select.is_empty() {
                Vec::new()
            } else {
                queryable.select(&query)?
            };
            return Ok(self.result(ActionKind::Get, rows).with_row_count(count));
        }
        Ok(self.result(ActionKind::Get, queryable.select(&query)?))
    }

    fn run_create(&self, params: &Record, check_permissions: bool) -> Result<ApiResult> {
        let values = params::values(params);
        if let Some(id) = values.get("id").filter(|v| !v.is_null()) {
            return Err(ApiError::IdNotAllowedOnCreate {
                entity: self.name().to_string(),
                id: id.to_string(),
            });
        }
        self.authorize(ActionKind::Create, check_permissions)?;
        let record = self.mutable(ActionKind::Create)?.insert(values)?;
        Ok(self.result(ActionKind::Create, vec![record]))
    }

    fn run_update(&self, params: &Record, check_permissions: bool) -> Result<ApiResult> {
        let mut values = params::values(params);
        let mut conditions = params::parse_where(params)?;
        let id = values.remove("id").and_then(|v| v.as_i64());
        if conditions.is_empty() {
            match id {
                Some(id) => conditions.push(Condition::id(id)),
                None => return Err(self.missing_param(ActionKind::Update, "where")),
            }
        }
        self.authorize(ActionKind::Update, check_permissions)?;

        let mutable = self.mutable(ActionKind::Update)?;
        let ids = self.matching_ids(mutable, conditions)?;
        let rows = ids
            .into_iter()
            .map(|id| mutable.update(id, values.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.result(ActionKind::Update, rows))
    }

    fn run_save(&self, params: &Record, check_permissions: bool) -> Result<ApiResult> {
        let mut values = params::values(params);
        self.authorize(ActionKind::Save, check_permissions)?;
        let mutable = self.mutable(ActionKind::Save)?;

        let record = match values.remove("id").and_then(|v| v.as_i64()) {
            Some(id) => mutable.update(id, values)?,
            None => mutable.insert(values)?,
        };
        Ok(self.result(ActionKind::Save, vec![record]))
    }

    fn run_delete(&self, params: &Record, check_permissions: bool) -> Result<ApiResult> {
        let conditions = params::parse_where(params)?;
        if conditions.is_empty() {
            return Err(self.missing_param(ActionKind::Delete, "where"));
        }
        self.authorize(ActionKind::Delete, check_permissions)?;

        let mutable = self.mutable(ActionKind::Delete)?;
        let ids = self.matching_ids(mutable, conditions)?;
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            mutable.remove(id)?;
            let mut row = Record::new();
            row.insert("id".into(), Value::from(id));
            rows.push(row);
        }
        tracing::debug!(entity = self.name(), deleted = rows.len(), "records deleted");
        Ok(self.result(ActionKind::Delete, rows))
    }

    fn run_get_fields(&self, params: &Record) -> Result<ApiResult> {
        let include_custom = params::flag(params, "include_custom", true);
        let rows = self
            .entity
            .fields(include_custom)?
            .iter()
            .map(|f| f.to_record())
            .collect();
        Ok(self.result(ActionKind::GetFields, rows))
    }

    fn run_get_actions(&self) -> ApiResult {
        let rows = self
            .actions()
            .into_iter()
            .map(|action| {
                let mut row = Record::new();
                row.insert("name".into(), Value::String(action.as_str().to_string()));
                row.insert(
                    "description".into(),
                    Value::String(action.description().to_string()),
                );
                row
            })
            .collect();
        self.result(ActionKind::GetActions, rows)
    }

    fn matching_ids(&self, entity: &dyn Mutable, conditions: Vec<Condition>) -> Result<Vec<i64>> {
        let query = Query {
            conditions,
            select: vec!["id".to_string()],
            ..Default::default()
        };
        Ok(entity
            .select(&query)?
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect())
    }

    fn authorize(&self, action: ActionKind, check_permissions: bool) -> Result<()> {
        if !check_permissions || self.granted.contains(SUPER_PERMISSION) {
            return Ok(());
        }
        let permissions = self.entity.permissions();
        let required = if action.is_write() {
            permissions.edit
        } else {
            permissions.view
        };
        if self.granted.contains(&required) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized {
                entity: self.name().to_string(),
                action: action.as_str().to_string(),
                permission: required,
            })
        }
    }

    fn queryable(&self, action: ActionKind) -> Result<&dyn Queryable> {
        self.entity
            .as_queryable()
            .ok_or_else(|| self.action_not_found(action))
    }

    fn mutable(&self, action: ActionKind) -> Result<&dyn Mutable> {
        self.entity
            .as_mutable()
            .ok_or_else(|| self.action_not_found(action))
    }

    fn result(&self, action: ActionKind, rows: Vec<Record>) -> ApiResult {
        ApiResult::new(self.name(), action.as_str(), rows)
    }

    fn action_not_found(&self, action: ActionKind) -> ApiError {
        ApiError::ActionNotFound {
            entity: self.name().to_string(),
            action: action.as_str().to_string(),
        }
    }

    fn missing_param(&self, action: ActionKind, param: &str) -> ApiError {
        ApiError::MissingRequiredParam {
            entity: self.name().to_string(),
            action: action.as_str().to_string(),
            param: param.to_string(),
        }
    }
}

/// Parameters collected for one action call.
#[derive(Debug, Clone)]
pub struct ActionCall {
    api: Api,
    action: ActionKind,
    params: Record,
}

impl ActionCall {
    fn new(api: Api, action: ActionKind, check_permissions: bool) -> Self {
        let mut params = Record::new();
        params.insert("check_permissions".into(), Value::Bool(check_permissions));
        Self {
            api,
            action,
            params,
        }
    }

    fn set(&mut self, name: &str, value: Value) {
        self.params.insert(name.to_string(), value);
    }

    fn push(&mut self, name: &str, value: Value) {
        match self.params.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            _ => self.set(name, Value::Array(vec![value])),
        }
    }

    fn insert_value(&mut self, field: &str, value: Value) {
        match self.params.get_mut("values") {
            Some(Value::Object(values)) => {
                values.insert(field.to_string(), value);
            }
            _ => {
                let mut values = Record::new();
                values.insert(field.to_string(), value);
                self.set("values", Value::Object(values));
            }
        }
    }
}

macro_rules! action_builder {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(ActionCall);

        impl $name {
            pub fn set_check_permissions(mut self, check_permissions: bool) -> Self {
                self.0.set("check_permissions", Value::Bool(check_permissions));
                self
            }

            /// Sets the `debug` option. Non-boolean values fail on execute.
            pub fn set_debug(mut self, debug: impl Into<Value>) -> Self {
                self.0.set("debug", debug.into());
                self
            }

            /// Sets any parameter by name; checked on execute.
            pub fn set_param(mut self, name: &str, value: impl Into<Value>) -> Self {
                self.0.set(name, value.into());
                self
            }

            pub fn params(&self) -> &Record {
                &self.0.params
            }

            pub fn execute(self) -> Result<ApiResult> {
                self.0.api.execute(self.0.action, &self.0.params)
            }
        }
    };
}

macro_rules! where_clauses {
    ($name:ident) => {
        impl $name {
            /// Adds a `[field, operator, value]` condition.
            pub fn add_where(mut self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
                let value: Value = value.into();
                self.0.push("where", json!([field, operator, value]));
                self
            }
        }
    };
}

macro_rules! write_values {
    ($name:ident) => {
        impl $name {
            pub fn add_value(mut self, field: &str, value: impl Into<Value>) -> Self {
                self.0.insert_value(field, value.into());
                self
            }

            pub fn set_values(mut self, values: Record) -> Self {
                self.0.set("values", Value::Object(values));
                self
            }
        }
    };
}

action_builder!(
    /// Builder for the `get` action.
    Get
);
action_builder!(
    /// Builder for the `create` action.
    Create
);
action_builder!(
    /// Builder for the `update` action.
    Update
);
action_builder!(
    /// Builder for the `save` action.
    Save
);
action_builder!(
    /// Builder for the `delete` action.
    Delete
);
action_builder!(
    /// Builder for the `getFields` action.
    GetFields
);
action_builder!(
    /// Builder for the `getActions` action.
    GetActions
);

where_clauses!(Get);
where_clauses!(Update);
where_clauses!(Delete);
write_values!(Create);
write_values!(Update);
write_values!(Save);

impl Get {
    pub fn select(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.0.push("select", Value::String(field.to_string()));
        }
        self
    }

    /// Requests the number of matching rows instead of the rows.
    pub fn select_row_count(mut self) -> Self {
        self.0.set("select", json!(["row_count"]));
        self
    }

    pub fn add_order_by(mut self, field: &str, direction: &str) -> Self {
        match self.0.params.get_mut("order_by") {
            Some(Value::Object(order)) => {
                order.insert(field.to_string(), Value::String(direction.to_string()));
            }
            _ => {
                let mut order = Record::new();
                order.insert(field.to_string(), Value::String(direction.to_string()));
                self.0.set("order_by", Value::Object(order));
            }
        }
        self
    }

    pub fn set_limit(mut self, limit: usize) -> Self {
        self.0.set("limit", Value::from(limit));
        self
    }

    pub fn set_offset(mut self, offset: usize) -> Self {
        self.0.set("offset", Value::from(offset));
        self
    }
}

impl GetFields {
    pub fn set_include_custom(mut self, include_custom: bool) -> Self {
        self.0.set("include_custom", Value::Bool(include_custom));
        self
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
