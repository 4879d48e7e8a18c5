//! Custom data: custom groups, custom fields and their value tables.
//!
//! A custom group extends one entity and owns a value table named
//! `civicrm_value_<group>_<id>`. Each custom field adds a column to that
//! table. Values are keyed by `entity_id` and surface on the extended entity
//! as `Group.field`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use super::table_entity::record_id;
use super::{Describable, Entity, EntityInfo, EntityPermissions, Mutable, Queryable, TableEntity};
use crate::database::Database;
use crate::error::{ApiError, Result};
use crate::table::{Condition, FieldSpec, Operator, Query, Record};
use crate::types::{json_type_name, DataType};

pub const CUSTOM_GROUP_TABLE: &str = "civicrm_custom_group";
pub const CUSTOM_FIELD_TABLE: &str = "civicrm_custom_field";
pub const VALUE_TABLE_PREFIX: &str = "civicrm_value_";

/// Custom field resolved against its value table.
#[derive(Debug, Clone)]
pub(crate) struct CustomFieldRef {
    /// Spec as seen on the extended entity (`Group.field`)
    pub spec: FieldSpec,
    /// Value table holding the data
    pub table: String,
    /// Column in the value table
    pub column: String,
}

pub(crate) fn is_custom_name(name: &str) -> bool {
    name.contains('.')
}

/// Splits values into core fields and `Group.field` custom fields.
pub(crate) fn split_values(values: Record) -> (Record, Record) {
    let mut core = Record::new();
    let mut custom = Record::new();
    for (key, value) in values {
        if is_custom_name(&key) {
            custom.insert(key, value);
        } else {
            core.insert(key, value);
        }
    }
    (core, custom)
}

/// Lists active custom fields extending `entity`.
pub(crate) fn custom_fields(db: &Database, entity: &str) -> Result<Vec<CustomFieldRef>> {
    let (Ok(groups), Ok(fields)) = (
        db.get_table(CUSTOM_GROUP_TABLE),
        db.get_table(CUSTOM_FIELD_TABLE),
    ) else {
        return Ok(Vec::new());
    };
    let groups = groups.snapshot();
    let fields = fields.snapshot();

    let mut refs = Vec::new();
    for group in groups
        .values()
        .filter(|g| str_of(g, "extends") == Some(entity) && is_active(g))
    {
        let (Some(group_id), Some(group_name), Some(table)) = (
            group.get("id").and_then(Value::as_i64),
            str_of(group, "name"),
            str_of(group, "table_name"),
        ) else {
            continue;
        };

        for field in fields.values().filter(|f| {
            f.get("custom_group_id").and_then(Value::as_i64) == Some(group_id) && is_active(f)
        }) {
            let (Some(field_id), Some(name), Some(column)) = (
                field.get("id").and_then(Value::as_i64),
                str_of(field, "name"),
                str_of(field, "column_name"),
            ) else {
                continue;
            };
            let data_type = match str_of(field, "data_type").unwrap_or("String").parse() {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(field = name, error = %e, "skipping custom field");
                    continue;
                }
            };
            let label = str_of(field, "label").unwrap_or(name);
            refs.push(CustomFieldRef {
                spec: FieldSpec::new(format!("{}.{}", group_name, name), data_type)
                    .title(label)
                    .custom(field_id),
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(refs)
}

/// Resolves and type-checks custom values for `entity`.
pub(crate) fn resolve(db: &Database, entity: &str, values: &Record) -> Result<Vec<CustomFieldRef>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let available = custom_fields(db, entity)?;
    let mut refs = Vec::with_capacity(values.len());
    for (name, value) in values {
        let field = available
            .iter()
            .find(|f| &f.spec.name == name)
            .ok_or_else(|| ApiError::FieldNotFound {
                entity: entity.to_string(),
                field: name.clone(),
            })?;
        if !field.spec.data_type.accepts(value) {
            return Err(ApiError::FieldTypeMismatch {
                entity: entity.to_string(),
                field: name.clone(),
                expected: field.spec.data_type.expected(),
                got: json_type_name(value).to_string(),
            });
        }
        refs.push(field.clone());
    }
    Ok(refs)
}

/// Upserts custom values for one entity record.
pub(crate) fn write_values(
    db: &Database,
    entity_id: i64,
    refs: &[CustomFieldRef],
    values: &Record,
) -> Result<()> {
    let mut per_table: BTreeMap<&str, Record> = BTreeMap::new();
    for field in refs {
        if let Some(value) = values.get(&field.spec.name) {
            per_table
                .entry(field.table.as_str())
                .or_default()
                .insert(field.column.clone(), value.clone());
        }
    }

    for (table_name, mut row) in per_table {
        let table = db.get_table(table_name)?;
        let existing = table.query_records(&Query {
            conditions: vec![entity_condition(entity_id)],
            ..Default::default()
        })?;
        match existing.first().map(record_id).transpose()? {
            Some(row_id) => {
                table.update_record(row_id, row)?;
            }
            None => {
                row.insert("entity_id".into(), Value::from(entity_id));
                table.create_record(row)?;
            }
        }
    }
    Ok(())
}

/// Adds the named custom values to each row, `null` where none is stored.
pub(crate) fn attach_values(
    db: &Database,
    entity: &str,
    rows: &mut [Record],
    names: &[String],
) -> Result<()> {
    let available = custom_fields(db, entity)?;
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let field = available
            .iter()
            .find(|f| &f.spec.name == name)
            .ok_or_else(|| ApiError::FieldNotFound {
                entity: entity.to_string(),
                field: name.clone(),
            })?;
        selected.push(field);
    }

    // entity_id -> value row, per value table
    let mut by_table: HashMap<&str, HashMap<i64, Record>> = HashMap::new();
    for field in &selected {
        if by_table.contains_key(field.table.as_str()) {
            continue;
        }
        let table = db.get_table(&field.table)?;
        let index = table
            .snapshot()
            .values()
            .filter_map(|r| Some((r.get("entity_id")?.as_i64()?, r.clone())))
            .collect();
        by_table.insert(field.table.as_str(), index);
    }

    for row in rows.iter_mut() {
        let id = row.get("id").and_then(Value::as_i64);
        for field in &selected {
            let value = id
                .and_then(|id| by_table.get(field.table.as_str())?.get(&id))
                .and_then(|r| r.get(&field.column).cloned())
                .unwrap_or(Value::Null);
            row.insert(field.spec.name.clone(), value);
        }
    }
    Ok(())
}

/// Deletes every custom value row belonging to an entity record.
pub(crate) fn delete_values(db: &Database, entity: &str, entity_id: i64) -> Result<()> {
    let tables: BTreeSet<String> = custom_fields(db, entity)?
        .into_iter()
        .map(|f| f.table)
        .collect();
    for table_name in tables {
        let Ok(table) = db.get_table(&table_name) else {
            continue;
        };
        let rows = table.query_records(&Query {
            conditions: vec![entity_condition(entity_id)],
            ..Default::default()
        })?;
        for row in rows {
            table.delete_record(record_id(&row)?)?;
        }
    }
    Ok(())
}

fn entity_condition(entity_id: i64) -> Condition {
    Condition::new("entity_id", Operator::Eq, Value::from(entity_id))
}

fn str_of<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn is_active(record: &Record) -> bool {
    record.get("is_active") != Some(&Value::Bool(false))
}

/// "My Favorite Things" -> "my_favorite_things"
pub(crate) fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn create_value_table(db: &Database, table_name: &str, extends: &str) -> Result<()> {
    if db.has_table(table_name) {
        // left behind when the group table was truncated
        tracing::warn!(table = %table_name, "replacing stale custom value table");
        db.drop_table(table_name)?;
    }
    db.create_table(
        table_name,
        vec![
            FieldSpec::id(),
            FieldSpec::new("entity_id", DataType::Integer)
                .required()
                .fk(extends),
        ],
    )?;
    Ok(())
}

macro_rules! delegate_reads {
    ($ty:ty) => {
        impl Describable for $ty {
            fn name(&self) -> &str {
                self.inner.name()
            }

            fn info(&self) -> EntityInfo {
                self.inner.info()
            }

            fn fields(&self, include_custom: bool) -> Result<Vec<FieldSpec>> {
                self.inner.fields(include_custom)
            }

            fn permissions(&self) -> EntityPermissions {
                self.inner.permissions()
            }
        }

        impl Queryable for $ty {
            fn select(&self, query: &Query) -> Result<Vec<Record>> {
                self.inner.select(query)
            }

            fn count(&self, query: &Query) -> Result<usize> {
                self.inner.count(query)
            }
        }

        impl Entity for $ty {
            fn as_queryable(&self) -> Option<&dyn Queryable> {
                Some(self)
            }

            fn as_mutable(&self) -> Option<&dyn Mutable> {
                Some(self)
            }
        }
    };
}

/// Custom group entity; maintains the group's value table.
#[derive(Debug)]
pub struct CustomGroupEntity {
    inner: TableEntity,
}

impl CustomGroupEntity {
    pub fn new(inner: TableEntity) -> Self {
        Self { inner }
    }
}

delegate_reads!(CustomGroupEntity);

impl Mutable for CustomGroupEntity {
    fn insert(&self, values: Record) -> Result<Record> {
        let record = self.inner.insert(values)?;
        let id = record_id(&record)?;
        let name = str_of(&record, "name").unwrap_or_default();
        let extends = str_of(&record, "extends").unwrap_or_default();
        let table_name = format!("{}{}_{}", VALUE_TABLE_PREFIX, slug(name), id);

        let db = self.inner.database();
        let created = create_value_table(db, &table_name, extends);
        self.inner.undo_insert(id, created)?;

        let mut patch = Record::new();
        patch.insert("table_name".into(), Value::String(table_name));
        self.inner.update(id, patch)
    }

    fn update(&self, id: i64, mut values: Record) -> Result<Record> {
        // the value table name is owned by the group
        values.remove("table_name");
        self.inner.update(id, values)
    }

    fn remove(&self, id: i64) -> Result<()> {
        let record = self.inner.read(id)?;
        self.inner.remove(id)?;

        let db = self.inner.database();
        if let Some(table_name) = str_of(&record, "table_name") {
            if db.has_table(table_name) {
                db.drop_table(table_name)?;
            }
        }
        if let Ok(fields) = db.get_table(CUSTOM_FIELD_TABLE) {
            let orphans = fields.query_records(&Query {
                conditions: vec![Condition::new(
                    "custom_group_id",
                    Operator::Eq,
                    Value::from(id),
                )],
                ..Default::default()
            })?;
            for field in orphans {
                fields.delete_record(record_id(&field)?)?;
            }
        }
        Ok(())
    }
}

/// Custom field entity; maintains its column in the group's value table.
#[derive(Debug)]
pub struct CustomFieldEntity {
    inner: TableEntity,
}

impl CustomFieldEntity {
    pub fn new(inner: TableEntity) -> Self {
        Self { inner }
    }

    fn group_table(&self, group_id: i64) -> Result<Option<String>> {
        let groups = self.inner.database().get_table(CUSTOM_GROUP_TABLE)?;
        let group = groups
            .read_record(group_id)
            .ok_or_else(|| ApiError::RecordNotFound {
                entity: "CustomGroup".to_string(),
                id: group_id,
            })?;
        Ok(str_of(&group, "table_name").map(str::to_string))
    }
}

delegate_reads!(CustomFieldEntity);

impl Mutable for CustomFieldEntity {
    fn insert(&self, mut values: Record) -> Result<Record> {
        if let Some(Value::String(data_type)) = values.get("data_type") {
            data_type.parse::<DataType>()?;
        }
        if !values.contains_key("name") {
            if let Some(label) = values.get("label").and_then(Value::as_str) {
                let name = slug(label);
                values.insert("name".into(), Value::String(name));
            }
        }
        let group_table = match values.get("custom_group_id").and_then(Value::as_i64) {
            Some(group_id) => self.group_table(group_id)?,
            None => None,
        };

        let record = self.inner.insert(values)?;
        let id = record_id(&record)?;
        let name = str_of(&record, "name").unwrap_or_default();
        let label = str_of(&record, "label").unwrap_or(name);
        let data_type: DataType = str_of(&record, "data_type").unwrap_or("String").parse()?;
        let column = format!("{}_{}", name, id);

        match group_table {
            Some(table) => {
                let added = self.inner.database().add_field(
                    &table,
                    FieldSpec::new(column.clone(), data_type)
                        .title(label)
                        .custom(id),
                );
                self.inner.undo_insert(id, added)?;
            }
            None => tracing::warn!(field = name, "custom group has no value table"),
        }

        let mut patch = Record::new();
        patch.insert("column_name".into(), Value::String(column));
        self.inner.update(id, patch)
    }

    fn update(&self, id: i64, mut values: Record) -> Result<Record> {
        values.remove("column_name");
        self.inner.update(id, values)
    }

    fn remove(&self, id: i64) -> Result<()> {
        let record = self.inner.read(id)?;
        self.inner.remove(id)?;

        let group_id = record.get("custom_group_id").and_then(Value::as_i64);
        let column = str_of(&record, "column_name");
        if let (Some(group_id), Some(column)) = (group_id, column) {
            match self.group_table(group_id) {
                Ok(Some(table)) => {
                    if let Err(e) = self.inner.database().remove_field(&table, column) {
                        tracing::warn!(error = %e, "custom value column already gone");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "custom field group missing on delete"),
            }
        }
        Ok(())
    }
}
