//! Entity backed by a single database table plus optional custom data.

use std::sync::Arc;

use serde_json::Value;

use super::custom;
use super::{Describable, Entity, EntityInfo, EntityPermissions, EntitySchema, Mutable, Queryable};
use crate::database::Database;
use crate::error::{ApiError, Result};
use crate::table::validation::validate_values;
use crate::table::{check_required, FieldSpec, Query, Record, Table};

/// Entity backed by a database table.
///
/// Custom fields are addressed as `Group.field`; their values live in the
/// custom group's value table and are joined on request.
#[derive(Debug)]
pub struct TableEntity {
    schema: EntitySchema,
    database: Arc<Database>,
}

impl TableEntity {
    /// Creates the backing table and returns the entity.
    pub fn new(schema: EntitySchema, database: Arc<Database>) -> Result<Self> {
        database.create_table(&schema.table, schema.fields.clone())?;
        Ok(Self { schema, database })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn table(&self) -> Result<Arc<Table>> {
        self.database.get_table(&self.schema.table)
    }

    /// Reads a single record by id.
    pub fn read(&self, id: i64) -> Result<Record> {
        self.table()?
            .read_record(id)
            .ok_or_else(|| ApiError::RecordNotFound {
                entity: self.schema.info.name.clone(),
                id,
            })
    }
}

impl Describable for TableEntity {
    fn name(&self) -> &str {
        &self.schema.info.name
    }

    fn info(&self) -> EntityInfo {
        self.schema.info.clone()
    }

    fn fields(&self, include_custom: bool) -> Result<Vec<FieldSpec>> {
        let mut fields = self.table()?.fields();
        if include_custom {
            fields.extend(
                custom::custom_fields(&self.database, self.name())?
                    .into_iter()
                    .map(|f| f.spec),
            );
        }
        Ok(fields)
    }

    fn permissions(&self) -> EntityPermissions {
        self.schema.permissions.clone()
    }
}

impl Queryable for TableEntity {
    fn select(&self, query: &Query) -> Result<Vec<Record>> {
        let (core_select, custom_select): (Vec<String>, Vec<String>) = query
            .select
            .iter()
            .cloned()
            .partition(|name| !custom::is_custom_name(name));

        let core_query = Query {
            select: core_select,
            ..query.clone()
        };
        let mut rows = self.table()?.query_records(&core_query)?;

        // Only custom fields selected: keep just id before attaching them
        if core_query.select.is_empty() && !custom_select.is_empty() {
            for row in rows.iter_mut() {
                row.retain(|key, _| key == "id");
            }
        }
        if !custom_select.is_empty() {
            custom::attach_values(&self.database, self.name(), &mut rows, &custom_select)?;
        }
        Ok(rows)
    }

    fn count(&self, query: &Query) -> Result<usize> {
        self.table()?.count_records(query)
    }
}

impl Mutable for TableEntity {
    fn insert(&self, values: Record) -> Result<Record> {
        let (core, custom_values) = custom::split_values(values);
        let table = self.table()?;
        let fields = table.fields();
        validate_values(self.name(), &fields, &core)?;
        check_required(self.name(), &fields, &core)?;
        let custom_refs = custom::resolve(&self.database, self.name(), &custom_values)?;

        let mut record = table.create_record(core)?;
        let id = record_id(&record)?;
        let written = custom::write_values(&self.database, id, &custom_refs, &custom_values);
        self.undo_insert(id, written)?;
        record.extend(custom_values);
        Ok(record)
    }

    fn update(&self, id: i64, values: Record) -> Result<Record> {
        let (core, custom_values) = custom::split_values(values);
        let table = self.table()?;
        validate_values(self.name(), &table.fields(), &core)?;
        let custom_refs = custom::resolve(&self.database, self.name(), &custom_values)?;

        let mut record = if core.is_empty() {
            self.read(id)?
        } else {
            table.update_record(id, core)?
        };
        custom::write_values(&self.database, id, &custom_refs, &custom_values)?;
        record.extend(custom_values);
        Ok(record)
    }

    fn remove(&self, id: i64) -> Result<()> {
        self.table()?.delete_record(id)?;
        custom::delete_values(&self.database, self.name(), id)
    }
}

impl TableEntity {
    /// Removes a just-inserted record when a follow-up write failed.
    pub(crate) fn undo_insert<T>(&self, id: i64, result: Result<T>) -> Result<T> {
        if result.is_err() {
            if let Err(e) = self.remove(id) {
                tracing::warn!(entity = self.name(), id, error = %e, "could not undo insert");
            }
        }
        result
    }
}

impl Entity for TableEntity {
    fn as_queryable(&self) -> Option<&dyn Queryable> {
        Some(self)
    }

    fn as_mutable(&self) -> Option<&dyn Mutable> {
        Some(self)
    }
}

/// Extracts the integer `id` of a stored record.
pub(crate) fn record_id(record: &Record) -> Result<i64> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::FieldNotFound {
            entity: "record".to_string(),
            field: "id".to_string(),
        })
}
