//! Database container managing tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ApiError, Result};
use crate::table::{FieldSpec, Table};

/// Database container holding all tables.
#[derive(Debug, Default)]
pub struct Database {
    /// Map of table name to table instance
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    /// Creates a new empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table with the given name and field definitions.
    pub fn create_table(&self, name: &str, fields: Vec<FieldSpec>) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(ApiError::TableAlreadyExists(name.to_string()));
        }
        let table = Arc::new(Table::create(name.to_string(), fields)?);
        tables.insert(name.to_string(), table.clone());
        tracing::debug!(table = name, "table created");
        Ok(table)
    }

    /// Drops a table by name.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write();
        tables.remove(name).ok_or_else(|| ApiError::TableNotFound {
            table: name.to_string(),
        })?;
        tracing::debug!(table = name, "table dropped");
        Ok(())
    }

    /// Drops every table whose name starts with `prefix`.
    ///
    /// # Returns
    /// Names of the dropped tables, sorted.
    pub fn drop_by_prefix(&self, prefix: &str) -> Vec<String> {
        let mut tables = self.tables.write();
        let mut dropped: Vec<String> = tables
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in &dropped {
            tables.remove(name);
        }
        dropped.sort();
        if !dropped.is_empty() {
            tracing::debug!(prefix, count = dropped.len(), "tables dropped by prefix");
        }
        dropped
    }

    /// Gets a table by name.
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Returns true if the table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Removes all rows from a table and restarts its id sequence.
    pub fn truncate(&self, name: &str) -> Result<()> {
        self.get_table(name)?.truncate();
        Ok(())
    }

    /// Adds a field to an existing table.
    pub fn add_field(&self, table: &str, field: FieldSpec) -> Result<()> {
        self.get_table(table)?.add_field(field)
    }

    /// Removes a field from an existing table.
    pub fn remove_field(&self, table: &str, field: &str) -> Result<()> {
        self.get_table(table)?.remove_field(field)
    }

    /// Returns all table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of tables in the database.
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }
}
