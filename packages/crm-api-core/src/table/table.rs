//! Table schema and record storage.
//!
//! Each table has:
//! - A schema of field definitions (mutable for custom value tables)
//! - A copy-on-write snapshot of its rows for lock-free reads
//! - A record ID sequence generator

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::field::FieldSpec;
use super::validation;
use super::Record;
use crate::error::{ApiError, Result};

/// Rows keyed by record id.
pub type Rows = BTreeMap<i64, Record>;

/// Table schema and record storage.
#[derive(Debug)]
pub struct Table {
    /// Table name (e.g. "civicrm_contact")
    pub name: String,
    /// Field definitions in declaration order
    fields: RwLock<Vec<FieldSpec>>,
    /// Current row snapshot, swapped atomically on write
    rows: ArcSwap<Rows>,
    /// Serializes writers so no update is lost between load and store
    write_lock: Mutex<()>,
    /// Next record ID to assign
    next_id: AtomicI64,
}

impl Table {
    /// Creates a new empty table.
    ///
    /// The schema must declare a unique `id` field of type `Integer`.
    pub fn create(name: String, fields: Vec<FieldSpec>) -> Result<Self> {
        validation::validate_schema(&name, &fields)?;

        Ok(Self {
            name,
            fields: RwLock::new(fields),
            rows: ArcSwap::from_pointee(Rows::new()),
            write_lock: Mutex::new(()),
            next_id: AtomicI64::new(1), // Start IDs at 1
        })
    }

    /// Returns a copy of the field definitions.
    pub fn fields(&self) -> Vec<FieldSpec> {
        self.fields.read().clone()
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<FieldSpec> {
        self.fields.read().iter().find(|f| f.name == name).cloned()
    }

    /// Adds a field to the schema. Existing rows read it as `null`.
    pub fn add_field(&self, field: FieldSpec) -> Result<()> {
        let mut fields = self.fields.write();
        if fields.iter().any(|f| f.name == field.name) {
            return Err(ApiError::FieldAlreadyExists {
                entity: self.name.clone(),
                field: field.name,
            });
        }
        fields.push(field);
        Ok(())
    }

    /// Removes a field from the schema and strips it from stored rows.
    pub fn remove_field(&self, name: &str) -> Result<()> {
        if name == "id" {
            return Err(ApiError::InvalidValue {
                entity: self.name.clone(),
                field: name.to_string(),
                message: "the id field cannot be removed".to_string(),
            });
        }
        {
            let mut fields = self.fields.write();
            let before = fields.len();
            fields.retain(|f| f.name != name);
            if fields.len() == before {
                return Err(ApiError::FieldNotFound {
                    entity: self.name.clone(),
                    field: name.to_string(),
                });
            }
        }
        self.write(|rows| {
            for record in rows.values_mut() {
                record.remove(name);
            }
            Ok(())
        })
    }

    /// Atomically increments and returns the next record ID.
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the current next ID value without incrementing.
    pub fn current_next_id(&self) -> i64 {
        self.next_id.load(Ordering::Acquire)
    }

    /// Returns the number of stored records.
    pub fn record_count(&self) -> usize {
        self.rows.load().len()
    }

    /// Returns the current row snapshot.
    pub fn snapshot(&self) -> Arc<Rows> {
        self.rows.load_full()
    }

    /// Inserts a record and returns it with its assigned id.
    ///
    /// Values are checked against the schema; omitted fields take their
    /// default or `null`.
    pub fn create_record(&self, values: Record) -> Result<Record> {
        let fields = self.fields();
        validation::validate_values(&self.name, &fields, &values)?;

        let id = self.next_id();
        let mut record = Record::new();
        for field in &fields {
            let value = match values.get(&field.name) {
                Some(v) => v.clone(),
                None => field.default_value.clone().unwrap_or(Value::Null),
            };
            record.insert(field.name.clone(), value);
        }
        record.insert("id".into(), Value::from(id));

        let stored = record.clone();
        self.write(move |rows| {
            rows.insert(id, stored);
            Ok(())
        })?;
        tracing::debug!(table = %self.name, id, "record created");
        Ok(record)
    }

    /// Reads a record by id.
    pub fn read_record(&self, id: i64) -> Option<Record> {
        self.rows.load().get(&id).cloned()
    }

    /// Merges `values` into an existing record and returns the result.
    pub fn update_record(&self, id: i64, values: Record) -> Result<Record> {
        let fields = self.fields();
        validation::validate_values(&self.name, &fields, &values)?;

        let mut updated = None;
        self.write(|rows| {
            let record = rows.get_mut(&id).ok_or_else(|| ApiError::RecordNotFound {
                entity: self.name.clone(),
                id,
            })?;
            for (key, value) in values {
                if key != "id" {
                    record.insert(key, value);
                }
            }
            updated = Some(record.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| ApiError::RecordNotFound {
            entity: self.name.clone(),
            id,
        })
    }

    /// Deletes a record by id.
    pub fn delete_record(&self, id: i64) -> Result<()> {
        self.write(|rows| {
            rows.remove(&id)
                .map(|_| ())
                .ok_or_else(|| ApiError::RecordNotFound {
                    entity: self.name.clone(),
                    id,
                })
        })?;
        tracing::debug!(table = %self.name, id, "record deleted");
        Ok(())
    }

    /// Removes every record and restarts the id sequence.
    pub fn truncate(&self) {
        let _guard = self.write_lock.lock();
        self.rows.store(Arc::new(Rows::new()));
        self.next_id.store(1, Ordering::SeqCst);
    }

    /// Applies a mutation to a private copy of the rows and publishes it.
    fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Rows) -> Result<()>,
    {
        let _guard = self.write_lock.lock();
        let mut rows = Rows::clone(&self.rows.load());
        f(&mut rows)?;
        self.rows.store(Arc::new(rows));
        Ok(())
    }
}
