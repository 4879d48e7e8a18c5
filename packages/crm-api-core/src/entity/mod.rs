//! Entity capability contract.
//!
//! Every entity implements [`Describable`]. Entities that can be read also
//! expose [`Queryable`], and entities that can be written expose [`Mutable`].
//! The set of actions an entity offers is derived from these capabilities,
//! so callers never need to know the concrete entity type.

pub mod builtin;
mod catalog;
mod custom;
mod schema;
mod table_entity;

pub use catalog::EntityCatalog;
pub use custom::{CustomFieldEntity, CustomGroupEntity, CUSTOM_FIELD_TABLE, CUSTOM_GROUP_TABLE};
pub use schema::{EntityInfo, EntityPermissions, EntitySchema};
pub use table_entity::TableEntity;

use crate::error::Result;
use crate::table::{FieldSpec, Query, Record};

/// Metadata every entity provides.
pub trait Describable: Send + Sync {
    /// Entity name (e.g. "Contact").
    fn name(&self) -> &str;

    /// Descriptive info: name, titles, type and description.
    fn info(&self) -> EntityInfo;

    /// Field definitions, optionally including custom fields.
    fn fields(&self, include_custom: bool) -> Result<Vec<FieldSpec>>;

    /// Permissions required by read and write actions.
    fn permissions(&self) -> EntityPermissions {
        EntityPermissions::default()
    }
}

/// Read access to an entity's records.
pub trait Queryable: Describable {
    /// Returns rows matching the query.
    fn select(&self, query: &Query) -> Result<Vec<Record>>;

    /// Counts rows matching the query conditions.
    fn count(&self, query: &Query) -> Result<usize> {
        let unpaged = Query {
            limit: None,
            offset: None,
            ..query.clone()
        };
        Ok(self.select(&unpaged)?.len())
    }
}

/// Write access to an entity's records.
pub trait Mutable: Queryable {
    /// Inserts a new record and returns it with its assigned `id`.
    fn insert(&self, values: Record) -> Result<Record>;

    /// Updates an existing record and returns the stored result.
    fn update(&self, id: i64, values: Record) -> Result<Record>;

    /// Deletes a record by id.
    fn remove(&self, id: i64) -> Result<()>;
}

/// An entity exposed through the API.
pub trait Entity: Describable {
    fn as_queryable(&self) -> Option<&dyn Queryable> {
        None
    }

    fn as_mutable(&self) -> Option<&dyn Mutable> {
        None
    }
}
