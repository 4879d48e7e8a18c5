//! The `Entity` entity: a read-only listing of the entities currently exposed.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{Describable, Entity, EntityInfo, EntityPermissions, Queryable};
use crate::error::Result;
use crate::table::{check_query_fields, run_query, FieldSpec, Query, Record};
use crate::types::DataType;

/// Read-only entity listing every enabled entity, itself included.
///
/// The registry publishes a new listing whenever registrations or component
/// state change.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entries: Arc<ArcSwap<Vec<EntityInfo>>>,
}

impl EntityCatalog {
    pub const NAME: &'static str = "Entity";

    pub fn new(entries: Arc<ArcSwap<Vec<EntityInfo>>>) -> Self {
        Self { entries }
    }

    /// Info describing the catalog itself.
    pub fn catalog_info() -> EntityInfo {
        let mut info = EntityInfo::new(Self::NAME);
        info.title = "Entity".to_string();
        info.title_plural = "Entities".to_string();
        info.entity_type = vec!["BasicEntity".to_string()];
        info.description = "Entities available through the API".to_string();
        info
    }
}

impl Describable for EntityCatalog {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn info(&self) -> EntityInfo {
        Self::catalog_info()
    }

    fn fields(&self, _include_custom: bool) -> Result<Vec<FieldSpec>> {
        Ok(vec![
            FieldSpec::new("name", DataType::String),
            FieldSpec::new("title", DataType::String),
            FieldSpec::new("title_plural", DataType::String),
            FieldSpec::new("type", DataType::Text),
            FieldSpec::new("description", DataType::Text),
            FieldSpec::new("table_name", DataType::String),
            FieldSpec::new("component", DataType::String),
        ])
    }

    fn permissions(&self) -> EntityPermissions {
        EntityPermissions {
            view: "access CiviCRM".to_string(),
            edit: "administer CiviCRM".to_string(),
        }
    }
}

impl Queryable for EntityCatalog {
    fn select(&self, query: &Query) -> Result<Vec<Record>> {
        check_query_fields(Self::NAME, &self.fields(false)?, query)?;
        let records: Vec<Record> = self.entries.load().iter().map(EntityInfo::to_record).collect();
        Ok(run_query(&records, query))
    }
}

impl Entity for EntityCatalog {
    fn as_queryable(&self) -> Option<&dyn Queryable> {
        Some(self)
    }
}
