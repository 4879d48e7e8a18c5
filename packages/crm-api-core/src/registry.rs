//! Entity registry with component gating.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::action::Api;
use crate::config::{ApiConfig, Component, ComponentSetup};
use crate::database::Database;
use crate::entity::builtin::{builtin_entities, ENTITY_DEFINITIONS};
use crate::entity::{Entity, EntityCatalog, EntityInfo};
use crate::error::{ApiError, Result};

/// Registry resolving entity names to API handles.
///
/// Entities owned by a disabled component stay registered but cannot be
/// resolved and do not appear in the `Entity` listing.
pub struct EntityRegistry {
    database: Arc<Database>,
    entities: RwLock<BTreeMap<String, Arc<dyn Entity>>>,
    enabled: RwLock<BTreeSet<Component>>,
    granted: Arc<BTreeSet<String>>,
    catalog: Arc<ArcSwap<Vec<EntityInfo>>>,
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.entities.read().keys().collect::<Vec<_>>())
            .field("enabled", &*self.enabled.read())
            .finish()
    }
}

impl EntityRegistry {
    /// Creates an empty registry over a fresh database.
    pub fn new(config: ApiConfig) -> Self {
        Self::with_database(config, Arc::new(Database::new()))
    }

    /// Creates an empty registry over an existing database.
    pub fn with_database(config: ApiConfig, database: Arc<Database>) -> Self {
        Self {
            database,
            entities: RwLock::new(BTreeMap::new()),
            enabled: RwLock::new(config.enabled_components),
            granted: Arc::new(config.granted_permissions),
            catalog: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Creates a registry holding every built-in entity plus `Entity`.
    pub fn with_builtin_entities(config: ApiConfig) -> Result<Self> {
        let registry = Self::new(config);
        for entity in builtin_entities(&registry.database)? {
            registry.register(entity)?;
        }
        registry.register(Arc::new(EntityCatalog::new(registry.catalog.clone())))?;
        tracing::info!(
            entities = registry.entities.read().len(),
            "registry ready"
        );
        Ok(registry)
    }

    /// Registers an entity under its name.
    pub fn register(&self, entity: Arc<dyn Entity>) -> Result<()> {
        {
            let mut entities = self.entities.write();
            let name = entity.name().to_string();
            if entities.contains_key(&name) {
                return Err(ApiError::EntityAlreadyRegistered(name));
            }
            tracing::debug!(entity = %name, "entity registered");
            entities.insert(name, entity);
        }
        self.refresh_catalog();
        Ok(())
    }

    /// Resolves an API handle for an enabled entity.
    pub fn api(&self, name: &str) -> Result<Api> {
        let entity = self
            .entities
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::EntityNotFound {
                entity: name.to_string(),
            })?;
        if !self.is_available(entity.as_ref()) {
            return Err(ApiError::EntityNotFound {
                entity: name.to_string(),
            });
        }
        Ok(Api::new(entity, self.granted.clone()))
    }

    pub fn enable_component(&self, component: Component) {
        if self.enabled.write().insert(component) {
            tracing::info!(%component, "component enabled");
            self.refresh_catalog();
        }
    }

    pub fn disable_component(&self, component: Component) {
        if self.enabled.write().remove(&component) {
            tracing::info!(%component, "component disabled");
            self.refresh_catalog();
        }
    }

    pub fn is_enabled(&self, component: Component) -> bool {
        self.enabled.read().contains(&component)
    }

    /// Applies a component setup step.
    pub fn apply(&self, setup: &ComponentSetup) {
        match setup {
            ComponentSetup::AsConfigured => {}
            ComponentSetup::EnableAll => {
                for component in Component::ALL {
                    self.enable_component(component);
                }
            }
            ComponentSetup::Enable(components) => {
                for component in components {
                    self.enable_component(*component);
                }
            }
        }
    }

    /// Names of all currently resolvable entities, sorted.
    pub fn enabled_entity_names(&self) -> Vec<String> {
        self.catalog.load().iter().map(|info| info.name.clone()).collect()
    }

    /// Names of every registered entity, enabled or not, sorted.
    pub fn registered_entity_names(&self) -> Vec<String> {
        self.entities.read().keys().cloned().collect()
    }

    /// Static table of entity definitions shipped with the API.
    pub fn definitions(&self) -> &'static [&'static str] {
        ENTITY_DEFINITIONS
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    fn is_available(&self, entity: &dyn Entity) -> bool {
        match entity.info().component {
            Some(component) => self.enabled.read().contains(&component),
            None => true,
        }
    }

    fn refresh_catalog(&self) {
        let entries: Vec<EntityInfo> = self
            .entities
            .read()
            .values()
            .filter(|entity| self.is_available(entity.as_ref()))
            .map(|entity| entity.info())
            .collect();
        tracing::debug!(entries = entries.len(), "entity catalog refreshed");
        self.catalog.store(Arc::new(entries));
    }
}
