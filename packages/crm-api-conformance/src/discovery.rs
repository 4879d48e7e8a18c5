//! Entity discovery: the live registry listing and the static entity list.
//!
//! The static list is what drives the suite. The live listing is only used
//! to detect when the static list has fallen out of date.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crm_api_core::{ApiError, ComponentSetup, EntityRegistry};

use crate::error::DriftError;

/// Test cases keyed by entity name; each case carries its arguments.
pub type DataProvider = BTreeMap<String, Vec<String>>;

/// Sorts names and maps each one to a single-argument case.
pub fn to_data_provider<I, S>(names: I) -> DataProvider
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.into();
            (name.clone(), vec![name])
        })
        .collect()
}

/// Manual adjustments applied to the registration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntityList {
    /// Entities with no definition of their own
    pub add: Vec<String>,
    /// Definitions that are not entities
    pub remove: Vec<String>,
    /// Definition name to entity name
    pub rename: BTreeMap<String, String>,
}

impl Default for StaticEntityList {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            remove: vec!["CustomValue".to_string()],
            rename: [("CiviCase".to_string(), "Case".to_string())]
                .into_iter()
                .collect(),
        }
    }
}

impl StaticEntityList {
    /// Entity names derived from definition names.
    pub fn entity_names(&self, definitions: &[&str]) -> BTreeSet<String> {
        let remove: BTreeSet<&str> = self.remove.iter().map(String::as_str).collect();
        definitions
            .iter()
            .map(|name| self.rename.get(*name).cloned().unwrap_or_else(|| name.to_string()))
            .chain(self.add.iter().cloned())
            .filter(|name| !remove.contains(name.as_str()))
            .collect()
    }
}

/// Builds the data provider from the static registration table.
pub fn discover_static(list: &StaticEntityList, definitions: &[&str]) -> DataProvider {
    to_data_provider(list.entity_names(definitions))
}

/// Builds the data provider from the live registry.
///
/// `setup` is applied first so entities of optional components show up.
pub fn discover_live(registry: &EntityRegistry, setup: &ComponentSetup) -> Result<DataProvider, ApiError> {
    registry.apply(setup);
    let names = registry
        .api("Entity")?
        .get(false)
        .select(&["name"])
        .execute()?
        .column("name")
        .into_iter()
        .filter_map(|name| match name {
            Value::String(s) => Some(s),
            _ => None,
        });
    Ok(to_data_provider(names))
}

/// Fails when the static list and the live listing disagree.
pub fn check_entities_provider(
    registry: &EntityRegistry,
    list: &StaticEntityList,
    setup: &ComponentSetup,
) -> Result<(), DriftError> {
    let live = discover_live(registry, setup)?;
    let lotech = discover_static(list, registry.definitions());
    if live == lotech {
        return Ok(());
    }

    let missing: Vec<String> = live.keys().filter(|k| !lotech.contains_key(*k)).cloned().collect();
    let extra: Vec<String> = lotech.keys().filter(|k| !live.contains_key(*k)).cloned().collect();
    tracing::warn!(?missing, ?extra, "entity list drift");
    Err(DriftError::Mismatch { missing, extra })
}
