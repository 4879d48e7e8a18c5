//! Shared setup for integration tests.

use crm_api_core::{Api, ApiConfig, EntityRegistry};

/// Registry with every component enabled.
pub fn full_registry() -> EntityRegistry {
    EntityRegistry::with_builtin_entities(ApiConfig::all_components()).unwrap()
}

/// Creates an individual and returns its id.
pub fn create_contact(registry: &EntityRegistry, first_name: &str) -> i64 {
    let result = registry
        .api("Contact")
        .unwrap()
        .create(false)
        .add_value("contact_type", "Individual")
        .add_value("first_name", first_name)
        .execute()
        .unwrap();
    id_of(&result)
}

/// Id of the first row of a result.
pub fn id_of(result: &crm_api_core::ApiResult) -> i64 {
    result.first().unwrap()["id"].as_i64().unwrap()
}

pub fn api(registry: &EntityRegistry, name: &str) -> Api {
    registry.api(name).unwrap()
}
