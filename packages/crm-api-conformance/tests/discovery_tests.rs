//! Discovery against a live registry.

use std::sync::Arc;

use crm_api_conformance::{
    check_entities_provider, discover_live, discover_static, DriftError, StaticEntityList,
};
use crm_api_core::entity::{EntitySchema, TableEntity};
use crm_api_core::{ApiConfig, ComponentSetup, EntityRegistry};

fn registry() -> EntityRegistry {
    EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap()
}

#[test]
fn test_live_and_static_lists_agree() {
    let registry = registry();
    let live = discover_live(&registry, &ComponentSetup::EnableAll).unwrap();
    let lotech = discover_static(&StaticEntityList::default(), registry.definitions());
    assert_eq!(live, lotech);
    assert!(live.contains_key("Case"));
    assert!(!live.contains_key("CustomValue"));
    assert_eq!(live["Contact"], vec!["Contact".to_string()]);
}

#[test]
fn test_live_list_follows_components() {
    let registry = registry();
    let live = discover_live(&registry, &ComponentSetup::AsConfigured).unwrap();
    assert!(!live.contains_key("Case"));
    assert!(!live.contains_key("CaseType"));

    let err = check_entities_provider(&registry, &StaticEntityList::default(), &ComponentSetup::AsConfigured)
        .unwrap_err();
    assert_eq!(
        err,
        DriftError::Mismatch {
            missing: Vec::new(),
            extra: vec!["Case".to_string(), "CaseType".to_string()],
        }
    );
    assert!(err.to_string().starts_with(
        "The static list of entities does not match the live list. You probably need to update the static entity list."
    ));
}

#[test]
fn test_unlisted_entity_is_reported() {
    let registry = registry();
    let schema = EntitySchema::new("Widget", "civicrm_widget").description("Things");
    let widget = TableEntity::new(schema, registry.database().clone()).unwrap();
    registry.register(Arc::new(widget)).unwrap();

    let err = check_entities_provider(&registry, &StaticEntityList::default(), &ComponentSetup::EnableAll)
        .unwrap_err();
    assert_eq!(
        err,
        DriftError::Mismatch {
            missing: vec!["Widget".to_string()],
            extra: Vec::new(),
        }
    );

    let list = StaticEntityList {
        add: vec!["Widget".to_string()],
        ..Default::default()
    };
    assert!(check_entities_provider(&registry, &list, &ComponentSetup::EnableAll).is_ok());
}
