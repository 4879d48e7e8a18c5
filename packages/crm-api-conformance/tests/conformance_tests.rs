//! Full conformance suite against the built-in entities.

use ntest::timeout;

use crm_api_conformance::{
    ConformanceConfig, ConformanceRunner, Outcome, Step, SuiteReport,
};
use crm_api_core::{ApiConfig, EntityRegistry};

fn run_suite(registry: &EntityRegistry) -> SuiteReport {
    ConformanceRunner::new(registry, ConformanceConfig::default())
        .run()
        .unwrap()
}

#[test]
#[timeout(30000)]
fn test_every_builtin_entity_conforms() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
    let report = run_suite(&registry);

    let failures: Vec<String> = report
        .failures()
        .map(|r| format!("{}: {}", r.entity, r.outcome))
        .collect();
    assert!(failures.is_empty(), "conformance failures:\n{}", failures.join("\n"));
    assert_eq!(report.drift, None);
    assert!(report.is_success());

    assert_eq!(report.entities.len(), 18);
    assert_eq!(report.skipped(), 1);
    assert_eq!(
        report.outcome("Entity"),
        Some(&Outcome::Skipped {
            reason: "The API \"Entity\" does not implement CRUD actions".to_string(),
        })
    );
    for entity in ["Case", "Contact", "CustomField", "CustomGroup", "Participant"] {
        assert_eq!(report.outcome(entity), Some(&Outcome::Complete), "{}", entity);
    }
}

#[test]
#[timeout(30000)]
fn test_suite_can_run_twice() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
    assert!(run_suite(&registry).is_success());
    assert!(run_suite(&registry).is_success());
}

#[test]
fn test_selected_entities_only() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
    let config = ConformanceConfig {
        entities: vec!["Tag".to_string(), "Email".to_string()],
        ..Default::default()
    };
    let report = ConformanceRunner::new(&registry, config).run().unwrap();
    let names: Vec<_> = report.entities.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(names, vec!["Email", "Tag"]);
    assert_eq!(report.completed(), 2);
}

#[test]
fn test_unknown_entity_is_reported() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
    let config = ConformanceConfig {
        entities: vec!["Contcat".to_string(), "Tag".to_string()],
        ..Default::default()
    };
    let report = ConformanceRunner::new(&registry, config).run().unwrap();

    assert!(!report.is_success());
    assert_eq!(report.completed(), 1);
    assert_eq!(
        report.outcome("Contcat"),
        Some(&Outcome::Failed {
            step: Step::Info,
            message: "\"Contcat\" is not on the static entity list".to_string(),
        })
    );
    assert_eq!(report.outcome("Tag"), Some(&Outcome::Complete));
}

#[test]
fn test_disabled_component_fails_at_info() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::default()).unwrap();
    let config = ConformanceConfig {
        components: crm_api_core::ComponentSetup::AsConfigured,
        entities: vec!["Case".to_string()],
        check_drift: false,
        fixtures: crm_api_conformance::FixtureConfig {
            data_sets: Vec::new(),
            ..Default::default()
        },
        ..Default::default()
    };
    let report = ConformanceRunner::new(&registry, config).run().unwrap();
    match report.outcome("Case") {
        Some(Outcome::Failed { step, message }) => {
            assert_eq!(*step, Step::Info);
            assert!(message.contains("'Case' not found"), "{}", message);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_single_entity_leaves_no_record() {
    let registry = EntityRegistry::with_builtin_entities(ApiConfig::all_components()).unwrap();
    let runner = ConformanceRunner::new(&registry, ConformanceConfig::default());
    assert_eq!(runner.run_entity("Membership"), Outcome::Complete);

    let memberships = registry
        .api("Membership")
        .unwrap()
        .get(false)
        .select_row_count()
        .execute()
        .unwrap();
    assert_eq!(memberships.count(), 0);
}
