//! Suite runner: fixtures, drift check and per-entity checks.

use crm_api_core::{ApiError, ComponentSetup, EntityRegistry};

use crate::checks::check_conformance;
use crate::discovery::{check_entities_provider, discover_static, DataProvider, StaticEntityList};
use crate::fixtures::{self, FixtureConfig};
use crate::params::CreationParamProvider;
use crate::report::{Outcome, Step, SuiteReport};

/// Conformance run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceConfig {
    /// Applied before discovery so optional entities are visible
    pub components: ComponentSetup,
    pub fixtures: FixtureConfig,
    pub static_list: StaticEntityList,
    /// Entities to check; empty checks every entity on the static list
    pub entities: Vec<String>,
    /// Compare the static list with the live registry first
    pub check_drift: bool,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            components: ComponentSetup::EnableAll,
            fixtures: FixtureConfig::default(),
            static_list: StaticEntityList::default(),
            entities: Vec::new(),
            check_drift: true,
        }
    }
}

/// Runs the conformance suite against a registry.
#[derive(Debug)]
pub struct ConformanceRunner<'a> {
    registry: &'a EntityRegistry,
    config: ConformanceConfig,
}

impl<'a> ConformanceRunner<'a> {
    pub fn new(registry: &'a EntityRegistry, config: ConformanceConfig) -> Self {
        Self { registry, config }
    }

    /// Entity cases from the static list, narrowed to the configured entities.
    pub fn data_provider(&self) -> DataProvider {
        let mut provider = discover_static(&self.config.static_list, self.registry.definitions());
        if !self.config.entities.is_empty() {
            provider.retain(|name, _| self.config.entities.contains(name));
        }
        provider
    }

    /// Configured entities missing from the static list.
    pub fn unknown_entities(&self) -> Vec<String> {
        let provider = discover_static(&self.config.static_list, self.registry.definitions());
        let mut unknown: Vec<String> = self
            .config
            .entities
            .iter()
            .filter(|name| !provider.contains_key(*name))
            .cloned()
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }

    /// Runs fixtures, the drift check and every entity check.
    ///
    /// Only fixture errors abort the run. Drift and entity failures are
    /// recorded in the report.
    pub fn run(&self) -> Result<SuiteReport, ApiError> {
        let mut report = SuiteReport::default();
        self.registry.apply(&self.config.components);

        if self.config.check_drift {
            if let Err(e) = check_entities_provider(
                self.registry,
                &self.config.static_list,
                &self.config.components,
            ) {
                tracing::error!(error = %e, "entity discovery drift");
                report.drift = Some(e.to_string());
            }
        }

        let baseline = fixtures::set_up(self.registry, &self.config.fixtures)?;
        for entity in self.unknown_entities() {
            tracing::error!(%entity, "entity is not on the static entity list");
            let message = format!("\"{}\" is not on the static entity list", entity);
            report.push(
                entity,
                Outcome::Failed {
                    step: Step::Info,
                    message,
                },
            );
        }

        let provider = CreationParamProvider::new(self.registry);
        for entity in self.data_provider().into_keys() {
            let outcome = self.run_entity_with(&provider, &entity);
            report.push(entity, outcome);
        }
        fixtures::tear_down(self.registry, &self.config.fixtures, &baseline)?;

        tracing::info!(
            complete = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "conformance run finished"
        );
        Ok(report)
    }

    /// Checks a single entity without fixtures.
    pub fn run_entity(&self, entity: &str) -> Outcome {
        let provider = CreationParamProvider::new(self.registry);
        self.run_entity_with(&provider, entity)
    }

    fn run_entity_with(&self, provider: &CreationParamProvider<'_>, entity: &str) -> Outcome {
        let span = tracing::info_span!("conformance", entity);
        let _enter = span.enter();

        let outcome = check_conformance(self.registry, provider, entity);
        match &outcome {
            Outcome::Complete => tracing::info!("complete"),
            Outcome::Skipped { reason } => tracing::info!(%reason, "skipped"),
            Outcome::Failed { step, message } => tracing::warn!(%step, %message, "failed"),
        }
        outcome
    }
}
