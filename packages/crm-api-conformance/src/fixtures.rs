//! Baseline data for a suite run.

use serde_json::{json, Value};

use crm_api_core::{ApiError, EntityRegistry, Record};

/// Data sets that can be loaded before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSet {
    /// Two case types
    CaseType,
    /// `MyFavoriteThings` custom group on Contact with one field
    ConformanceTest,
}

/// Fixture configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConfig {
    /// Tables whose names start with this prefix are dropped
    pub drop_table_prefix: Option<String>,
    /// Tables emptied before loading data sets
    pub truncate_tables: Vec<String>,
    /// Remove option values added during the run
    pub option_cleanup: bool,
    /// Data sets loaded in order
    pub data_sets: Vec<DataSet>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            drop_table_prefix: Some("civicrm_value_myfavorite".to_string()),
            truncate_tables: [
                "civicrm_case_type",
                "civicrm_custom_group",
                "civicrm_custom_field",
                "civicrm_group",
                "civicrm_event",
                "civicrm_participant",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            option_cleanup: true,
            data_sets: vec![DataSet::CaseType, DataSet::ConformanceTest],
        }
    }
}

/// State captured by [`set_up`] and consumed by [`tear_down`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    /// Highest option value id present before the run
    pub max_option_value_id: Option<i64>,
}

/// Resets tables and loads data sets.
pub fn set_up(registry: &EntityRegistry, config: &FixtureConfig) -> Result<Baseline, ApiError> {
    let database = registry.database();
    if let Some(prefix) = &config.drop_table_prefix {
        let dropped = database.drop_by_prefix(prefix);
        if !dropped.is_empty() {
            tracing::info!(?dropped, "dropped custom value tables");
        }
    }
    for table in &config.truncate_tables {
        database.truncate(table)?;
    }

    let mut baseline = Baseline::default();
    if config.option_cleanup {
        baseline.max_option_value_id = max_option_value_id(registry)?;
    }
    for data_set in &config.data_sets {
        load_data_set(registry, *data_set)?;
    }
    tracing::debug!(?baseline, "fixtures ready");
    Ok(baseline)
}

/// Removes option values added since [`set_up`].
pub fn tear_down(registry: &EntityRegistry, config: &FixtureConfig, baseline: &Baseline) -> Result<(), ApiError> {
    if !config.option_cleanup {
        return Ok(());
    }
    let option_value = registry.api("OptionValue")?;
    let mut delete = option_value.delete(false);
    delete = match baseline.max_option_value_id {
        Some(max) => delete.add_where("id", ">", max),
        None => delete.add_where("id", "IS NOT NULL", Value::Null),
    };
    let removed = delete.execute()?;
    if !removed.is_empty() {
        tracing::info!(removed = removed.len(), "option values cleaned up");
    }
    Ok(())
}

pub fn load_data_set(registry: &EntityRegistry, data_set: DataSet) -> Result<(), ApiError> {
    match data_set {
        DataSet::CaseType => {
            let case_type = registry.api("CaseType")?;
            for (name, title) in [
                ("housing_support", "Housing Support"),
                ("adult_day_care_referral", "Adult Day Care Referral"),
            ] {
                case_type
                    .create(false)
                    .add_value("name", name)
                    .add_value("title", title)
                    .execute()?;
            }
        }
        DataSet::ConformanceTest => {
            let group = registry
                .api("CustomGroup")?
                .create(false)
                .set_values(record(json!({
                    "name": "MyFavoriteThings",
                    "title": "My Favorite Things",
                    "extends": "Contact",
                })))
                .execute()?;
            let group_id = group.first().and_then(|g| g.get("id")).cloned().unwrap_or(Value::Null);
            registry
                .api("CustomField")?
                .create(false)
                .set_values(record(json!({
                    "custom_group_id": group_id,
                    "label": "Favorite Color",
                    "name": "color",
                    "data_type": "String",
                })))
                .execute()?;
        }
    }
    tracing::debug!(?data_set, "data set loaded");
    Ok(())
}

fn max_option_value_id(registry: &EntityRegistry) -> Result<Option<i64>, ApiError> {
    let newest = registry
        .api("OptionValue")?
        .get(false)
        .select(&["id"])
        .add_order_by("id", "DESC")
        .set_limit(1)
        .execute()?;
    Ok(newest.first().and_then(|r| r.get("id")).and_then(Value::as_i64))
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
