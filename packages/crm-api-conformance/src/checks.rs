//! Per-entity conformance checks.
//!
//! Each check either passes or returns the [`ConformanceFailure`] of its
//! step. Checks stop at the first failure; later steps depend on the record
//! created in the creation step.

use serde_json::{json, Value};

use crm_api_core::{Api, ApiError, ApiResult, EntityRegistry};

use crate::error::ConformanceFailure;
use crate::params::CreationParamProvider;
use crate::report::{Outcome, Step};

/// Actions an entity needs for the lifecycle checks.
pub const CRUD_ACTIONS: [&str; 4] = ["get", "create", "update", "delete"];

type CheckResult<T> = Result<T, ConformanceFailure>;

/// Runs every check against one entity.
pub fn check_conformance(
    registry: &EntityRegistry,
    provider: &CreationParamProvider<'_>,
    entity: &str,
) -> Outcome {
    match run_checks(registry, provider, entity) {
        Ok(None) => Outcome::Complete,
        Ok(Some(reason)) => Outcome::Skipped { reason },
        Err(failure) => Outcome::Failed {
            step: failure.step,
            message: failure.message,
        },
    }
}

/// Returns the skip reason for non-CRUD entities.
fn run_checks(
    registry: &EntityRegistry,
    provider: &CreationParamProvider<'_>,
    entity: &str,
) -> CheckResult<Option<String>> {
    let api = registry.api(entity).map_err(|e| api_failure(Step::Info, e))?;

    check_entity_info(&api)?;
    let actions = check_actions(&api)?;
    if let Some(missing) = CRUD_ACTIONS.iter().find(|a| !actions.iter().any(|n| n == *a)) {
        tracing::debug!(entity, missing, "not a CRUD entity");
        return Ok(Some(format!(
            "The API \"{}\" does not implement CRUD actions",
            entity
        )));
    }

    check_fields(&api)?;
    let id = check_creation(&api, provider)?;
    check_get(&api, id)?;
    check_get_count(&api, id)?;
    check_update_fails_from_create(&api, id)?;
    check_wrong_param_type(&api)?;
    check_delete_with_no_id(&api)?;
    check_deletion(&api, id)?;
    check_post_delete(&api, id)?;
    Ok(None)
}

/// Info fields must all be non-empty.
pub fn check_entity_info(api: &Api) -> CheckResult<()> {
    let info = api.info();
    let checks = [
        ("name", info.name.is_empty()),
        ("title", info.title.is_empty()),
        ("title_plural", info.title_plural.is_empty()),
        ("type", info.entity_type.is_empty()),
        ("description", info.description.is_empty()),
    ];
    for (key, empty) in checks {
        ensure(!empty, Step::Info, || {
            format!("{} info is missing \"{}\"", api.name(), key)
        })?;
    }
    Ok(())
}

/// Returns the names of the entity's actions.
pub fn check_actions(api: &Api) -> CheckResult<Vec<String>> {
    let actions = api
        .get_actions(false)
        .execute()
        .map_err(|e| api_failure(Step::Actions, e))?;
    let names: Vec<String> = actions.index_by("name").into_keys().collect();
    ensure(!names.is_empty(), Step::Actions, || {
        format!("{} has no actions", api.name())
    })?;
    Ok(names)
}

/// Core fields exclude custom fields and include an Integer `id`.
pub fn check_fields(api: &Api) -> CheckResult<()> {
    let fields = api
        .get_fields(false)
        .set_include_custom(false)
        .execute()
        .map_err(|e| api_failure(Step::Fields, e))?;

    if let Some(custom) = fields
        .iter()
        .find(|f| f.get("custom_field_id").is_some_and(|v| !v.is_null()))
    {
        return Err(ConformanceFailure::new(
            Step::Fields,
            format!(
                "{} returned custom field {} with include_custom off",
                api.name(),
                custom.get("name").unwrap_or(&Value::Null)
            ),
        ));
    }

    let by_name = fields.index_by("name");
    let data_type = by_name
        .get("id")
        .and_then(|id| id.get("data_type"))
        .filter(|t| !t.is_null())
        .ok_or_else(|| {
            ConformanceFailure::new(
                Step::Fields,
                format!("{} is missing required ID field", api.name()),
            )
        })?;
    ensure(data_type == "Integer", Step::Fields, || {
        format!(
            "{} ID field has data type {}, expected \"Integer\"",
            api.name(),
            data_type
        )
    })
}

/// Creates a record from provider values and returns its id.
pub fn check_creation(api: &Api, provider: &CreationParamProvider<'_>) -> CheckResult<i64> {
    let values = provider
        .required(api.name())
        .map_err(|e| ConformanceFailure::new(Step::Creation, e.to_string()))?;
    let created = api
        .create(false)
        .set_values(values)
        .execute()
        .map_err(|e| api_failure(Step::Creation, e))?;

    let id = created
        .first()
        .and_then(|row| row.get("id"))
        .ok_or_else(|| ConformanceFailure::new(Step::Creation, "create missing ID"))?;
    match id.as_i64() {
        Some(id) if id >= 1 => Ok(id),
        _ => Err(ConformanceFailure::new(
            Step::Creation,
            format!("{} ID not positive", api.name()),
        )),
    }
}

pub fn check_get(api: &Api, id: i64) -> CheckResult<()> {
    let result = get_by_id(api, id, Step::Get)?;
    let fetched = result.first().and_then(|row| row.get("id")).and_then(Value::as_i64);
    ensure(fetched == Some(id) && result.count() == 1, Step::Get, || {
        format!("Failed to fetch a {} after creation", api.name())
    })
}

pub fn check_get_count(api: &Api, id: i64) -> CheckResult<()> {
    let message = || format!("{} getCount failed", api.name());
    let one = api
        .get(false)
        .add_where("id", "=", id)
        .select_row_count()
        .execute()
        .map_err(|e| api_failure(Step::GetCount, e))?;
    ensure(one.count() == 1, Step::GetCount, message)?;

    let all = api
        .get(false)
        .select_row_count()
        .execute()
        .map_err(|e| api_failure(Step::GetCount, e))?;
    ensure(all.count() >= 1, Step::GetCount, message)
}

/// Passing an id to create must fail.
pub fn check_update_fails_from_create(api: &Api, id: i64) -> CheckResult<()> {
    let result = api.create(false).add_value("id", id).execute();
    expect_api_error(Step::UpdateRejection, result, &["id"])
}

/// A non-boolean `debug` option must fail.
pub fn check_wrong_param_type(api: &Api) -> CheckResult<()> {
    let result = api.get(true).set_debug("not a bool").execute();
    expect_api_error(Step::WrongParamType, result, &["debug", "type"])
}

/// Delete without a where clause must fail.
pub fn check_delete_with_no_id(api: &Api) -> CheckResult<()> {
    let result = api.delete(true).execute();
    expect_api_error(Step::DeleteWithoutId, result, &["required"])
}

/// Delete by id must return exactly the deleted id.
pub fn check_deletion(api: &Api, id: i64) -> CheckResult<()> {
    let deleted = api
        .delete(false)
        .add_where("id", "=", id)
        .execute()
        .map_err(|e| api_failure(Step::Deletion, e))?;
    let expected = json!([{ "id": id }]);
    let actual = Value::Array(deleted.into_rows().into_iter().map(Value::Object).collect());
    ensure(actual == expected, Step::Deletion, || {
        format!("delete returned {}, expected {}", actual, expected)
    })
}

pub fn check_post_delete(api: &Api, id: i64) -> CheckResult<()> {
    let result = get_by_id(api, id, Step::PostDelete)?;
    ensure(result.is_empty(), Step::PostDelete, || {
        format!("Entity \"{}\" was not deleted", api.name())
    })
}

fn get_by_id(api: &Api, id: i64, step: Step) -> CheckResult<ApiResult> {
    api.get(false)
        .add_where("id", "=", id)
        .execute()
        .map_err(|e| api_failure(step, e))
}

/// The call must fail with a message containing every word.
fn expect_api_error(step: Step, result: Result<ApiResult, ApiError>, words: &[&str]) -> CheckResult<()> {
    let message = match result {
        Ok(_) => {
            return Err(ConformanceFailure::new(
                step,
                "expected an API error, none was raised",
            ))
        }
        Err(e) => e.to_string(),
    };
    for word in words {
        ensure(message.contains(word), step, || {
            format!("API error \"{}\" does not mention \"{}\"", message, word)
        })?;
    }
    Ok(())
}

fn ensure(condition: bool, step: Step, message: impl FnOnce() -> String) -> CheckResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ConformanceFailure::new(step, message()))
    }
}

fn api_failure(step: Step, error: ApiError) -> ConformanceFailure {
    ConformanceFailure::new(step, format!("API error: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_where_error_expected() {
        let result = Ok(ApiResult::new("Widget", "get", Vec::new()));
        let failure = expect_api_error(Step::WrongParamType, result, &["debug", "type"]).unwrap_err();
        assert_eq!(
            failure,
            ConformanceFailure::new(Step::WrongParamType, "expected an API error, none was raised")
        );
    }

    #[test]
    fn test_error_without_expected_words() {
        let result = Err(ApiError::InvalidOperator("~".to_string()));
        let failure = expect_api_error(Step::WrongParamType, result, &["debug", "type"]).unwrap_err();
        assert_eq!(failure.step, Step::WrongParamType);
        assert_eq!(
            failure.message,
            "API error \"Invalid operator '~'\" does not mention \"debug\""
        );
    }

    #[test]
    fn test_error_with_expected_words() {
        let result = Err(ApiError::InvalidOperator("debug type".to_string()));
        assert!(expect_api_error(Step::WrongParamType, result, &["debug", "type"]).is_ok());
    }
}
