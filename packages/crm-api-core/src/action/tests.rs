use super::*;
use crate::database::Database;
use crate::entity::{Describable, EntityCatalog, EntitySchema, TableEntity};
use crate::table::FieldSpec;
use crate::types::DataType;
use arc_swap::ArcSwap;

fn granted(permissions: &[&str]) -> Arc<BTreeSet<String>> {
    Arc::new(permissions.iter().map(|p| p.to_string()).collect())
}

fn create_pets_api(permissions: &[&str]) -> Api {
    let schema = EntitySchema::new("Pet", "pets")
        .titles("Pet", "Pets")
        .description("Animals kept at home")
        .edit_permission("edit pets")
        .field(FieldSpec::new("name", DataType::String).required())
        .field(FieldSpec::new("species", DataType::String).default_value(json!("cat")))
        .field(FieldSpec::new("age", DataType::Integer));
    let entity = TableEntity::new(schema, Arc::new(Database::new())).unwrap();
    Api::new(Arc::new(entity), granted(permissions))
}

fn seed(api: &Api) -> Vec<i64> {
    [("Tom", 3), ("Felix", 5), ("Rex", 7)]
        .into_iter()
        .map(|(name, age)| {
            let result = api
                .create(false)
                .add_value("name", name)
                .add_value("age", age)
                .execute()
                .unwrap();
            result.first().unwrap()["id"].as_i64().unwrap()
        })
        .collect()
}

#[test]
fn test_action_kind_parse() {
    assert_eq!("getFields".parse::<ActionKind>().unwrap(), ActionKind::GetFields);
    assert_eq!("GET".parse::<ActionKind>().unwrap(), ActionKind::Get);
    assert!("replace".parse::<ActionKind>().is_err());
    assert!(ActionKind::Delete.is_write());
    assert!(!ActionKind::GetActions.is_write());
}

#[test]
fn test_table_entity_offers_crud_actions() {
    let api = create_pets_api(&[]);
    let result = api.get_actions(false).execute().unwrap();
    let names: Vec<Value> = result.column("name");
    assert_eq!(
        names,
        vec![
            json!("get"),
            json!("create"),
            json!("update"),
            json!("save"),
            json!("delete"),
            json!("getFields"),
            json!("getActions"),
        ]
    );
}

#[test]
fn test_read_only_entity_rejects_writes() {
    let entries = Arc::new(ArcSwap::from_pointee(vec![EntityCatalog::catalog_info()]));
    let api = Api::new(Arc::new(EntityCatalog::new(entries)), granted(&[]));
    assert!(!api.actions().contains(&ActionKind::Create));

    let err = api.create(false).add_value("name", "x").execute().unwrap_err();
    assert_eq!(
        err,
        ApiError::ActionNotFound {
            entity: "Entity".to_string(),
            action: "create".to_string(),
        }
    );

    let result = api.get(false).execute().unwrap();
    assert_eq!(result.column("name"), vec![json!("Entity")]);
}

#[test]
fn test_create_get_delete_round_trip() {
    let api = create_pets_api(&[]);
    let created = api
        .create(false)
        .add_value("name", "Tom")
        .execute()
        .unwrap();
    let record = created.first().unwrap();
    assert_eq!(record["id"], json!(1));
    assert_eq!(record["species"], json!("cat"));

    let fetched = api.get(false).add_where("id", "=", 1).execute().unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched.first().unwrap()["name"], json!("Tom"));

    let deleted = api.delete(false).add_where("id", "=", 1).execute().unwrap();
    assert_eq!(deleted.rows(), &[json!({"id": 1}).as_object().cloned().unwrap()]);

    let fetched = api.get(false).add_where("id", "=", 1).execute().unwrap();
    assert!(fetched.is_empty());
}

#[test]
fn test_create_with_id_is_rejected() {
    let api = create_pets_api(&[]);
    seed(&api);
    let err = api
        .create(false)
        .add_value("id", 2)
        .add_value("name", "Copy")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::IdNotAllowedOnCreate { .. }));
    assert!(err.to_string().contains("id"));

    // A null id is the same as no id
    let created = api
        .create(false)
        .add_value("id", Value::Null)
        .add_value("name", "Fresh")
        .execute()
        .unwrap();
    assert_eq!(created.first().unwrap()["id"], json!(4));
}

#[test]
fn test_create_reports_missing_required_fields() {
    let api = create_pets_api(&[]);
    let err = api.create(false).add_value("age", 2).execute().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mandatory values missing from Pet.create: name"
    );
}

#[test]
fn test_wrong_param_type_names_param_and_type() {
    let api = create_pets_api(&[]);
    let err = api.get(false).set_debug("not a bool").execute().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("debug"), "{}", message);
    assert!(message.contains("type"), "{}", message);
    assert_eq!(
        message,
        "Parameter \"debug\" is of the wrong type. Expected bool, got string"
    );
}

#[test]
fn test_unknown_param_is_rejected() {
    let api = create_pets_api(&[]);
    let err = api.get(false).set_param("values", json!({})).execute().unwrap_err();
    assert!(matches!(err, ApiError::UnknownParam { ref param, .. } if param == "values"));
}

#[test]
fn test_delete_requires_where() {
    let api = create_pets_api(&[]);
    seed(&api);
    let err = api.delete(false).execute().unwrap_err();
    assert!(err.to_string().contains("required"));
    assert_eq!(api.get(false).select_row_count().execute().unwrap().count(), 3);
}

#[test]
fn test_row_count_ignores_pagination() {
    let api = create_pets_api(&[]);
    seed(&api);
    let result = api
        .get(false)
        .select_row_count()
        .set_limit(1)
        .execute()
        .unwrap();
    assert_eq!(result.row_count(), Some(3));
    assert!(result.is_empty());

    let result = api
        .get(false)
        .select(&["name", "row_count"])
        .add_where("age", ">", 4)
        .execute()
        .unwrap();
    assert_eq!(result.count(), 2);
    assert_eq!(result.len(), 2);
}

#[test]
fn test_get_order_limit_offset() {
    let api = create_pets_api(&[]);
    seed(&api);
    let result = api
        .get(false)
        .select(&["name"])
        .add_order_by("age", "DESC")
        .set_limit(2)
        .set_offset(1)
        .execute()
        .unwrap();
    assert_eq!(result.column("name"), vec![json!("Felix"), json!("Tom")]);
}

#[test]
fn test_update_by_where_and_by_id() {
    let api = create_pets_api(&[]);
    let ids = seed(&api);

    let updated = api
        .update(false)
        .add_where("age", ">=", 5)
        .add_value("species", "dog")
        .execute()
        .unwrap();
    assert_eq!(updated.len(), 2);

    let updated = api
        .update(false)
        .add_value("id", ids[0])
        .add_value("age", 4)
        .execute()
        .unwrap();
    assert_eq!(updated.first().unwrap()["age"], json!(4));

    let err = api.update(false).add_value("age", 1).execute().unwrap_err();
    assert!(matches!(err, ApiError::MissingRequiredParam { .. }));

    let dogs = api.get(false).add_where("species", "=", "dog").execute().unwrap();
    assert_eq!(dogs.len(), 2);
}

#[test]
fn test_save_creates_then_updates() {
    let api = create_pets_api(&[]);
    let saved = api.save(false).add_value("name", "Nemo").execute().unwrap();
    let id = saved.first().unwrap()["id"].as_i64().unwrap();

    let saved = api
        .save(false)
        .add_value("id", id)
        .add_value("species", "fish")
        .execute()
        .unwrap();
    assert_eq!(saved.first().unwrap()["name"], json!("Nemo"));
    assert_eq!(saved.first().unwrap()["species"], json!("fish"));
}

#[test]
fn test_permissions_are_checked() {
    let api = create_pets_api(&["access CiviCRM"]);
    assert!(api.get(true).execute().is_ok());

    let err = api.create(true).add_value("name", "Tom").execute().unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized {
            entity: "Pet".to_string(),
            action: "create".to_string(),
            permission: "edit pets".to_string(),
        }
    );
    assert!(api.create(false).add_value("name", "Tom").execute().is_ok());

    let admin = create_pets_api(&[SUPER_PERMISSION]);
    assert!(admin.create(true).add_value("name", "Tom").execute().is_ok());
}

#[test]
fn test_validation_runs_before_permissions() {
    let api = create_pets_api(&[]);
    let err = api.delete(true).execute().unwrap_err();
    assert!(matches!(err, ApiError::MissingRequiredParam { .. }));

    let err = api.get(true).set_debug(1).execute().unwrap_err();
    assert!(matches!(err, ApiError::WrongParamType { .. }));
}

#[test]
fn test_get_fields_and_debug() {
    let api = create_pets_api(&[]);
    let fields = api.get_fields(false).set_include_custom(false).execute().unwrap();
    let by_name = fields.index_by("name");
    assert_eq!(by_name["id"]["data_type"], json!("Integer"));
    assert_eq!(by_name["name"]["required"], json!(true));
    assert_eq!(by_name["species"]["default_value"], json!("cat"));
    assert_eq!(fields.len(), 4);

    let result = api.get(false).set_debug(true).execute().unwrap();
    let debug = result.debug().unwrap();
    assert_eq!(debug["action"], json!("get"));
    assert_eq!(debug["entity"], json!(api.name()));
}

#[test]
fn test_invalid_where_clause() {
    let api = create_pets_api(&[]);
    let err = api
        .get(false)
        .set_param("where", json!([["name", "IN", "Tom"]]))
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidWhereClause(_)));

    let err = api.get(false).add_where("name", "~", "Tom").execute().unwrap_err();
    assert!(matches!(err, ApiError::InvalidOperator(_)));
}

#[test]
fn test_builder_params_are_plain_json() {
    let api = create_pets_api(&[]);
    let get = api
        .get(false)
        .add_where("id", "=", 3)
        .select(&["name"])
        .set_limit(5);
    assert_eq!(
        Value::Object(get.params().clone()),
        json!({
            "check_permissions": false,
            "where": [["id", "=", 3]],
            "select": ["name"],
            "limit": 5,
        })
    );
    assert_eq!(api.entity.name(), "Pet");
}
