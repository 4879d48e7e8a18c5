//! Custom groups, custom fields and their values.

use serde_json::{json, Value};

use crm_api_core::table::FieldSpec;
use crm_api_core::types::DataType;
use crm_api_core::{ApiError, EntityRegistry};

use super::helpers::{api, create_contact, full_registry, id_of};

/// Creates the `MyFavoriteThings` group on Contact with a `color` field.
fn create_favorites(registry: &EntityRegistry) -> (i64, i64) {
    let group = api(registry, "CustomGroup")
        .create(false)
        .add_value("name", "MyFavoriteThings")
        .add_value("title", "My Favorite Things")
        .add_value("extends", "Contact")
        .execute()
        .unwrap();
    let group_id = id_of(&group);
    assert_eq!(
        group.first().unwrap()["table_name"],
        json!(format!("civicrm_value_myfavoritethings_{}", group_id))
    );

    let field = api(registry, "CustomField")
        .create(false)
        .add_value("custom_group_id", group_id)
        .add_value("label", "Color")
        .add_value("data_type", "String")
        .execute()
        .unwrap();
    let field_id = id_of(&field);
    assert_eq!(field.first().unwrap()["name"], json!("color"));
    assert_eq!(
        field.first().unwrap()["column_name"],
        json!(format!("color_{}", field_id))
    );
    (group_id, field_id)
}

#[test]
fn test_custom_fields_are_listed_on_request() {
    let registry = full_registry();
    let (_, field_id) = create_favorites(&registry);
    let contact = api(&registry, "Contact");

    let core = contact
        .get_fields(false)
        .set_include_custom(false)
        .execute()
        .unwrap();
    assert!(core.column("custom_field_id").iter().all(Value::is_null));

    let all = contact.get_fields(false).execute().unwrap().index_by("name");
    let color = &all["MyFavoriteThings.color"];
    assert_eq!(color["custom_field_id"], json!(field_id));
    assert_eq!(color["title"], json!("Color"));
    assert_eq!(color["data_type"], json!("String"));
}

#[test]
fn test_custom_values_round_trip() {
    let registry = full_registry();
    create_favorites(&registry);
    let contact = api(&registry, "Contact");

    let created = contact
        .create(false)
        .add_value("contact_type", "Individual")
        .add_value("first_name", "Maria")
        .add_value("MyFavoriteThings.color", "green")
        .execute()
        .unwrap();
    let id = id_of(&created);
    let other = create_contact(&registry, "Georg");

    let rows = contact
        .get(false)
        .select(&["first_name", "MyFavoriteThings.color"])
        .add_order_by("id", "ASC")
        .execute()
        .unwrap();
    assert_eq!(rows.column("MyFavoriteThings.color"), vec![json!("green"), Value::Null]);

    contact
        .update(false)
        .add_where("id", "=", other)
        .add_value("MyFavoriteThings.color", "blue")
        .execute()
        .unwrap();
    let georg = contact
        .get(false)
        .add_where("id", "=", other)
        .select(&["MyFavoriteThings.color"])
        .execute()
        .unwrap();
    assert_eq!(georg.first().unwrap()["MyFavoriteThings.color"], json!("blue"));
    assert!(georg.first().unwrap().get("first_name").is_none());

    contact.delete(false).add_where("id", "=", id).execute().unwrap();
    let err = contact
        .create(false)
        .add_value("contact_type", "Individual")
        .add_value("MyFavoriteThings.color", 7)
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::FieldTypeMismatch { .. }));
}

#[test]
fn test_removing_custom_data() {
    let registry = full_registry();
    let (group_id, field_id) = create_favorites(&registry);
    let table_name = format!("civicrm_value_myfavoritethings_{}", group_id);
    assert!(registry.database().has_table(&table_name));

    api(&registry, "CustomField")
        .delete(false)
        .add_where("id", "=", field_id)
        .execute()
        .unwrap();
    let fields = api(&registry, "Contact").get_fields(false).execute().unwrap();
    assert!(!fields.column("name").contains(&json!("MyFavoriteThings.color")));

    api(&registry, "CustomGroup")
        .delete(false)
        .add_where("id", "=", group_id)
        .execute()
        .unwrap();
    assert!(!registry.database().has_table(&table_name));
}

#[test]
fn test_custom_field_needs_existing_group() {
    let registry = full_registry();
    let err = api(&registry, "CustomField")
        .create(false)
        .add_value("custom_group_id", 99)
        .add_value("label", "Orphan")
        .add_value("data_type", "String")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound { id: 99, .. }));

    let (group_id, _) = create_favorites(&registry);
    let err = api(&registry, "CustomField")
        .create(false)
        .add_value("custom_group_id", group_id)
        .add_value("label", "Mood")
        .add_value("data_type", "Feeling")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidValue { .. }));
}

#[test]
fn test_failed_custom_write_leaves_no_record() {
    let registry = full_registry();
    let (group_id, _) = create_favorites(&registry);
    let table_name = format!("civicrm_value_myfavoritethings_{}", group_id);
    registry.database().drop_table(&table_name).unwrap();

    let contact = api(&registry, "Contact");
    let err = contact
        .create(false)
        .add_value("contact_type", "Individual")
        .add_value("MyFavoriteThings.color", "blue")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::TableNotFound { .. }), "{}", err);

    let count = contact.get(false).select_row_count().execute().unwrap().count();
    assert_eq!(count, 0);
}

#[test]
fn test_failed_column_add_leaves_no_custom_field() {
    let registry = full_registry();
    let (group_id, field_id) = create_favorites(&registry);
    let table_name = format!("civicrm_value_myfavoritethings_{}", group_id);
    let next_column = format!("size_{}", field_id + 1);
    registry
        .database()
        .add_field(&table_name, FieldSpec::new(next_column, DataType::String))
        .unwrap();

    let custom_field = api(&registry, "CustomField");
    let err = custom_field
        .create(false)
        .add_value("custom_group_id", group_id)
        .add_value("label", "Size")
        .add_value("data_type", "String")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::FieldAlreadyExists { .. }), "{}", err);

    let ids = custom_field.get(false).execute().unwrap().column("id");
    assert_eq!(ids, vec![json!(field_id)]);
}
