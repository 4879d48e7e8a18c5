//! CRUD through the built-in entities.

use serde_json::json;

use crm_api_core::{ApiConfig, ApiError, EntityRegistry};

use super::helpers::{api, create_contact, full_registry, id_of};

#[test]
fn test_contact_lifecycle() {
    let registry = full_registry();
    let contact = api(&registry, "Contact");

    let id = create_contact(&registry, "Ada");
    assert!(id > 0);

    let fetched = contact.get(false).add_where("id", "=", id).execute().unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched.first().unwrap()["first_name"], json!("Ada"));
    assert_eq!(fetched.first().unwrap()["is_deleted"], json!(false));

    let count = contact
        .get(false)
        .add_where("id", "=", id)
        .select_row_count()
        .execute()
        .unwrap();
    assert_eq!(count.count(), 1);

    let deleted = contact.delete(false).add_where("id", "=", id).execute().unwrap();
    assert_eq!(deleted.column("id"), vec![json!(id)]);

    let fetched = contact.get(false).add_where("id", "=", id).execute().unwrap();
    assert!(fetched.is_empty());
}

#[test]
fn test_related_records() {
    let registry = full_registry();
    let ada = create_contact(&registry, "Ada");
    let grace = create_contact(&registry, "Grace");

    let email = api(&registry, "Email");
    for (contact_id, address) in [(ada, "ada@example.org"), (grace, "grace@example.org"), (ada, "ada@work.example.org")] {
        email
            .create(false)
            .add_value("contact_id", contact_id)
            .add_value("email", address)
            .execute()
            .unwrap();
    }

    let ada_emails = email
        .get(false)
        .add_where("contact_id", "=", ada)
        .add_order_by("email", "ASC")
        .execute()
        .unwrap();
    assert_eq!(
        ada_emails.column("email"),
        vec![json!("ada@example.org"), json!("ada@work.example.org")]
    );

    let work = email
        .get(false)
        .add_where("email", "LIKE", "%@WORK.%")
        .execute()
        .unwrap();
    assert_eq!(work.len(), 1);

    let both = email
        .get(false)
        .add_where("contact_id", "IN", json!([ada, grace]))
        .select_row_count()
        .execute()
        .unwrap();
    assert_eq!(both.count(), 3);
}

#[test]
fn test_event_dates_are_validated() {
    let registry = full_registry();
    let event = api(&registry, "Event");

    let created = event
        .create(false)
        .add_value("title", "Annual Meeting")
        .add_value("event_type_id", 1)
        .add_value("start_date", "2026-03-01 18:00:00")
        .execute()
        .unwrap();
    let event_id = id_of(&created);

    let err = event
        .create(false)
        .add_value("title", "Broken")
        .add_value("event_type_id", 1)
        .add_value("start_date", "next tuesday")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::FieldTypeMismatch { .. }));

    let participant = api(&registry, "Participant")
        .create(false)
        .add_value("contact_id", create_contact(&registry, "Alan"))
        .add_value("event_id", event_id)
        .execute()
        .unwrap();
    assert_eq!(participant.first().unwrap()["status_id"], json!(1));
}

#[test]
fn test_type_mismatch_and_unknown_field() {
    let registry = full_registry();
    let contribution = api(&registry, "Contribution");

    let err = contribution
        .create(false)
        .add_value("contact_id", 1)
        .add_value("financial_type_id", 1)
        .add_value("total_amount", "a lot")
        .execute()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Value for Contribution.total_amount must be a number, got string"
    );

    let err = contribution
        .create(false)
        .add_value("contact_id", 1)
        .add_value("financial_type_id", 1)
        .add_value("total_amount", 10.5)
        .add_value("colour", "red")
        .execute()
        .unwrap_err();
    assert_eq!(err.to_string(), "Field 'colour' not found on 'Contribution'");
}

#[test]
fn test_permissions_follow_config() {
    let registry = EntityRegistry::with_builtin_entities(
        ApiConfig::default().grant("edit all contacts"),
    )
    .unwrap();
    let contact = api(&registry, "Contact");
    assert!(contact
        .create(true)
        .add_value("contact_type", "Organization")
        .execute()
        .is_ok());

    let err = api(&registry, "Tag")
        .create(true)
        .add_value("name", "VIP")
        .execute()
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
}

#[test]
fn test_get_fields_describe_schema() {
    let registry = full_registry();
    let fields = api(&registry, "Participant")
        .get_fields(false)
        .set_include_custom(false)
        .execute()
        .unwrap()
        .index_by("name");
    assert_eq!(fields["id"]["data_type"], json!("Integer"));
    assert_eq!(fields["event_id"]["fk_entity"], json!("Event"));
    assert_eq!(fields["contact_id"]["required"], json!(true));
    assert_eq!(fields["register_date"]["title"], json!("Register Date"));
}
