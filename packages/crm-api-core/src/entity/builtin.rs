//! Built-in CRM entities and the static table of entity definitions.

use std::sync::Arc;

use serde_json::json;

use super::{CustomFieldEntity, CustomGroupEntity, Entity, EntitySchema, TableEntity};
use super::{CUSTOM_FIELD_TABLE, CUSTOM_GROUP_TABLE};
use crate::config::Component;
use crate::database::Database;
use crate::error::Result;
use crate::table::FieldSpec;
use crate::types::DataType;

/// Entity definitions shipped with the API, one per definition module.
///
/// Names are definition names, not entity names: `CiviCase` defines the
/// `Case` entity, and `CustomValue` is a helper with no entity of its own.
/// Keep this list sorted when adding definitions.
pub const ENTITY_DEFINITIONS: &[&str] = &[
    "Activity",
    "Address",
    "CaseType",
    "CiviCase",
    "Contact",
    "Contribution",
    "CustomField",
    "CustomGroup",
    "CustomValue",
    "Email",
    "Entity",
    "Event",
    "Group",
    "Membership",
    "Note",
    "OptionGroup",
    "OptionValue",
    "Participant",
    "Tag",
];

/// Schemas of every table-backed built-in entity.
pub fn builtin_schemas() -> Vec<EntitySchema> {
    vec![
        EntitySchema::new("Activity", "civicrm_activity")
            .titles("Activity", "Activities")
            .description("Past or scheduled interactions with contacts")
            .edit_permission("edit all contacts")
            .field(FieldSpec::new("activity_type_id", DataType::Integer).required())
            .field(FieldSpec::new("subject", DataType::String))
            .field(FieldSpec::new("activity_date_time", DataType::Date))
            .field(FieldSpec::new("source_contact_id", DataType::Integer).fk("Contact"))
            .field(FieldSpec::new("status_id", DataType::Integer).default_value(json!(2))),
        EntitySchema::new("Address", "civicrm_address")
            .titles("Address", "Addresses")
            .description("Street and postal addresses of contacts")
            .edit_permission("edit all contacts")
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact"))
            .field(FieldSpec::new("location_type_id", DataType::Integer).default_value(json!(1)))
            .field(FieldSpec::new("street_address", DataType::String))
            .field(FieldSpec::new("city", DataType::String))
            .field(FieldSpec::new("postal_code", DataType::String))
            .field(FieldSpec::new("is_primary", DataType::Boolean).default_value(json!(false))),
        EntitySchema::new("Case", "civicrm_case")
            .titles("Case", "Cases")
            .description("Case files tracking work with a client")
            .component(Component::CiviCase)
            .edit_permission("access all cases and activities")
            .field(FieldSpec::new("case_type_id", DataType::Integer).required().fk("CaseType"))
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact").title("Client"))
            .field(FieldSpec::new("subject", DataType::String))
            .field(FieldSpec::new("status_id", DataType::Integer).default_value(json!(1)))
            .field(FieldSpec::new("start_date", DataType::Date))
            .field(FieldSpec::new("is_deleted", DataType::Boolean).default_value(json!(false))),
        EntitySchema::new("CaseType", "civicrm_case_type")
            .titles("Case Type", "Case Types")
            .description("Templates describing the workflow of a case")
            .component(Component::CiviCase)
            .edit_permission("administer CiviCase")
            .field(FieldSpec::new("name", DataType::String).required())
            .field(FieldSpec::new("title", DataType::String).required())
            .field(FieldSpec::new("description", DataType::Text))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true)))
            .field(FieldSpec::new("weight", DataType::Integer).default_value(json!(1))),
        EntitySchema::new("Contact", "civicrm_contact")
            .titles("Contact", "Contacts")
            .description("Individuals, organizations and households")
            .edit_permission("edit all contacts")
            .field(FieldSpec::new("contact_type", DataType::String).required())
            .field(FieldSpec::new("first_name", DataType::String))
            .field(FieldSpec::new("last_name", DataType::String))
            .field(FieldSpec::new("display_name", DataType::String))
            .field(FieldSpec::new("birth_date", DataType::Date))
            .field(FieldSpec::new("is_deleted", DataType::Boolean).default_value(json!(false))),
        EntitySchema::new("Contribution", "civicrm_contribution")
            .titles("Contribution", "Contributions")
            .description("Financial contributions received from contacts")
            .component(Component::CiviContribute)
            .edit_permission("edit contributions")
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact"))
            .field(FieldSpec::new("financial_type_id", DataType::Integer).required())
            .field(FieldSpec::new("total_amount", DataType::Money).required())
            .field(FieldSpec::new("receive_date", DataType::Date))
            .field(FieldSpec::new("contribution_status_id", DataType::Integer).default_value(json!(1))),
        EntitySchema::new("CustomField", CUSTOM_FIELD_TABLE)
            .titles("Custom Field", "Custom Fields")
            .description("Fields added to an entity through a custom group")
            .field(FieldSpec::new("custom_group_id", DataType::Integer).required().fk("CustomGroup"))
            .field(FieldSpec::new("name", DataType::String))
            .field(FieldSpec::new("label", DataType::String).required())
            .field(FieldSpec::new("data_type", DataType::String).required())
            .field(FieldSpec::new("html_type", DataType::String).default_value(json!("Text")))
            .field(FieldSpec::new("column_name", DataType::String))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("CustomGroup", CUSTOM_GROUP_TABLE)
            .titles("Custom Field Group", "Custom Field Groups")
            .description("Groups of custom fields extending one entity")
            .field(FieldSpec::new("name", DataType::String).required())
            .field(FieldSpec::new("title", DataType::String).required())
            .field(FieldSpec::new("extends", DataType::String).required())
            .field(FieldSpec::new("table_name", DataType::String))
            .field(FieldSpec::new("style", DataType::String).default_value(json!("Inline")))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("Email", "civicrm_email")
            .titles("Email", "Emails")
            .description("Email addresses of contacts")
            .edit_permission("edit all contacts")
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact"))
            .field(FieldSpec::new("email", DataType::String).required())
            .field(FieldSpec::new("is_primary", DataType::Boolean).default_value(json!(false)))
            .field(FieldSpec::new("on_hold", DataType::Boolean).default_value(json!(false))),
        EntitySchema::new("Event", "civicrm_event")
            .titles("Event", "Events")
            .description("Events contacts can register for")
            .component(Component::CiviEvent)
            .edit_permission("edit all events")
            .field(FieldSpec::new("title", DataType::String).required())
            .field(FieldSpec::new("event_type_id", DataType::Integer).required())
            .field(FieldSpec::new("start_date", DataType::Date).required())
            .field(FieldSpec::new("end_date", DataType::Date))
            .field(FieldSpec::new("max_participants", DataType::Integer))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("Group", "civicrm_group")
            .titles("Group", "Groups")
            .description("Static or smart groups of contacts")
            .edit_permission("edit groups")
            .field(FieldSpec::new("name", DataType::String))
            .field(FieldSpec::new("title", DataType::String).required())
            .field(FieldSpec::new("description", DataType::Text))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("Membership", "civicrm_membership")
            .titles("Membership", "Memberships")
            .description("Memberships held by contacts")
            .component(Component::CiviMember)
            .edit_permission("edit memberships")
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact"))
            .field(FieldSpec::new("membership_type_id", DataType::Integer).required())
            .field(FieldSpec::new("join_date", DataType::Date))
            .field(FieldSpec::new("status_id", DataType::Integer).default_value(json!(1))),
        EntitySchema::new("Note", "civicrm_note")
            .titles("Note", "Notes")
            .description("Free-text notes attached to other records")
            .edit_permission("edit all contacts")
            .field(FieldSpec::new("entity_table", DataType::String).required())
            .field(FieldSpec::new("entity_id", DataType::Integer).required())
            .field(FieldSpec::new("subject", DataType::String))
            .field(FieldSpec::new("note", DataType::Text)),
        EntitySchema::new("OptionGroup", "civicrm_option_group")
            .titles("Option Group", "Option Groups")
            .description("Named lists of option values")
            .field(FieldSpec::new("name", DataType::String).required())
            .field(FieldSpec::new("title", DataType::String))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("OptionValue", "civicrm_option_value")
            .titles("Option Value", "Option Values")
            .description("Entries of an option group")
            .field(FieldSpec::new("option_group_id", DataType::Integer).required().fk("OptionGroup"))
            .field(FieldSpec::new("label", DataType::String).required())
            .field(FieldSpec::new("value", DataType::String))
            .field(FieldSpec::new("name", DataType::String))
            .field(FieldSpec::new("weight", DataType::Integer))
            .field(FieldSpec::new("is_active", DataType::Boolean).default_value(json!(true))),
        EntitySchema::new("Participant", "civicrm_participant")
            .titles("Participant", "Participants")
            .description("Registrations of contacts for events")
            .component(Component::CiviEvent)
            .edit_permission("edit event participants")
            .field(FieldSpec::new("contact_id", DataType::Integer).required().fk("Contact"))
            .field(FieldSpec::new("event_id", DataType::Integer).required().fk("Event"))
            .field(FieldSpec::new("status_id", DataType::Integer).default_value(json!(1)))
            .field(FieldSpec::new("role_id", DataType::Integer).default_value(json!(1)))
            .field(FieldSpec::new("register_date", DataType::Date)),
        EntitySchema::new("Tag", "civicrm_tag")
            .titles("Tag", "Tags")
            .description("Labels applied to contacts and other records")
            .field(FieldSpec::new("name", DataType::String).required())
            .field(FieldSpec::new("description", DataType::Text))
            .field(FieldSpec::new("used_for", DataType::String).default_value(json!("civicrm_contact"))),
    ]
}

/// Builds every built-in table-backed entity on `database`.
pub fn builtin_entities(database: &Arc<Database>) -> Result<Vec<Arc<dyn Entity>>> {
    let mut entities: Vec<Arc<dyn Entity>> = Vec::new();
    for schema in builtin_schemas() {
        let name = schema.info.name.clone();
        let entity = TableEntity::new(schema, database.clone())?;
        let entity: Arc<dyn Entity> = match name.as_str() {
            "CustomGroup" => Arc::new(CustomGroupEntity::new(entity)),
            "CustomField" => Arc::new(CustomFieldEntity::new(entity)),
            _ => Arc::new(entity),
        };
        entities.push(entity);
    }
    Ok(entities)
}
