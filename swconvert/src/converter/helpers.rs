//! Transformation steps shared across converters.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::ConvertScope;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::record::Field;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

static CONNECTION_NAME_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-]").expect("connection name pattern is valid"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// `migration_<connection>_<entity>_`, with the connection name reduced to
/// `[A-Za-z0-9-]`.
pub fn custom_field_prefix(connection_name: &str, entity: &str) -> String {
    let connection = CONNECTION_NAME_FILTER.replace_all(connection_name, "");
    format!("migration_{connection}_{entity}_")
}

/// Casts an attribute value to the column type recorded for it.
pub fn cast_attribute(value: &Value, column_type: Option<&str>) -> Value {
    let field = Field::from_option(Some(value));
    match column_type {
        Some("boolean") => Value::Bool(field.as_bool()),
        Some("integer") => field.as_i64().map(Value::from).unwrap_or(Value::Null),
        Some("float") => field.as_f64().map(Value::from).unwrap_or(Value::Null),
        _ => value.clone(),
    }
}

/// Turns legacy attribute columns into `customFields`. Keys listed in
/// `skip` (ids, foreign keys) are ignored; `None` when nothing remains.
pub fn attribute_custom_fields(
    scope: &ConvertScope<'_>,
    entity: &str,
    attributes: &Map<String, Value>,
    skip: &[&str],
) -> Result<Option<Map<String, Value>>> {
    let prefix = custom_field_prefix(&scope.ctx.connection.name, entity);
    let definitions = entities::custom_field_entity(entity);
    let mut custom_fields = Map::new();
    for (key, value) in attributes {
        if skip.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        let column_type = scope
            .get_mapping(&definitions, key)?
            .and_then(|m| m.satellite_data)
            .and_then(|data| {
                data.get("columnType")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        custom_fields.insert(
            format!("{prefix}{key}"),
            cast_attribute(value, column_type.as_deref()),
        );
    }
    Ok((!custom_fields.is_empty()).then_some(custom_fields))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Seconds since midnight as `HH:MM`.
pub fn format_time_of_day(seconds: i64) -> String {
    let seconds = seconds.rem_euclid(86_400);
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

/// Rewrites `id_field` of every object in `items` to its destination id.
///
/// Languages without a mapping keep their id; both systems ship the same
/// default language ids. Any other unmapped reference is logged as missing
/// and left untouched.
pub fn update_association_ids(
    scope: &ConvertScope<'_>,
    items: &mut Value,
    entity: &str,
    id_field: &str,
    required_for: &str,
) -> Result<()> {
    let Some(items) = items.as_array_mut() else {
        return Ok(());
    };
    for item in items.iter_mut() {
        let Some(object) = item.as_object_mut() else {
            continue;
        };
        let Some(old) = Field::from_option(object.get(id_field)).as_id() else {
            continue;
        };
        match scope.get_uuid(entity, &old)? {
            Some(new_id) => {
                object.insert(id_field.to_string(), Value::String(new_id));
            }
            None if entity == entities::LANGUAGE => {}
            None => {
                scope.log(MigrationLog::association_required_missing(
                    required_for,
                    &scope.source_id,
                    entity,
                ))?;
            }
        }
    }
    Ok(())
}

/// Mapped id of a single reference, `None` when it has no mapping.
pub fn map_reference(scope: &ConvertScope<'_>, entity: &str, old: Option<&Value>) -> Result<Option<String>> {
    match Field::from_option(old).as_id() {
        Some(old) => scope.get_uuid(entity, &old),
        None => Ok(None),
    }
}
