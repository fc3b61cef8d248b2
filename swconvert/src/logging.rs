//! Anomaly taxonomy for the migration log.
//!
//! Every anomaly a converter can report is built here so codes and parameter
//! names stay stable. Parameters always carry `sourceId`.

use mstorage::log_store::LogSink;
use mstorage::models::{LogEntry, LogLevel};
use std::collections::BTreeMap;

use crate::context::MigrationContext;
use crate::error::Result;

pub const CODE_PREFIX: &str = "SWAG_MIGRATION";
pub const UNSUPPORTED_OBJECT_TYPE: &str = "SWAG_MIGRATION__SHOPWARE_UNSUPPORTED_OBJECT_TYPE";
pub const INVALID_UNSERIALIZED_DATA: &str = "SWAG_MIGRATION__SHOPWARE_INVALID_UNSERIALIZED_DATA";
pub const INVALID_EMAIL_ADDRESS: &str = "SWAG_MIGRATION__INVALID_EMAIL_ADDRESS";
pub const UNSUPPORTED_SHIPPING_CALCULATION_TYPE: &str =
    "SWAG_MIGRATION_UNSUPPORTED_SHIPPING_CALCULATION_TYPE";
pub const UNSUPPORTED_SHIPPING_PRICE: &str = "SWAG_MIGRATION_UNSUPPORTED_SHIPPING_PRICE";
pub const UNSUPPORTED_DOCUMENT_TYPE: &str = "SWAG_MIGRATION_UNSUPPORTED_DOCUMENT_TYPE";

pub fn empty_necessary_field_code(entity: &str) -> String {
    format!("{CODE_PREFIX}_EMPTY_NECESSARY_FIELD_{}", entity.to_uppercase())
}

pub fn field_reassigned_code(entity: &str) -> String {
    format!("{CODE_PREFIX}_{}_ENTITY_FIELD_REASSIGNED", entity.to_uppercase())
}

pub fn association_missing_code(missing_entity: &str) -> String {
    format!(
        "{CODE_PREFIX}__SHOPWARE_ASSOCIATION_REQUIRED_MISSING_{}",
        missing_entity.to_uppercase()
    )
}

pub fn entity_unknown_code(entity: &str) -> String {
    format!("{CODE_PREFIX}_{}_ENTITY_UNKNOWN", entity.to_uppercase())
}

/// One anomaly, not yet bound to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationLog {
    pub level: LogLevel,
    pub code: String,
    pub entity: String,
    pub source_id: String,
    pub parameters: BTreeMap<String, String>,
}

impl MigrationLog {
    fn new(level: LogLevel, code: String, entity: &str, source_id: &str) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("sourceId".to_string(), source_id.to_string());
        Self {
            level,
            code,
            entity: entity.to_string(),
            source_id: source_id.to_string(),
            parameters,
        }
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// A mandatory field is blank. `source_id` is the offending record or
    /// sub-record (e.g. the address id for `customer_address`).
    pub fn empty_necessary_field(entity: &str, source_id: &str, empty_field: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            empty_necessary_field_code(entity),
            entity,
            source_id,
        )
        .param("emptyField", empty_field)
    }

    pub fn field_reassigned(
        entity: &str,
        source_id: &str,
        empty_field: &str,
        replacement_field: &str,
    ) -> Self {
        Self::new(LogLevel::Info, field_reassigned_code(entity), entity, source_id)
            .param("emptyField", empty_field)
            .param("replacementField", replacement_field)
    }

    /// `required_for` could not be converted because `missing_entity` has no
    /// mapping.
    pub fn association_required_missing(
        required_for: &str,
        source_id: &str,
        missing_entity: &str,
    ) -> Self {
        Self::new(
            LogLevel::Warning,
            association_missing_code(missing_entity),
            required_for,
            source_id,
        )
        .param("missingEntity", missing_entity)
        .param("requiredFor", required_for)
    }

    /// A reference that is not strictly required could not be resolved.
    /// `source_id` is the unresolved reference, not the record holding it.
    pub fn entity_unknown(
        entity: &str,
        source_id: &str,
        required_for_entity: &str,
        required_for_source_id: &str,
    ) -> Self {
        Self::new(LogLevel::Warning, entity_unknown_code(entity), entity, source_id)
            .param("entity", entity)
            .param("requiredForEntity", required_for_entity)
            .param("requiredForSourceId", required_for_source_id)
    }

    pub fn unsupported_object_type(entity: &str, source_id: &str, object_type: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            UNSUPPORTED_OBJECT_TYPE.to_string(),
            entity,
            source_id,
        )
        .param("objectType", object_type)
    }

    pub fn invalid_unserialized_data(entity: &str, source_id: &str, unserialized_entity: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            INVALID_UNSERIALIZED_DATA.to_string(),
            entity,
            source_id,
        )
        .param("unserializedEntity", unserialized_entity)
    }

    pub fn invalid_email(entity: &str, source_id: &str, email: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            INVALID_EMAIL_ADDRESS.to_string(),
            entity,
            source_id,
        )
        .param("email", email)
    }

    pub fn unsupported_shipping_calculation(entity: &str, source_id: &str, kind: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            UNSUPPORTED_SHIPPING_CALCULATION_TYPE.to_string(),
            entity,
            source_id,
        )
        .param("type", kind)
    }

    /// `source_id` is the price row, `shipping_method_id` its parent.
    pub fn unsupported_shipping_price(entity: &str, source_id: &str, shipping_method_id: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            UNSUPPORTED_SHIPPING_PRICE.to_string(),
            entity,
            source_id,
        )
        .param("shippingMethodId", shipping_method_id)
    }

    pub fn unsupported_document_type(entity: &str, source_id: &str, kind: &str) -> Self {
        Self::new(
            LogLevel::Warning,
            UNSUPPORTED_DOCUMENT_TYPE.to_string(),
            entity,
            source_id,
        )
        .param("type", kind)
    }

    pub fn into_entry(self, run_id: &str) -> LogEntry {
        LogEntry {
            run_id: Some(run_id.to_string()),
            level: self.level,
            code: self.code,
            entity: Some(self.entity),
            source_id: Some(self.source_id),
            parameters: self.parameters,
        }
    }
}

/// Writes `log` to `sink` for the run in `ctx`, mirroring it to the
/// diagnostic logger.
pub fn write_log(sink: &dyn LogSink, ctx: &MigrationContext, log: MigrationLog) -> Result<()> {
    log::debug!(
        "[{}] {} {}:{} {:?}",
        ctx.run_id,
        log.code,
        log.entity,
        log.source_id,
        log.parameters
    );
    sink.add_log_entry(log.into_entry(&ctx.run_id))?;
    Ok(())
}
