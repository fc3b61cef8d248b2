use serde_json::Value;

use super::update_translations;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::profile::CURRENT_PROFILES;
use crate::record::RawRecord;

/// Dynamic product groups. Filters reference product fields by name and
/// carry over unchanged.
pub struct ProductStreamConverter {
    services: ConverterServices,
}

impl ProductStreamConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for ProductStreamConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::PRODUCT_STREAM
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());
        scope.main_mapping(entities::PRODUCT_STREAM, &source_id, Some(&source_id))?;

        let mut converted = record.as_map().clone();
        update_translations(&scope, &mut converted, entities::PRODUCT_STREAM, None)?;
        // Computed by the destination on write.
        converted.remove("apiFilter");
        converted.remove("invalid");

        scope.finish(Value::Object(converted), None)
    }
}
