use serde_json::Value;

use super::{update_media_association, update_translations};
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::profile::CURRENT_PROFILES;
use crate::record::RawRecord;

pub struct ProductManufacturerConverter {
    services: ConverterServices,
}

impl ProductManufacturerConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for ProductManufacturerConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::PRODUCT_MANUFACTURER
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());
        scope.main_mapping(entities::PRODUCT_MANUFACTURER, &source_id, Some(&source_id))?;

        let mut converted = record.as_map().clone();
        update_translations(&scope, &mut converted, entities::PRODUCT_MANUFACTURER, None)?;
        if let Some(Value::Object(media)) = converted.get_mut("media") {
            update_media_association(&scope, media, entities::PRODUCT_MANUFACTURER)?;
        }

        scope.finish(Value::Object(converted), None)
    }

    fn media_uuids(&self, converted: &[Value]) -> Option<Vec<String>> {
        Some(
            converted
                .iter()
                .filter_map(|manufacturer| manufacturer.pointer("/media/id"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }
}
