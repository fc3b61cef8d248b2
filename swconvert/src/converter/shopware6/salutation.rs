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

pub struct SalutationConverter {
    services: ConverterServices,
}

impl SalutationConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for SalutationConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::SALUTATION
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let existing = match record.field("salutationKey").as_text() {
            Some(key) => scope.lookups().salutation(ctx, &source_id, key)?,
            None => None,
        };
        let salutation_id = existing.unwrap_or_else(|| source_id.clone());
        let salutation_id =
            scope.main_mapping(entities::SALUTATION, &source_id, Some(&salutation_id))?;

        let mut converted = record.as_map().clone();
        converted.insert("id".into(), Value::String(salutation_id.clone()));
        update_translations(
            &scope,
            &mut converted,
            entities::SALUTATION,
            Some(("salutationId", &salutation_id)),
        )?;

        scope.finish(Value::Object(converted), None)
    }
}
