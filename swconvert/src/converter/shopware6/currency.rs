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

/// Currencies are matched by ISO code; a match takes over the destination
/// id and the row updates it.
pub struct CurrencyConverter {
    services: ConverterServices,
}

impl CurrencyConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for CurrencyConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::CURRENCY
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let existing = match record.field("isoCode").as_text() {
            Some(iso_code) => scope.lookups().currency(ctx, iso_code)?,
            None => None,
        };
        let currency_id = existing.unwrap_or_else(|| source_id.clone());
        let currency_id = scope.main_mapping(entities::CURRENCY, &source_id, Some(&currency_id))?;

        let mut converted = record.as_map().clone();
        converted.insert("id".into(), Value::String(currency_id.clone()));
        update_translations(
            &scope,
            &mut converted,
            entities::CURRENCY,
            Some(("currencyId", &currency_id)),
        )?;

        scope.finish(Value::Object(converted), None)
    }
}
