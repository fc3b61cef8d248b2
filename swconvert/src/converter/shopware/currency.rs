use serde_json::{json, Map, Value};

use super::language_id;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::RawRecord;

pub struct CurrencyConverter {
    services: ConverterServices,
}

impl CurrencyConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

fn rounding(decimals: i64) -> Value {
    json!({
        "decimals": decimals,
        "interval": 0.01,
        "roundForNet": true,
    })
}

impl Converter for CurrencyConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
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

        let Some(iso_code) = record.field("currency").as_text().map(str::to_string) else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CURRENCY,
                &source_id,
                "currency",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        // Currencies already present in the destination are reused, not
        // written again.
        if let Some(existing) = scope.lookups().currency(ctx, &iso_code)? {
            scope.main_mapping(entities::CURRENCY, &source_id, Some(&existing))?;
            return Ok(scope.abort(None));
        }

        let currency_id = scope.main_mapping(entities::CURRENCY, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id", "currency", "standard", "templatechar"]);

        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;
        let name = data.take_text("name").unwrap_or_else(|| iso_code.clone());
        let symbol = record
            .field("templatechar")
            .as_text()
            .unwrap_or(&iso_code)
            .to_string();

        let mut translation = Map::new();
        translation.insert("currencyId".into(), Value::String(currency_id.clone()));
        translation.insert("languageId".into(), Value::String(language.clone()));
        translation.insert("shortName".into(), Value::String(iso_code.clone()));
        translation.insert("name".into(), Value::String(name));
        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));

        let converted = json!({
            "id": currency_id,
            "isoCode": iso_code,
            "symbol": symbol,
            "factor": data.take_f64("factor").unwrap_or(1.0),
            "position": data.take_i64("position").unwrap_or(0),
            "symbolPosition": data.take_i64("symbol_position").unwrap_or(0),
            "isDefault": false,
            "itemRounding": rounding(2),
            "totalRounding": rounding(2),
            "translations": translations,
        });
        scope.finish(converted, data.into_unmapped())
    }
}
