use serde_json::{json, Map, Value};

use super::language_id;
use crate::converter::helpers::attribute_custom_fields;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::RawRecord;

pub struct CustomerGroupConverter {
    services: ConverterServices,
}

impl CustomerGroupConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for CustomerGroupConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::CUSTOMER_GROUP
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        if record.field("description").is_blank() {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CUSTOMER_GROUP,
                &source_id,
                "description",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        }

        let group_id = scope.main_mapping(entities::CUSTOMER_GROUP, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id", "groupkey"]);

        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;
        let name = data.take_text("description").unwrap_or_default();

        let mut translation = Map::new();
        translation.insert("customerGroupId".into(), Value::String(group_id.clone()));
        translation.insert("languageId".into(), Value::String(language.clone()));
        translation.insert("name".into(), Value::String(name));
        if let Some(attributes) = data.take_object("attributes") {
            if let Some(fields) = attribute_custom_fields(
                &scope,
                entities::CUSTOMER_GROUP,
                &attributes,
                &["id", "customerGroupID"],
            )? {
                translation.insert("customFields".into(), Value::Object(fields));
            }
        }

        // `tax` = show gross prices, `taxinput` = enter gross prices.
        let display_gross = data.take_bool("tax");
        data.discard(&["taxinput"]);

        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));
        let converted = json!({
            "id": group_id,
            "displayGross": display_gross,
            "translations": translations,
        });
        scope.finish(converted, data.into_unmapped())
    }
}
