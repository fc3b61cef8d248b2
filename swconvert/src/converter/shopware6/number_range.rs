use serde_json::Value;

use super::update_translations;
use crate::converter::helpers::update_association_ids;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::CURRENT_PROFILES;
use crate::record::RawRecord;

pub struct NumberRangeConverter {
    services: ConverterServices,
}

impl NumberRangeConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for NumberRangeConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::NUMBER_RANGE
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let old_type_id = record.id("typeId").unwrap_or_default();
        let type_id = match record.path(&["type", "technicalName"]).as_text() {
            Some(technical_name) => {
                scope
                    .lookups()
                    .number_range_type(ctx, &old_type_id, technical_name)?
            }
            None => None,
        };
        let Some(type_id) = type_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::NUMBER_RANGE,
                &source_id,
                entities::NUMBER_RANGE_TYPE,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let range_id = scope.main_mapping(entities::NUMBER_RANGE, &source_id, Some(&source_id))?;
        let mut converted = record.as_map().clone();
        // The counter state belongs to the destination.
        converted.remove("type");
        converted.remove("state");
        converted.insert("typeId".into(), Value::String(type_id.clone()));

        update_translations(
            &scope,
            &mut converted,
            entities::NUMBER_RANGE,
            Some(("numberRangeId", &range_id)),
        )?;

        if let Some(channels) = converted.get_mut("numberRangeSalesChannels") {
            update_association_ids(
                &scope,
                channels,
                entities::SALES_CHANNEL,
                "salesChannelId",
                entities::NUMBER_RANGE,
            )?;
            for channel in channels
                .as_array_mut()
                .into_iter()
                .flatten()
                .filter_map(Value::as_object_mut)
            {
                channel.insert("numberRangeId".into(), Value::String(range_id.clone()));
                channel.insert("numberRangeTypeId".into(), Value::String(type_id.clone()));
            }
        }

        scope.finish(Value::Object(converted), None)
    }
}
