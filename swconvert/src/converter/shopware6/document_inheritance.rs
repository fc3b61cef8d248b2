use serde_json::Value;

use super::map_media_reference;
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

/// Document base configs. The global config of a document type replaces
/// the destination's global config of that type.
pub struct DocumentInheritanceConverter {
    services: ConverterServices,
}

impl DocumentInheritanceConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for DocumentInheritanceConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::DOCUMENT_INHERITANCE
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let type_id = match record.path(&["documentType", "technicalName"]).as_text() {
            Some(technical_name) => scope.lookups().document_type(ctx, technical_name)?,
            None => None,
        };
        let Some(type_id) = type_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::DOCUMENT_BASE_CONFIG,
                &source_id,
                entities::DOCUMENT_TYPE,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let config_id = if record.field("global").as_bool() {
            scope
                .lookups()
                .document_base_config(ctx, &source_id, &type_id)?
        } else {
            source_id.clone()
        };
        let config_id =
            scope.main_mapping(entities::DOCUMENT_BASE_CONFIG, &source_id, Some(&config_id))?;

        let mut converted = record.as_map().clone();
        converted.remove("documentType");
        converted.insert("id".into(), Value::String(config_id.clone()));
        converted.insert("documentTypeId".into(), Value::String(type_id.clone()));
        map_media_reference(&scope, &mut converted, "logoId")?;

        if let Some(channels) = converted.get_mut("salesChannels") {
            update_association_ids(
                &scope,
                channels,
                entities::SALES_CHANNEL,
                "salesChannelId",
                entities::DOCUMENT_BASE_CONFIG,
            )?;
            for channel in channels
                .as_array_mut()
                .into_iter()
                .flatten()
                .filter_map(Value::as_object_mut)
            {
                channel.insert("documentBaseConfigId".into(), Value::String(config_id.clone()));
                channel.insert("documentTypeId".into(), Value::String(type_id.clone()));
            }
        }

        scope.finish(Value::Object(converted), None)
    }
}
