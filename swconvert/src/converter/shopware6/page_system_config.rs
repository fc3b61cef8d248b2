use serde_json::Value;

use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::CURRENT_PROFILES;
use crate::record::RawRecord;

/// System config rows whose value is a cms page id (default layouts,
/// contact page, ...).
pub struct PageSystemConfigConverter {
    services: ConverterServices,
}

impl PageSystemConfigConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for PageSystemConfigConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::PAGE_SYSTEM_CONFIG
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());
        let mut converted = record.as_map().clone();

        let sales_channel_id = match record.id("salesChannelId") {
            Some(old) => match scope.get_uuid(entities::SALES_CHANNEL, &old)? {
                Some(id) => Some(id),
                None => {
                    scope.log(MigrationLog::association_required_missing(
                        entities::SYSTEM_CONFIG,
                        &source_id,
                        entities::SALES_CHANNEL,
                    ))?;
                    return Ok(scope.abort(Some(record.to_value())));
                }
            },
            None => None,
        };
        if let Some(id) = &sales_channel_id {
            converted.insert("salesChannelId".into(), Value::String(id.clone()));
        }

        let key = record
            .field("configurationKey")
            .as_text()
            .unwrap_or_default()
            .to_string();
        let config_id = scope
            .lookups()
            .system_config(ctx, &source_id, &key, sales_channel_id.as_deref())?
            .unwrap_or_else(|| source_id.clone());
        let config_id = scope.main_mapping(entities::SYSTEM_CONFIG, &source_id, Some(&config_id))?;
        converted.insert("id".into(), Value::String(config_id));

        let page_id = match record.id("configurationValue") {
            Some(old) => scope.get_uuid(entities::CMS_PAGE, &old)?,
            None => None,
        };
        let Some(page_id) = page_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::SYSTEM_CONFIG,
                &source_id,
                entities::CMS_PAGE,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };
        converted.insert("configurationValue".into(), Value::String(page_id));

        scope.finish(Value::Object(converted), None)
    }
}
