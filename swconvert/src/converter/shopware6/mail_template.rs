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

/// Mail templates. System default templates replace the destination's own
/// default of the same type instead of adding a second one.
pub struct MailTemplateConverter {
    services: ConverterServices,
}

impl MailTemplateConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for MailTemplateConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::MAIL_TEMPLATE
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());
        let mut converted = record.as_map().clone();
        converted.remove("mailTemplateType");

        let old_type_id = record.id("mailTemplateTypeId").unwrap_or_default();
        // Custom types keep their id; they are migrated with the same id.
        let type_id = match record
            .path(&["mailTemplateType", "technicalName"])
            .as_text()
        {
            Some(technical_name) => scope
                .lookups()
                .mail_template_type(ctx, &old_type_id, technical_name)?
                .unwrap_or_else(|| old_type_id.clone()),
            None => old_type_id.clone(),
        };
        converted.insert("mailTemplateTypeId".into(), Value::String(type_id.clone()));

        let template_id = if record.field("systemDefault").as_bool() {
            scope
                .lookups()
                .system_default_mail_template(ctx, &source_id, &type_id)?
        } else {
            source_id.clone()
        };
        let template_id =
            scope.main_mapping(entities::MAIL_TEMPLATE, &source_id, Some(&template_id))?;
        converted.insert("id".into(), Value::String(template_id.clone()));

        update_translations(
            &scope,
            &mut converted,
            entities::MAIL_TEMPLATE,
            Some(("mailTemplateId", &template_id)),
        )?;

        scope.finish(Value::Object(converted), None)
    }
}
