use serde_json::{Map, Value};

use super::{map_media_reference, translated_names, update_translations};
use crate::converter::helpers::update_association_ids;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::profile::CURRENT_PROFILES;
use crate::record::RawRecord;

/// Layout pages. Locked pages ship with every installation and are only
/// mapped onto their destination twin, never written. Unlocked pages are
/// merged into a destination page carrying exactly the same names.
pub struct CmsPageConverter {
    services: ConverterServices,
}

impl CmsPageConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for CmsPageConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::CMS_PAGE
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());
        let names = translated_names(record.as_map());

        if record.field("locked").as_bool() {
            let page_type = record.field("type").as_text().unwrap_or_default();
            let locked_id = scope
                .lookups()
                .map_locked_cms_page(ctx, &names, page_type, &source_id)?;
            if let Some(id) = locked_id {
                scope.main_mapping(entities::CMS_PAGE, &source_id, Some(&id))?;
            }
            return Ok(scope.abort(None));
        }

        let page_id = scope
            .lookups()
            .cms_page_by_names(&names)?
            .unwrap_or_else(|| source_id.clone());
        let page_id = scope.main_mapping(entities::CMS_PAGE, &source_id, Some(&page_id))?;

        let mut converted = record.as_map().clone();
        converted.insert("id".into(), Value::String(page_id));
        update_translations(&scope, &mut converted, entities::CMS_PAGE, None)?;
        map_media_reference(&scope, &mut converted, "previewMediaId")?;

        if let Some(Value::Array(sections)) = converted.get_mut("sections") {
            for section in sections.iter_mut().filter_map(Value::as_object_mut) {
                convert_section(&scope, section)?;
            }
        }
        if let Some(categories) = converted.get_mut("categories") {
            update_association_ids(&scope, categories, entities::CATEGORY, "id", entities::CMS_PAGE)?;
        }

        scope.finish(Value::Object(converted), None)
    }
}

fn convert_section(scope: &ConvertScope<'_>, section: &mut Map<String, Value>) -> Result<()> {
    if let Some(Value::Array(blocks)) = section.get_mut("blocks") {
        for block in blocks.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(Value::Array(slots)) = block.get_mut("slots") {
                for slot in slots.iter_mut().filter_map(Value::as_object_mut) {
                    update_translations(scope, slot, entities::CMS_PAGE, None)?;
                    map_media_reference(scope, slot, "backgroundMediaId")?;
                }
            }
            map_media_reference(scope, block, "backgroundMediaId")?;
        }
    }
    map_media_reference(scope, section, "backgroundMediaId")
}

