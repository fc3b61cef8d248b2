use serde_json::{Map, Value};

use super::{convert_media, language_id};
use crate::converter::helpers::attribute_custom_fields;
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::{RawRecord, Working};

/// Legacy category columns that have no destination field.
const DISCARDED_FIELDS: &[&str] = &[
    "path",
    "position",
    "template",
    "blog",
    "hidefilter",
    "mediaID",
    "product_box_layout",
    "stream_id",
    "hide_sortings",
    "sorting_ids",
    "facet_ids",
    "shops",
    "categoryPosition",
    "added",
    "changed",
];

pub struct CategoryConverter {
    services: ConverterServices,
}

impl CategoryConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for CategoryConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::CATEGORY
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
                entities::CATEGORY,
                &source_id,
                "description",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        }

        // Children are converted after their parent; a parent without a
        // mapping means the tree is broken at this node.
        let parent_id = match record.id("parent") {
            Some(parent) => match scope.get_uuid(entities::CATEGORY, &parent)? {
                Some(id) => Some(id),
                None => {
                    scope.log(MigrationLog::association_required_missing(
                        entities::CATEGORY,
                        &source_id,
                        entities::CATEGORY,
                    ))?;
                    return Ok(scope.abort(Some(record.to_value())));
                }
            },
            None => None,
        };

        let category_id = scope.main_mapping(entities::CATEGORY, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id", "parent"]);
        data.discard(DISCARDED_FIELDS);

        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;

        let mut out = Map::new();
        out.insert("id".into(), Value::String(category_id.clone()));
        if let Some(parent_id) = parent_id {
            out.insert("parentId".into(), Value::String(parent_id));
        }
        if let Some(previous) = data.take_id("previousSiblingId") {
            if let Some(after) = scope.get_uuid(entities::CATEGORY, &previous)? {
                out.insert("afterCategoryId".into(), Value::String(after));
            }
        }
        out.insert("active".into(), Value::Bool(data.take_bool("active")));
        out.insert("visible".into(), Value::Bool(!data.take_bool("hidetop")));

        if let Some(cms_page) = scope.lookups().default_cms_page(ctx)? {
            out.insert("cmsPageId".into(), Value::String(cms_page));
        }

        let translation = build_translation(&scope, &mut data, &category_id, &language)?;
        if let Some(link) = translation.get("externalLink").cloned() {
            out.insert("type".into(), Value::String("link".into()));
            out.insert("externalLink".into(), link);
            out.insert(
                "linkNewTab".into(),
                Value::Bool(data.field("external_target").as_str() == Some("_blank")),
            );
        } else {
            out.insert("type".into(), Value::String("page".into()));
        }
        data.discard(&["external_target"]);

        if let Some(asset) = data.take_object("asset") {
            if let Some(media) = convert_media(&scope, &asset, entities::CATEGORY, &language)? {
                if let Some(media_id) = media.get("id").cloned() {
                    out.insert("mediaId".into(), media_id);
                }
                out.insert("media".into(), media);
            }
        }

        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));
        out.insert("translations".into(), Value::Object(translations));

        scope.finish(Value::Object(out), data.into_unmapped())
    }
}

fn build_translation(
    scope: &ConvertScope<'_>,
    data: &mut Working,
    category_id: &str,
    language: &str,
) -> Result<Map<String, Value>> {
    let mut translation = Map::new();
    translation.insert("categoryId".into(), Value::String(category_id.to_string()));
    translation.insert("languageId".into(), Value::String(language.to_string()));
    for (from, to) in [
        ("description", "name"),
        ("cmstext", "description"),
        ("external", "externalLink"),
        ("meta_title", "metaTitle"),
        ("metadescription", "metaDescription"),
        ("metakeywords", "keywords"),
    ] {
        if let Some(value) = data.take_text(from) {
            translation.insert(to.into(), Value::String(value));
        }
    }
    if let Some(attributes) = data.take_object("attributes") {
        if let Some(fields) = attribute_custom_fields(
            scope,
            entities::CATEGORY,
            &attributes,
            &["id", "categoryID"],
        )? {
            translation.insert("customFields".into(), Value::Object(fields));
        }
    }
    Ok(translation)
}
