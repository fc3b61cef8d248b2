//! Converters for Shopware 6 sources. Source rows already have the
//! destination shape, so conversion keeps ids and rewrites only the
//! references that differ between two installations.

mod cms_page;
mod currency;
mod document_inheritance;
mod mail_template;
mod number_range;
mod page_system_config;
mod product_manufacturer;
mod product_stream;
mod salutation;
mod tax;

pub use cms_page::CmsPageConverter;
pub use currency::CurrencyConverter;
pub use document_inheritance::DocumentInheritanceConverter;
pub use mail_template::MailTemplateConverter;
pub use number_range::NumberRangeConverter;
pub use page_system_config::PageSystemConfigConverter;
pub use product_manufacturer::ProductManufacturerConverter;
pub use product_stream::ProductStreamConverter;
pub use salutation::SalutationConverter;
pub use tax::TaxConverter;

use mstorage::models::MediaFile;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::helpers::update_association_ids;
use super::{ConvertScope, Converter, ConverterServices};
use crate::entities;
use crate::error::Result;
use crate::record::Field;

pub fn converters(services: &ConverterServices) -> Vec<Arc<dyn Converter>> {
    vec![
        Arc::new(CmsPageConverter::new(services.clone())),
        Arc::new(ProductManufacturerConverter::new(services.clone())),
        Arc::new(CurrencyConverter::new(services.clone())),
        Arc::new(PageSystemConfigConverter::new(services.clone())),
        Arc::new(ProductStreamConverter::new(services.clone())),
        Arc::new(MailTemplateConverter::new(services.clone())),
        Arc::new(NumberRangeConverter::new(services.clone())),
        Arc::new(SalutationConverter::new(services.clone())),
        Arc::new(TaxConverter::new(services.clone())),
        Arc::new(DocumentInheritanceConverter::new(services.clone())),
    ]
}

/// Rewrites `languageId` in a `translations` list and points each entry at
/// `owner_field = owner_id` when given.
pub(crate) fn update_translations(
    scope: &ConvertScope<'_>,
    converted: &mut Map<String, Value>,
    required_for: &str,
    owner: Option<(&str, &str)>,
) -> Result<()> {
    let Some(translations) = converted.get_mut("translations") else {
        return Ok(());
    };
    update_association_ids(scope, translations, entities::LANGUAGE, "languageId", required_for)?;
    if let (Some((field, id)), Some(items)) = (owner, translations.as_array_mut()) {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            item.insert(field.to_string(), Value::String(id.to_string()));
        }
    }
    Ok(())
}

/// Replaces `key` with the mapped media id, or drops it when the media was
/// not migrated.
pub(crate) fn map_media_reference(scope: &ConvertScope<'_>, object: &mut Map<String, Value>, key: &str) -> Result<()> {
    let Some(old) = Field::from_option(object.get(key)).as_id() else {
        return Ok(());
    };
    match scope.get_uuid(entities::MEDIA, &old)? {
        Some(id) => {
            object.insert(key.to_string(), Value::String(id));
        }
        None => {
            object.remove(key);
        }
    }
    Ok(())
}

/// Registers an embedded media row: keeps its id, queues the file behind
/// `url` and moves it into the destination's default folder for
/// `owner_entity`.
pub(crate) fn update_media_association(
    scope: &ConvertScope<'_>,
    media: &mut Map<String, Value>,
    owner_entity: &str,
) -> Result<()> {
    let Some(media_id) = Field::from_option(media.get("id")).as_id() else {
        return Ok(());
    };
    scope.mappings().get_or_create_with(
        scope.ctx,
        entities::MEDIA,
        &media_id,
        None,
        Some(&media_id),
    )?;

    if let Some(url) = Field::from_option(media.get("url")).as_text() {
        let name = Field::from_option(media.get("fileName"))
            .as_text()
            .unwrap_or(&media_id);
        let file_name = match Field::from_option(media.get("fileExtension")).as_text() {
            Some(extension) => format!("{name}.{extension}"),
            None => name.to_string(),
        };
        scope.services.media.save_media_file(MediaFile {
            run_id: scope.ctx.run_id.clone(),
            entity: entities::MEDIA.to_string(),
            uri: url.to_string(),
            file_name,
            file_size: Field::from_option(media.get("fileSize")).as_i64(),
            media_id: media_id.clone(),
        })?;
    }

    for key in ["url", "hasFile", "thumbnails", "mediaFolderId", "mediaFolder"] {
        media.remove(key);
    }
    if let Some(folder) = scope.lookups().media_default_folder(scope.ctx, owner_entity)? {
        media.insert("mediaFolderId".into(), Value::String(folder));
    }
    update_translations(scope, media, entities::MEDIA, None)
}

/// Names of all translations, in source order and without duplicates.
pub(crate) fn translated_names(record: &Map<String, Value>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let translations = Field::from_option(record.get("translations"))
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    for translation in translations {
        if let Some(name) = Field::from_option(translation.get("name")).as_text() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
