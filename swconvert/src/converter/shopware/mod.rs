//! Converters for the Shopware 5 source family. One implementation per
//! entity serves every 5.x profile.

mod category;
mod currency;
mod customer;
mod customer_group;
mod order_document;
mod product;
mod shipping_method;
mod translation;

pub use category::CategoryConverter;
pub use currency::CurrencyConverter;
pub use customer::CustomerConverter;
pub use customer_group::CustomerGroupConverter;
pub use order_document::OrderDocumentConverter;
pub use product::ProductConverter;
pub use shipping_method::ShippingMethodConverter;
pub use translation::TranslationConverter;

use mstorage::models::MediaFile;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{ConvertScope, Converter, ConverterServices};
use crate::entities;
use crate::error::Result;
use crate::lookup::SYSTEM_LANGUAGE_ID;
use crate::record::Field;

pub fn converters(services: &ConverterServices) -> Vec<Arc<dyn Converter>> {
    vec![
        Arc::new(CustomerConverter::new(services.clone())),
        Arc::new(CustomerGroupConverter::new(services.clone())),
        Arc::new(CategoryConverter::new(services.clone())),
        Arc::new(ProductConverter::new(services.clone())),
        Arc::new(CurrencyConverter::new(services.clone())),
        Arc::new(ShippingMethodConverter::new(services.clone())),
        Arc::new(TranslationConverter::new(services.clone())),
        Arc::new(OrderDocumentConverter::new(services.clone())),
    ]
}

/// Destination language for a source `_locale`, the system language when
/// the locale is missing or unknown.
pub(crate) fn language_id(scope: &ConvertScope<'_>, locale: Option<&str>) -> Result<String> {
    let Some(locale) = locale.filter(|l| !l.is_empty()) else {
        return Ok(SYSTEM_LANGUAGE_ID.to_string());
    };
    let code = locale.replace('_', "-");
    Ok(scope
        .lookups()
        .language(scope.ctx, &code)?
        .unwrap_or_else(|| SYSTEM_LANGUAGE_ID.to_string()))
}

/// Converts a legacy media row (`{id, name, description, path, file_size,
/// extension}`) into a destination media stub and queues the file.
pub(crate) fn convert_media(
    scope: &ConvertScope<'_>,
    media: &Map<String, Value>,
    owner_entity: &str,
    language_id: &str,
) -> Result<Option<Value>> {
    let field = |key: &str| Field::from_option(media.get(key));
    let Some(old_id) = field("id").as_id() else {
        return Ok(None);
    };
    let media_id = scope.get_or_create(entities::MEDIA, &old_id)?;
    let name = field("name").as_text().unwrap_or(&old_id).to_string();
    let extension = field("extension").as_text().unwrap_or_default();
    let file_name = if extension.is_empty() {
        name.clone()
    } else {
        format!("{name}.{extension}")
    };

    if let Some(uri) = field("uri").as_text().or(field("path").as_text()) {
        scope.services.media.save_media_file(MediaFile {
            run_id: scope.ctx.run_id.clone(),
            entity: entities::MEDIA.to_string(),
            uri: uri.to_string(),
            file_name,
            file_size: field("file_size").as_i64(),
            media_id: media_id.clone(),
        })?;
    }

    let mut converted = json!({
        "id": media_id,
        "title": name,
    });
    if let Some(folder) = scope
        .lookups()
        .media_default_folder(scope.ctx, owner_entity)?
    {
        converted["mediaFolderId"] = Value::String(folder);
    }
    if let Some(description) = field("description").as_text() {
        converted["alt"] = Value::String(description.to_string());
        converted["translations"] = json!({
            language_id: {
                "languageId": language_id,
                "title": name,
                "alt": description,
            }
        });
    }
    Ok(Some(converted))
}
