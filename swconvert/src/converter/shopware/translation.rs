//! Legacy translation rows (`s_core_translations`). Each row carries a
//! serialized blob of translated fields for one object; the result is a
//! partial update of the parent entity holding a single translation.

use serde_json::{Map, Value};

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
use crate::serialized::unserialize_array;

const ATTRIBUTE_PREFIX: &str = "__attribute_";

// Mapping namespaces of configurator and property rows.
const CONFIGURATOR_OPTION: &str = "property_group_option_option";
const CONFIGURATOR_GROUP: &str = "property_group_option";
const PROPERTY_VALUE: &str = "property_group_option_property";
const PROPERTY_OPTION: &str = "property_group_property";

const PRODUCT_FIELDS: &[(&str, &str)] = &[
    ("txtArtikel", "name"),
    ("txtlangbeschreibung", "description"),
    ("metaTitle", "metaTitle"),
    ("txtshortdescription", "metaDescription"),
    ("txtkeywords", "keywords"),
    ("txtpackunit", "packUnit"),
];

const CATEGORY_FIELDS: &[(&str, &str)] = &[
    ("description", "name"),
    ("cmstext", "description"),
    ("external", "externalLink"),
    ("metatitle", "metaTitle"),
    ("metadescription", "metaDescription"),
    ("metakeywords", "keywords"),
];

/// Where the parent's legacy id comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParentKey {
    ObjectKey,
    /// A column of the translation row itself.
    Column(&'static str),
    /// The single key of the unserialized blob (`config_units`).
    BlobKey,
}

#[derive(Debug, Clone, Copy)]
struct TranslationKind {
    parent_namespace: &'static str,
    parent_key: ParentKey,
    /// Parent entity as named in logs and in the output.
    entity_name: &'static str,
    unserialized_entity: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

fn kind(
    parent_namespace: &'static str,
    parent_key: ParentKey,
    entity_name: &'static str,
    unserialized_entity: &'static str,
    fields: &'static [(&'static str, &'static str)],
) -> Option<TranslationKind> {
    Some(TranslationKind {
        parent_namespace,
        parent_key,
        entity_name,
        unserialized_entity,
        fields,
    })
}

fn kind_for(object_type: &str) -> Option<TranslationKind> {
    match object_type {
        "article" | "product" => kind(
            entities::PRODUCT_MAIN,
            ParentKey::ObjectKey,
            entities::PRODUCT,
            "product_translation",
            PRODUCT_FIELDS,
        ),
        "variant" => kind(
            entities::PRODUCT,
            ParentKey::Column("ordernumber"),
            entities::PRODUCT,
            "product_translation",
            PRODUCT_FIELDS,
        ),
        "supplier" => kind(
            entities::PRODUCT_MANUFACTURER,
            ParentKey::ObjectKey,
            entities::PRODUCT_MANUFACTURER,
            "product_manufacturer_translation",
            &[("description", "description")],
        ),
        "config_units" => kind(
            entities::UNIT,
            ParentKey::BlobKey,
            entities::UNIT,
            "unit_translation",
            &[("unit", "shortCode"), ("description", "name")],
        ),
        "category" | "s_categories_attributes" => kind(
            entities::CATEGORY,
            ParentKey::ObjectKey,
            entities::CATEGORY,
            "category_translation",
            CATEGORY_FIELDS,
        ),
        "configuratoroption" => kind(
            CONFIGURATOR_OPTION,
            ParentKey::ObjectKey,
            entities::PROPERTY_GROUP_OPTION,
            "property_group_option_translation",
            &[("name", "name")],
        ),
        "configuratorgroup" => kind(
            CONFIGURATOR_GROUP,
            ParentKey::ObjectKey,
            entities::PROPERTY_GROUP,
            "property_group_translation",
            &[("name", "name"), ("description", "description")],
        ),
        "propertyvalue" => kind(
            PROPERTY_VALUE,
            ParentKey::ObjectKey,
            entities::PROPERTY_GROUP_OPTION,
            "property_group_option_translation",
            &[("optionValue", "name")],
        ),
        "propertyoption" => kind(
            PROPERTY_OPTION,
            ParentKey::ObjectKey,
            entities::PROPERTY_GROUP,
            "property_group_translation",
            &[("optionName", "name")],
        ),
        "articleimage" => kind(
            entities::MEDIA,
            ParentKey::Column("mediaId"),
            entities::MEDIA,
            "media_translation",
            &[("description", "alt")],
        ),
        _ => None,
    }
}

pub struct TranslationConverter {
    services: ConverterServices,
}

impl TranslationConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for TranslationConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::TRANSLATION
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let Some(locale) = record.field("_locale").as_text() else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::TRANSLATION,
                &source_id,
                "locale",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let object_type = record.field("objecttype").as_text().unwrap_or_default();
        let Some(kind) = kind_for(object_type) else {
            scope.log(MigrationLog::unsupported_object_type(
                entities::TRANSLATION,
                &source_id,
                object_type,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        // Image translations without a media reference carry nothing to
        // translate.
        if kind.parent_key == ParentKey::Column("mediaId") && record.id("mediaId").is_none() {
            return Ok(scope.abort(Some(record.to_value())));
        }

        let raw_blob = record.field("objectdata").as_str().unwrap_or_default();
        let mut blob = match unserialize_array(raw_blob) {
            Ok(blob) => blob,
            Err(err) => {
                log::debug!("translation {source_id}: {err}");
                scope.log(MigrationLog::invalid_unserialized_data(
                    entities::TRANSLATION,
                    &source_id,
                    kind.unserialized_entity,
                ))?;
                return Ok(scope.abort(Some(record.to_value())));
            }
        };

        let parent_old_id = match kind.parent_key {
            ParentKey::ObjectKey => record.id("objectkey"),
            ParentKey::Column(column) => record.id(column).or_else(|| record.id("objectkey")),
            ParentKey::BlobKey => match blob.keys().next().cloned() {
                Some(key) => {
                    // config_units blobs are keyed by unit id.
                    let inner = blob.remove(&key);
                    blob = inner
                        .and_then(|v| match v {
                            Value::Object(map) => Some(map),
                            _ => None,
                        })
                        .unwrap_or_default();
                    Some(key)
                }
                None => None,
            },
        };

        let parent_id = match &parent_old_id {
            Some(old) => scope.get_uuid(kind.parent_namespace, old)?,
            None => None,
        };
        let Some(parent_id) = parent_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::TRANSLATION,
                &source_id,
                kind.entity_name,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let translation_id = scope.main_mapping(entities::TRANSLATION, &source_id, None)?;
        let language = language_id(&scope, Some(locale))?;

        let mut translation = Map::new();
        translation.insert("id".into(), Value::String(translation_id));
        translation.insert("languageId".into(), Value::String(language.clone()));
        for (from, to) in kind.fields {
            if let Some(value) = blob.remove(*from) {
                if !value.is_null() {
                    translation.insert((*to).to_string(), value);
                }
            }
        }

        let attribute_keys: Vec<String> = blob
            .keys()
            .filter(|k| k.starts_with(ATTRIBUTE_PREFIX))
            .cloned()
            .collect();
        let mut attributes = Map::new();
        for key in attribute_keys {
            if let Some(value) = blob.remove(&key) {
                attributes.insert(key[ATTRIBUTE_PREFIX.len()..].to_string(), value);
            }
        }
        if let Some(fields) = attribute_custom_fields(&scope, kind.entity_name, &attributes, &[])? {
            translation.insert("customFields".into(), Value::Object(fields));
        }

        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));
        let mut converted = Map::new();
        converted.insert("id".into(), Value::String(parent_id));
        converted.insert("entityName".into(), Value::String(kind.entity_name.to_string()));
        converted.insert("translations".into(), Value::Object(translations));

        let unmapped = if blob.is_empty() {
            None
        } else {
            let mut leftover = Map::new();
            leftover.insert("objectdata".into(), Value::Object(blob));
            Some(Value::Object(leftover))
        };
        scope.finish(Value::Object(converted), unmapped)
    }
}
