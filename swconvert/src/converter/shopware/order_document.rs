//! Legacy order documents (`s_order_documents`). The PDF itself is not
//! converted; only a media stub is created and the file queued by hash.

use mstorage::models::MediaFile;
use serde_json::{Map, Value};

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

/// Mapping namespace of the media stub that carries the document file.
const DOCUMENT_MEDIA: &str = "order_document_media";

/// Destination technical name for a legacy document key.
fn document_type_name(key: &str) -> Option<&'static str> {
    match key {
        "invoice" => Some("invoice"),
        "delivery_note" => Some("delivery_note"),
        "credit" => Some("credit_note"),
        "cancellation" => Some("storno"),
        _ => None,
    }
}

/// Older exports name the primary key `ID`.
fn normalize_id(record: &RawRecord) -> RawRecord {
    let mut data = record.as_map().clone();
    if let Some(id) = data.remove("ID") {
        data.insert("id".into(), id);
    }
    RawRecord::new(data)
}

pub struct OrderDocumentConverter {
    services: ConverterServices,
}

impl OrderDocumentConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for OrderDocumentConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::ORDER_DOCUMENT
    }

    fn source_identifier(&self, record: &RawRecord) -> Option<String> {
        record.id("id").or_else(|| record.id("ID"))
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let record = normalize_id(record);
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(&record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, &record, source_id.clone());

        let order_id = match record.id("orderID") {
            Some(old) => scope.get_uuid(entities::ORDER, &old)?,
            None => None,
        };
        let Some(order_id) = order_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::ORDER_DOCUMENT,
                &source_id,
                entities::ORDER,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let key = record
            .path(&["documenttype", "key"])
            .as_text()
            .unwrap_or_default()
            .to_string();
        let Some(technical_name) = document_type_name(&key) else {
            scope.log(MigrationLog::unsupported_document_type(
                entities::ORDER_DOCUMENT,
                &source_id,
                &key,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };
        let Some(document_type_id) = scope.lookups().document_type(ctx, technical_name)? else {
            scope.log(MigrationLog::entity_unknown(
                entities::DOCUMENT_TYPE,
                technical_name,
                entities::ORDER_DOCUMENT,
                &source_id,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let document_id = scope.main_mapping(entities::ORDER_DOCUMENT, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id", "orderID", "userID", "type", "documenttype", "_locale"]);

        let base_config_old = record
            .path(&["documenttype", "id"])
            .as_id()
            .unwrap_or_else(|| key.clone());
        let base_config_id =
            scope
                .lookups()
                .document_base_config(ctx, &base_config_old, &document_type_id)?;

        let mut config = Map::new();
        config.insert("documentBaseConfigId".into(), Value::String(base_config_id));
        if let Some(number) = data.take_id("docID") {
            config.insert("documentNumber".into(), Value::String(number));
        }
        if let Some(date) = data.take_text("date") {
            config.insert("documentDate".into(), Value::String(date));
        }
        if let Some(amount) = data.take_f64("amount") {
            config.insert("amount".into(), Value::from(amount));
        }

        let mut out = Map::new();
        out.insert("id".into(), Value::String(document_id));
        out.insert("orderId".into(), Value::String(order_id));
        out.insert("documentTypeId".into(), Value::String(document_type_id));
        out.insert("fileType".into(), Value::String("pdf".into()));
        out.insert("static".into(), Value::Bool(true));

        if let Some(hash) = data.take_text("hash") {
            let media_id = scope.get_or_create(DOCUMENT_MEDIA, &source_id)?;
            let file_name = format!("{technical_name}_{source_id}");
            scope.services.media.save_media_file(MediaFile {
                run_id: ctx.run_id.clone(),
                entity: entities::ORDER_DOCUMENT.to_string(),
                uri: hash.clone(),
                file_name: file_name.clone(),
                file_size: None,
                media_id: media_id.clone(),
            })?;

            let mut media = Map::new();
            media.insert("id".into(), Value::String(media_id));
            media.insert("title".into(), Value::String(file_name));
            media.insert("private".into(), Value::Bool(true));
            if let Some(folder) = scope
                .lookups()
                .media_default_folder(ctx, entities::ORDER_DOCUMENT)?
            {
                media.insert("mediaFolderId".into(), Value::String(folder));
            }
            out.insert("documentMediaFile".into(), Value::Object(media));
            out.insert("deepLinkCode".into(), Value::String(hash));
        }

        if let Some(attributes) = data.take_object("attributes") {
            if let Some(fields) = attribute_custom_fields(
                &scope,
                entities::ORDER_DOCUMENT,
                &attributes,
                &["id", "documentID"],
            )? {
                config.insert("customFields".into(), Value::Object(fields));
            }
        }
        out.insert("config".into(), Value::Object(config));

        scope.finish(Value::Object(out), data.into_unmapped())
    }
}
