mod common;

use serde_json::{json, Value};
use swconvert::entities;
use swconvert::logging::{association_missing_code, empty_necessary_field_code};
use swconvert::lookup::SYSTEM_LANGUAGE_ID;

use common::{current_ctx, ids, Harness};

const SOURCE_LANGUAGE: &str = "9a1c2b3d4e5f46a7b8c9d0e1f2a3b4c5";
const SALES_CHANNEL: &str = "98432def39fc4624b33213a56b8c944d";
const CATEGORY: &str = "5c0e1b2a3d4f45a6b7c8d9e0f1a2b3c4";
const MEDIA: &str = "77aa88bb99cc00dd11ee22ff33aa44bb";

fn harness() -> Harness {
    let h = Harness::new();
    h.map(entities::LANGUAGE, SOURCE_LANGUAGE, ids::LANGUAGE_DE);
    h
}

fn new_id(h: &Harness, entity: &str, old: &str) -> Option<String> {
    h.mapping(entity, old).and_then(|m| m.new_identifier)
}

// --- CMS pages ---

fn cms_page(id: &str, locked: bool, page_type: &str, names: &[&str]) -> Value {
    let translations: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let language = if i == 0 { SYSTEM_LANGUAGE_ID } else { SOURCE_LANGUAGE };
            json!({"languageId": language, "name": name})
        })
        .collect();
    json!({
        "id": id,
        "locked": locked,
        "type": page_type,
        "translations": translations,
    })
}

#[test]
fn test_locked_cms_page_is_mapped_not_written() {
    let h = harness();
    let row = cms_page(
        "aa00000000000000000000000000000a",
        true,
        "product_list",
        &["Default listing layout", "Standard Listen-Layout"],
    );

    let result = h.convert(&current_ctx(entities::CMS_PAGE), row);

    assert!(result.converted.is_none());
    assert!(result.unmapped.is_none());
    assert_eq!(
        new_id(&h, entities::CMS_PAGE, "aa00000000000000000000000000000a").as_deref(),
        Some(ids::CMS_DEFAULT_LISTING)
    );
}

#[test]
fn test_locked_cms_page_needs_exact_names() {
    let h = harness();
    let row = cms_page(
        "aa00000000000000000000000000000b",
        true,
        "product_list",
        &["Default listing layout"],
    );

    let result = h.convert(&current_ctx(entities::CMS_PAGE), row);

    assert!(result.converted.is_none());
    assert!(h.mapping(entities::CMS_PAGE, "aa00000000000000000000000000000b").is_none());
}

#[test]
fn test_unlocked_cms_page_merges_into_same_named_page() {
    let h = harness();
    h.map(entities::MEDIA, "m1", MEDIA);
    h.map(entities::CATEGORY, "c1", CATEGORY);
    let mut row = cms_page("aa00000000000000000000000000000c", false, "landingpage", &["Summer", "Sommer"]);
    row["sections"] = json!([{
        "id": "s1",
        "backgroundMediaId": "m1",
        "blocks": [{
            "id": "b1",
            "backgroundMediaId": "unknown-media",
            "slots": [{
                "id": "sl1",
                "translations": [{"languageId": SOURCE_LANGUAGE, "config": {}}],
            }],
        }],
    }]);
    row["categories"] = json!([{"id": "c1"}]);

    let result = h.convert(&current_ctx(entities::CMS_PAGE), row);

    assert_eq!(result.unmapped, None);
    let converted = result.converted.unwrap();
    assert_eq!(converted["id"], json!(ids::CMS_SUMMER));
    assert_eq!(converted["translations"][1]["languageId"], json!(ids::LANGUAGE_DE));
    let section = &converted["sections"][0];
    assert_eq!(section["backgroundMediaId"], json!(MEDIA));
    assert!(section["blocks"][0].get("backgroundMediaId").is_none());
    assert_eq!(
        section["blocks"][0]["slots"][0]["translations"][0]["languageId"],
        json!(ids::LANGUAGE_DE)
    );
    assert_eq!(converted["categories"], json!([{"id": CATEGORY}]));
}

#[test]
fn test_unlocked_cms_page_keeps_its_id() {
    let h = harness();
    let row = cms_page("aa00000000000000000000000000000d", false, "landingpage", &["Winter"]);

    let converted = h
        .convert(&current_ctx(entities::CMS_PAGE), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!("aa00000000000000000000000000000d"));
}

// --- Manufacturers ---

#[test]
fn test_manufacturer_media_is_queued() {
    let h = harness();
    let ctx = current_ctx(entities::PRODUCT_MANUFACTURER);
    let row = json!({
        "id": "ma000000000000000000000000000001",
        "link": "https://example.com",
        "translations": [{"languageId": SOURCE_LANGUAGE, "name": "Taschenwerk"}],
        "media": {
            "id": "me000000000000000000000000000001",
            "url": "https://source.example.com/media/logo.png",
            "fileName": "logo",
            "fileExtension": "png",
            "fileSize": 512,
            "hasFile": true,
            "mediaFolderId": "old-folder",
            "thumbnails": [],
        },
    });

    let result = h.convert(&ctx, row);

    let converted = result.converted.unwrap();
    assert_eq!(converted["id"], json!("ma000000000000000000000000000001"));
    assert_eq!(converted["translations"][0]["languageId"], json!(ids::LANGUAGE_DE));
    let media = converted["media"].as_object().unwrap();
    for removed in ["url", "hasFile", "thumbnails", "mediaFolderId"] {
        assert!(!media.contains_key(removed), "{removed} should be stripped");
    }
    assert_eq!(
        new_id(&h, entities::MEDIA, "me000000000000000000000000000001").as_deref(),
        Some("me000000000000000000000000000001")
    );

    let files = h.media.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].uri, "https://source.example.com/media/logo.png");
    assert_eq!(files[0].file_name, "logo.png");
    assert_eq!(files[0].file_size, Some(512));

    let converter = h.registry.get_converter(&ctx).unwrap();
    assert_eq!(
        converter.media_uuids(&[converted]),
        Some(vec!["me000000000000000000000000000001".to_string()])
    );
}

// --- Currencies and salutations ---

#[test]
fn test_currency_takes_over_destination_id() {
    let h = harness();
    let row = json!({
        "id": "cu000000000000000000000000000001",
        "isoCode": "EUR",
        "factor": 1.0,
        "translations": [{"languageId": SOURCE_LANGUAGE, "currencyId": "cu000000000000000000000000000001", "name": "Euro"}],
    });

    let converted = h
        .convert(&current_ctx(entities::CURRENCY), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!(ids::CURRENCY_EUR));
    assert_eq!(converted["translations"][0]["currencyId"], json!(ids::CURRENCY_EUR));
    assert_eq!(converted["translations"][0]["languageId"], json!(ids::LANGUAGE_DE));
}

#[test]
fn test_salutation_is_matched_by_key() {
    let h = harness();
    let row = json!({
        "id": "sa000000000000000000000000000001",
        "salutationKey": "mr",
        "translations": [{"languageId": SOURCE_LANGUAGE, "displayName": "Herr"}],
    });

    let converted = h
        .convert(&current_ctx(entities::SALUTATION), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!(ids::SALUTATION_MR));
    assert_eq!(converted["translations"][0]["salutationId"], json!(ids::SALUTATION_MR));
}

#[test]
fn test_salutation_without_id_is_rejected() {
    let h = harness();
    let row = json!({
        "salutationKey": "mrs",
        "translations": [{"languageId": SOURCE_LANGUAGE, "displayName": "Frau"}],
    });

    let result = h.convert(&current_ctx(entities::SALUTATION), row);

    assert!(result.converted.is_none());
    assert!(result.mapping_id.is_none());
    assert!(h.mapping(entities::SALUTATION, "").is_none());
    let entries = h.log_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, empty_necessary_field_code(entities::SALUTATION));
    assert_eq!(entries[0].parameters["emptyField"], "id");
}

// --- Page system config ---

fn page_system_config(sales_channel: Option<&str>, page: &str) -> Value {
    json!({
        "id": "sc000000000000000000000000000001",
        "configurationKey": "core.cms.default_category_cms_page",
        "configurationValue": page,
        "salesChannelId": sales_channel,
    })
}

#[test]
fn test_page_system_config() {
    let h = harness();
    h.map(entities::CMS_PAGE, "cmsSource", ids::CMS_SUMMER);

    let converted = h
        .convert(
            &current_ctx(entities::PAGE_SYSTEM_CONFIG),
            page_system_config(None, "cmsSource"),
        )
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!(ids::SYSTEM_CONFIG_CATEGORY_PAGE));
    assert_eq!(converted["configurationValue"], json!(ids::CMS_SUMMER));
    assert!(converted["salesChannelId"].is_null());
}

#[test]
fn test_page_system_config_requires_mapped_page() {
    let h = harness();

    let result = h.convert(
        &current_ctx(entities::PAGE_SYSTEM_CONFIG),
        page_system_config(None, "cmsSource"),
    );

    assert!(result.converted.is_none());
    assert_eq!(h.codes(), vec![association_missing_code(entities::CMS_PAGE)]);
}

#[test]
fn test_page_system_config_requires_mapped_sales_channel() {
    let h = harness();
    h.map(entities::CMS_PAGE, "cmsSource", ids::CMS_SUMMER);

    let result = h.convert(
        &current_ctx(entities::PAGE_SYSTEM_CONFIG),
        page_system_config(Some("channelSource"), "cmsSource"),
    );

    assert!(result.converted.is_none());
    assert_eq!(h.codes(), vec![association_missing_code(entities::SALES_CHANNEL)]);
}

// --- Mail templates ---

#[test]
fn test_system_default_mail_template_replaces_destination_default() {
    let h = harness();
    let row = json!({
        "id": "mt000000000000000000000000000001",
        "systemDefault": true,
        "mailTemplateTypeId": "mtt00000000000000000000000000001",
        "mailTemplateType": {"id": "mtt00000000000000000000000000001", "technicalName": "order_confirmation_mail"},
        "translations": [{"languageId": SOURCE_LANGUAGE, "subject": "Bestellung"}],
    });

    let converted = h
        .convert(&current_ctx(entities::MAIL_TEMPLATE), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!(ids::MAIL_TEMPLATE_ORDER));
    assert_eq!(converted["mailTemplateTypeId"], json!(ids::MAIL_TYPE_ORDER));
    assert!(converted.get("mailTemplateType").is_none());
    assert_eq!(converted["translations"][0]["mailTemplateId"], json!(ids::MAIL_TEMPLATE_ORDER));
}

#[test]
fn test_custom_mail_template_type_keeps_id() {
    let h = harness();
    let row = json!({
        "id": "mt000000000000000000000000000002",
        "systemDefault": false,
        "mailTemplateTypeId": "mtt00000000000000000000000000002",
        "mailTemplateType": {"id": "mtt00000000000000000000000000002", "technicalName": "custom_newsletter"},
    });

    let converted = h
        .convert(&current_ctx(entities::MAIL_TEMPLATE), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!("mt000000000000000000000000000002"));
    assert_eq!(converted["mailTemplateTypeId"], json!("mtt00000000000000000000000000002"));
}

// --- Number ranges ---

fn number_range(technical_name: &str) -> Value {
    json!({
        "id": "nr000000000000000000000000000001",
        "typeId": "nrt00000000000000000000000000001",
        "global": true,
        "pattern": "{n}",
        "start": 10000,
        "type": {"id": "nrt00000000000000000000000000001", "technicalName": technical_name},
        "state": {"lastValue": 10042},
        "numberRangeSalesChannels": [{"salesChannelId": "channelSource"}],
        "translations": [{"languageId": SOURCE_LANGUAGE, "name": "Produkte"}],
    })
}

#[test]
fn test_convert_number_range() {
    let h = harness();
    h.map(entities::SALES_CHANNEL, "channelSource", SALES_CHANNEL);

    let result = h.convert(&current_ctx(entities::NUMBER_RANGE), number_range("product"));

    assert!(h.codes().is_empty(), "unexpected logs: {:?}", h.codes());
    let converted = result.converted.unwrap();
    assert_eq!(converted["typeId"], json!(ids::NUMBER_RANGE_TYPE_PRODUCT));
    assert!(converted.get("type").is_none());
    assert!(converted.get("state").is_none());
    let channel = &converted["numberRangeSalesChannels"][0];
    assert_eq!(channel["salesChannelId"], json!(SALES_CHANNEL));
    assert_eq!(channel["numberRangeId"], json!("nr000000000000000000000000000001"));
    assert_eq!(channel["numberRangeTypeId"], json!(ids::NUMBER_RANGE_TYPE_PRODUCT));
    assert_eq!(
        converted["translations"][0]["numberRangeId"],
        json!("nr000000000000000000000000000001")
    );
}

#[test]
fn test_number_range_with_unknown_type() {
    let h = harness();

    let result = h.convert(&current_ctx(entities::NUMBER_RANGE), number_range("custom_type"));

    assert!(result.converted.is_none());
    assert_eq!(
        h.codes(),
        vec![association_missing_code(entities::NUMBER_RANGE_TYPE)]
    );
}

// --- Taxes ---

#[test]
fn test_convert_tax_with_rules() {
    let h = harness();
    h.map(entities::COUNTRY, "countrySource", ids::COUNTRY_DE);
    let row = json!({
        "id": "tx000000000000000000000000000001",
        "taxRate": 19.0,
        "name": "Standard rate",
        "rules": [
            {
                "id": "tr000000000000000000000000000001",
                "taxRuleTypeId": "trt00000000000000000000000000001",
                "countryId": "countrySource",
                "taxRate": 19.0,
                "type": {"technicalName": "entire_country"},
            },
            {
                "id": "tr000000000000000000000000000002",
                "taxRuleTypeId": "trt00000000000000000000000000002",
                "countryId": "countrySource",
                "taxRate": 7.0,
                "type": {"technicalName": "zip_code_range"},
            },
        ],
    });

    let result = h.convert(&current_ctx(entities::TAX), row);

    let converted = result.converted.unwrap();
    assert_eq!(converted["id"], json!(ids::TAX_19));
    let rules = converted["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["taxId"], json!(ids::TAX_19));
    assert_eq!(rules[0]["countryId"], json!(ids::COUNTRY_DE));
    assert_eq!(rules[0]["taxRuleTypeId"], json!(ids::TAX_RULE_TYPE_COUNTRY));
    assert!(rules[0].get("type").is_none());

    let entries = h.log_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, association_missing_code(entities::TAX_RULE_TYPE));
    assert_eq!(entries[0].parameters["sourceId"], "tr000000000000000000000000000002");
}

// --- Document configs ---

#[test]
fn test_global_document_config_replaces_destination_config() {
    let h = harness();
    h.map(entities::SALES_CHANNEL, "channelSource", SALES_CHANNEL);
    let row = json!({
        "id": "dc000000000000000000000000000001",
        "name": "invoice",
        "global": true,
        "logoId": "media-not-migrated",
        "documentTypeId": "dt000000000000000000000000000001",
        "documentType": {"technicalName": "invoice"},
        "config": {"displayPrices": true},
        "salesChannels": [{"salesChannelId": "channelSource"}],
    });

    let result = h.convert(&current_ctx(entities::DOCUMENT_INHERITANCE), row);

    let converted = result.converted.unwrap();
    assert_eq!(converted["id"], json!(ids::BASE_CONFIG_INVOICE));
    assert_eq!(converted["documentTypeId"], json!(ids::DOCUMENT_TYPE_INVOICE));
    assert!(converted.get("documentType").is_none());
    assert!(converted.get("logoId").is_none());
    let channel = &converted["salesChannels"][0];
    assert_eq!(channel["salesChannelId"], json!(SALES_CHANNEL));
    assert_eq!(channel["documentBaseConfigId"], json!(ids::BASE_CONFIG_INVOICE));
    assert_eq!(
        new_id(&h, entities::DOCUMENT_BASE_CONFIG, "dc000000000000000000000000000001").as_deref(),
        Some(ids::BASE_CONFIG_INVOICE)
    );
}

#[test]
fn test_document_config_with_unknown_type() {
    let h = harness();
    let row = json!({
        "id": "dc000000000000000000000000000002",
        "global": false,
        "documentType": {"technicalName": "custom_document"},
    });

    let result = h.convert(&current_ctx(entities::DOCUMENT_INHERITANCE), row);

    assert!(result.converted.is_none());
    assert_eq!(h.codes(), vec![association_missing_code(entities::DOCUMENT_TYPE)]);
}

// --- Product streams ---

#[test]
fn test_product_stream_drops_computed_fields() {
    let h = harness();
    let row = json!({
        "id": "ps000000000000000000000000000001",
        "apiFilter": [{"type": "equals"}],
        "invalid": false,
        "filters": [{"type": "equals", "field": "active", "value": "1"}],
        "translations": [{"languageId": SOURCE_LANGUAGE, "name": "Aktive"}],
    });

    let converted = h
        .convert(&current_ctx(entities::PRODUCT_STREAM), row)
        .converted
        .unwrap();

    assert_eq!(converted["id"], json!("ps000000000000000000000000000001"));
    assert!(converted.get("apiFilter").is_none());
    assert!(converted.get("invalid").is_none());
    assert_eq!(converted["filters"][0]["field"], json!("active"));
}
