mod common;

use serde_json::json;
use swconvert::entities;

use common::{ids, legacy_ctx, Harness};

#[test]
fn test_hit_is_persisted_as_mapping() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::CUSTOMER);

    let id = h.services.lookups.currency(&ctx, "EUR").unwrap();

    assert_eq!(id.as_deref(), Some(ids::CURRENCY_EUR));
    let mapping = h.mapping(entities::CURRENCY, "EUR").unwrap();
    assert_eq!(mapping.new_identifier.as_deref(), Some(ids::CURRENCY_EUR));
}

#[test]
fn test_existing_mapping_wins_over_destination_search() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::CUSTOMER);
    h.map(entities::COUNTRY, "2", "0123456789abcdef0123456789abcdef");

    let id = h.services.lookups.country(&ctx, "2", "DE", "DEU").unwrap();

    assert_eq!(id.as_deref(), Some("0123456789abcdef0123456789abcdef"));
}

#[test]
fn test_miss_is_not_remembered() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::CUSTOMER);

    assert_eq!(h.services.lookups.currency(&ctx, "CHF").unwrap(), None);
    assert!(h.mapping(entities::CURRENCY, "CHF").is_none());

    h.target
        .insert("currency", "c4f0000000000000000000000000000f", json!({"isoCode": "CHF"}))
        .unwrap();
    assert_eq!(
        h.services.lookups.currency(&ctx, "CHF").unwrap().as_deref(),
        Some("c4f0000000000000000000000000000f")
    );
}

#[test]
fn test_language_and_state_lookups() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::CUSTOMER);
    let lookups = &h.services.lookups;

    assert_eq!(lookups.language(&ctx, "de-DE").unwrap().as_deref(), Some(ids::LANGUAGE_DE));
    assert_eq!(lookups.language(&ctx, "fr-FR").unwrap(), None);
    assert_eq!(
        lookups.language_locale(ids::LANGUAGE_DE).unwrap().as_deref(),
        Some("de-DE")
    );
    assert_eq!(
        lookups.country_state(&ctx, "3", "DE", "NW").unwrap().as_deref(),
        Some(ids::STATE_NW)
    );
    assert_eq!(lookups.country_state(&ctx, "4", "DE", "BY").unwrap(), None);
    assert_eq!(
        lookups.country_by_iso(&ctx, "GB", "GBR").unwrap().as_deref(),
        Some(ids::COUNTRY_GB)
    );
}

#[test]
fn test_fallback_to_old_id() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::ORDER_DOCUMENT);

    let id = h
        .services
        .lookups
        .document_base_config(&ctx, "credit-config", ids::DOCUMENT_TYPE_STORNO)
        .unwrap();

    assert_eq!(id, "credit-config");
    let mapping = h
        .mapping(entities::ORDER_DOCUMENT_BASE_CONFIG, "credit-config")
        .unwrap();
    assert_eq!(mapping.new_identifier.as_deref(), Some("credit-config"));
}

#[test]
fn test_cms_page_lookups() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::CATEGORY);
    let lookups = &h.services.lookups;

    assert_eq!(
        lookups.default_cms_page(&ctx).unwrap().as_deref(),
        Some(ids::CMS_DEFAULT_LISTING)
    );
    let names = vec!["Sommer".to_string(), "Summer".to_string()];
    assert_eq!(
        lookups.cms_page_by_names(&names).unwrap().as_deref(),
        Some(ids::CMS_SUMMER)
    );
    assert_eq!(lookups.cms_page_by_names(&names[..1]).unwrap(), None);
    assert_eq!(lookups.cms_page_by_names(&[]).unwrap(), None);
}

#[test]
fn test_tax_and_delivery_time_lookups() {
    let h = Harness::new();
    let ctx = legacy_ctx(entities::PRODUCT);
    let lookups = &h.services.lookups;

    assert_eq!(lookups.tax(&ctx, "1", 19.0, None).unwrap().as_deref(), Some(ids::TAX_19));
    assert_eq!(lookups.tax(&ctx, "2", 19.0, Some("Reduced")).unwrap(), None);
    assert_eq!(lookups.tax(&ctx, "3", 7.0, None).unwrap(), None);
    assert_eq!(
        lookups.delivery_time(&ctx, 1, 1, "day").unwrap().as_deref(),
        Some(ids::DELIVERY_TIME_1_3)
    );
    assert_eq!(
        lookups.media_default_folder(&ctx, "product").unwrap().as_deref(),
        Some(ids::MEDIA_FOLDER_PRODUCT)
    );
}
