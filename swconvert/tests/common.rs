use mstorage::log_store::MemoryLogSink;
use mstorage::mapping::{InMemoryMappingStore, MappingStore};
use mstorage::models::{LogEntry, Mapping, NewMapping};
use mstorage::target::InMemoryTargetRepository;
use serde_json::{json, Value};
use std::sync::Arc;
use swconvert::converter::{ConversionResult, ConverterRegistry, ConverterServices};
use swconvert::lookup::SYSTEM_LANGUAGE_ID;
use swconvert::media::InMemoryMediaFileService;
use swconvert::profile::{SHOPWARE55, SHOPWARE6_MAJOR};
use swconvert::{Connection, MigrationContext, RawRecord};

pub const CONNECTION_ID: &str = "8a3f6b0c1f2e4d5a9b7c6d5e4f3a2b1c";
pub const RUN_ID: &str = "run-1";

/// Ids of the rows seeded into the destination.
#[allow(dead_code)]
pub mod ids {
    pub const LANGUAGE_DE: &str = "b7d2554b0ce847cd82f3ac9bd1c0dfca";
    pub const COUNTRY_DE: &str = "e1e8b0f8c0a24a3c9d3b2f1a0e9d8c7b";
    pub const COUNTRY_GB: &str = "a4c5d6e7f8091a2b3c4d5e6f7a8b9c0d";
    pub const STATE_NW: &str = "c0ffee00c0ffee00c0ffee00c0ffee00";
    pub const CURRENCY_EUR: &str = "b7d2554b0ce847cd82f3ac9bd1c0dfcb";
    pub const SALUTATION_MR: &str = "5a1ee8e7b2b24a3b9f0c5d4e3f2a1b0c";
    pub const TAX_19: &str = "1f2e3d4c5b6a79880f1e2d3c4b5a6978";
    pub const TAX_RULE_TYPE_COUNTRY: &str = "7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d";
    pub const CMS_DEFAULT_LISTING: &str = "d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0";
    pub const CMS_LOCKED_DETAIL: &str = "d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1";
    pub const CMS_SUMMER: &str = "d2d2d2d2d2d2d2d2d2d2d2d2d2d2d2d2";
    pub const DOCUMENT_TYPE_INVOICE: &str = "0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d01";
    pub const DOCUMENT_TYPE_STORNO: &str = "0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d02";
    pub const BASE_CONFIG_INVOICE: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b01";
    pub const MAIL_TYPE_ORDER: &str = "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a01";
    pub const MAIL_TEMPLATE_ORDER: &str = "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a02";
    pub const NUMBER_RANGE_TYPE_PRODUCT: &str = "0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c01";
    pub const SYSTEM_CONFIG_CATEGORY_PAGE: &str = "0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e01";
    pub const MEDIA_FOLDER_PRODUCT: &str = "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f01";
    pub const DELIVERY_TIME_1_3: &str = "0707070707070707070707070707070a";
}

#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<InMemoryMappingStore>,
    pub logs: Arc<MemoryLogSink>,
    pub target: Arc<InMemoryTargetRepository>,
    pub media: Arc<InMemoryMediaFileService>,
    pub services: ConverterServices,
    pub registry: ConverterRegistry,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = Arc::new(InMemoryMappingStore::new());
        let logs = Arc::new(MemoryLogSink::new());
        let target = Arc::new(InMemoryTargetRepository::new());
        let media = Arc::new(InMemoryMediaFileService::new());
        seed_target(&target);

        let services = ConverterServices::new(
            store.clone(),
            logs.clone(),
            target.clone(),
            media.clone(),
        );
        let registry = ConverterRegistry::with_defaults(services.clone());
        Self {
            store,
            logs,
            target,
            media,
            services,
            registry,
        }
    }

    /// Seeds a resolved mapping, as an earlier converter or the operator's
    /// premapping would have.
    pub fn map(&self, entity: &str, old: &str, new: &str) {
        self.store
            .get_or_create_mapping(
                NewMapping::new(CONNECTION_ID, entity, old).with_new_identifier(new),
            )
            .unwrap();
    }

    pub fn map_with_satellite(&self, entity: &str, old: &str, new: &str, satellite: Value) {
        self.store
            .get_or_create_mapping(
                NewMapping::new(CONNECTION_ID, entity, old)
                    .with_new_identifier(new)
                    .with_satellite(satellite),
            )
            .unwrap();
    }

    pub fn mapping(&self, entity: &str, old: &str) -> Option<Mapping> {
        self.store.get_mapping(CONNECTION_ID, entity, old).unwrap()
    }

    pub fn convert(&self, ctx: &MigrationContext, row: Value) -> ConversionResult {
        let converter = self.registry.get_converter(ctx).unwrap();
        let record = RawRecord::from_value(row).expect("fixture rows are objects");
        converter.convert(&record, ctx).unwrap()
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.logs.snapshot()
    }

    pub fn codes(&self) -> Vec<String> {
        self.logs.codes()
    }
}

#[allow(dead_code)]
pub fn legacy_ctx(entity: &str) -> MigrationContext {
    let connection = Connection::new(CONNECTION_ID, "Shopware 5.5", SHOPWARE55);
    MigrationContext::new(connection, RUN_ID, entity)
}

#[allow(dead_code)]
pub fn current_ctx(entity: &str) -> MigrationContext {
    let connection = Connection::new(CONNECTION_ID, "Shopware 6", SHOPWARE6_MAJOR);
    MigrationContext::new(connection, RUN_ID, entity)
}

fn seed_target(target: &InMemoryTargetRepository) {
    let rows = [
        ("language", SYSTEM_LANGUAGE_ID, json!({"locale": {"code": "en-GB"}})),
        ("language", ids::LANGUAGE_DE, json!({"locale": {"code": "de-DE"}})),
        ("country", ids::COUNTRY_DE, json!({"iso": "DE", "iso3": "DEU"})),
        ("country", ids::COUNTRY_GB, json!({"iso": "GB", "iso3": "GBR"})),
        ("country_state", ids::STATE_NW, json!({"shortCode": "DE-NW", "countryId": ids::COUNTRY_DE})),
        ("currency", ids::CURRENCY_EUR, json!({"isoCode": "EUR"})),
        ("salutation", ids::SALUTATION_MR, json!({"salutationKey": "mr"})),
        ("tax", ids::TAX_19, json!({"taxRate": 19.0, "name": "Standard rate"})),
        ("tax_rule_type", ids::TAX_RULE_TYPE_COUNTRY, json!({"technicalName": "entire_country"})),
        ("delivery_time", ids::DELIVERY_TIME_1_3, json!({"min": 1, "max": 1, "unit": "day"})),
        (
            "cms_page",
            ids::CMS_DEFAULT_LISTING,
            json!({
                "locked": true,
                "type": "product_list",
                "translations": [{"name": "Default listing layout"}, {"name": "Standard Listen-Layout"}],
            }),
        ),
        (
            "cms_page",
            ids::CMS_LOCKED_DETAIL,
            json!({
                "locked": true,
                "type": "product_detail",
                "translations": [{"name": "Default product page layout"}],
            }),
        ),
        (
            "cms_page",
            ids::CMS_SUMMER,
            json!({
                "locked": false,
                "type": "landingpage",
                "translations": [{"name": "Summer"}, {"name": "Sommer"}],
            }),
        ),
        ("document_type", ids::DOCUMENT_TYPE_INVOICE, json!({"technicalName": "invoice"})),
        ("document_type", ids::DOCUMENT_TYPE_STORNO, json!({"technicalName": "storno"})),
        (
            "document_base_config",
            ids::BASE_CONFIG_INVOICE,
            json!({"global": true, "documentTypeId": ids::DOCUMENT_TYPE_INVOICE}),
        ),
        ("mail_template_type", ids::MAIL_TYPE_ORDER, json!({"technicalName": "order_confirmation_mail"})),
        (
            "mail_template",
            ids::MAIL_TEMPLATE_ORDER,
            json!({"systemDefault": true, "mailTemplateTypeId": ids::MAIL_TYPE_ORDER}),
        ),
        ("number_range_type", ids::NUMBER_RANGE_TYPE_PRODUCT, json!({"technicalName": "product"})),
        (
            "system_config",
            ids::SYSTEM_CONFIG_CATEGORY_PAGE,
            json!({"configurationKey": "core.cms.default_category_cms_page", "salesChannelId": null}),
        ),
        ("media_default_folder", ids::MEDIA_FOLDER_PRODUCT, json!({"entity": "product"})),
    ];
    for (entity, id, payload) in rows {
        target.insert(entity, id, payload).unwrap();
    }
}
