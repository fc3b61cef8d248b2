mod common;

use mstorage::catalog::Catalog;
use serde_json::json;
use swconvert::converter::ConverterRegistry;
use swconvert::entities;
use swconvert::gateway::JsonDumpGateway;
use swconvert::profile::{SHOPWARE55, SHOPWARE6_MAJOR};
use swconvert::runner::{EntityReport, LEGACY_ENTITY_ORDER};
use swconvert::{Connection, ConvertError, MigrationContext, MigrationRunner};

use common::{legacy_ctx, Harness, CONNECTION_ID, RUN_ID};

fn dump() -> JsonDumpGateway {
    JsonDumpGateway::from_value(json!({
        "customer_group": [
            {"id": "1", "groupkey": "EK", "description": "Shopkunden", "tax": "1", "taxinput": "1"},
        ],
        "currency": [
            {"id": "1", "currency": "EUR", "name": "Euro"},
            {"id": "2", "currency": "USD", "name": "US-Dollar", "templatechar": "$"},
        ],
        "category": [
            {"id": "3", "parent": null, "description": "Root", "active": "1"},
            {"id": "4", "parent": "3", "description": "Child", "active": "1"},
            {"id": "5", "parent": "99", "description": "Orphan", "active": "1"},
        ],
        "unused_table": [{"id": "1"}],
    }))
    .unwrap()
}

fn catalog() -> Catalog {
    let catalog = Catalog::in_memory().unwrap();
    catalog.initialize_schema().unwrap();
    catalog
}

#[test]
fn test_run_converts_entities_in_order() {
    let h = Harness::new();
    let catalog = catalog();
    let runner = MigrationRunner::new(&h.registry)
        .with_catalog(&catalog)
        .with_page_size(2);

    let report = runner.run(&dump(), &legacy_ctx(entities::CUSTOMER)).unwrap();

    assert_eq!(report.run_id, RUN_ID);
    assert_eq!(
        report.entities.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["category", "currency", "customer_group"]
    );
    assert_eq!(
        report.entities["customer_group"],
        EntityReport { total: 1, converted: 1, skipped: 0, failed: 0, media: 0 }
    );
    assert_eq!(
        report.entities["currency"],
        EntityReport { total: 2, converted: 1, skipped: 1, failed: 0, media: 0 }
    );
    assert_eq!(
        report.entities["category"],
        EntityReport { total: 3, converted: 2, skipped: 1, failed: 0, media: 0 }
    );

    let currencies = catalog.migration_data_for_run(RUN_ID, "currency").unwrap();
    assert_eq!(currencies.len(), 2);
    assert_eq!(currencies[0].source_id.as_deref(), Some("1"));
    assert!(currencies[0].converted.is_none());
    assert!(currencies[0].mapping_id.is_some());
    assert!(currencies[0].checksum.is_some());
    assert_eq!(currencies[1].converted.as_ref().unwrap()["isoCode"], json!("USD"));

    let categories = catalog.migration_data_for_run(RUN_ID, "category").unwrap();
    assert_eq!(categories.len(), 3);
    assert_eq!(
        categories[1].converted.as_ref().unwrap()["parentId"],
        categories[0].converted.as_ref().unwrap()["id"]
    );
    assert!(categories[2].converted.is_none());
    assert_eq!(
        h.codes(),
        vec![swconvert::logging::association_missing_code(entities::CATEGORY)]
    );
}

#[test]
fn test_second_run_reuses_ids() {
    let h = Harness::new();
    let catalog = catalog();
    let runner = MigrationRunner::new(&h.registry).with_catalog(&catalog);
    let ctx = legacy_ctx(entities::CATEGORY);

    runner.run(&dump(), &ctx).unwrap();
    runner.run(&dump(), &ctx).unwrap();

    let categories = catalog.migration_data_for_run(RUN_ID, "category").unwrap();
    assert_eq!(categories.len(), 6);
    for (first, second) in categories[..3].iter().zip(&categories[3..]) {
        assert_eq!(first.converted, second.converted);
        assert_eq!(first.mapping_id, second.mapping_id);
    }
}

#[test]
fn test_entities_without_converter_are_skipped() {
    let registry = ConverterRegistry::new(Vec::new());
    let runner = MigrationRunner::new(&registry);

    let report = runner.run(&dump(), &legacy_ctx(entities::CATEGORY)).unwrap();

    assert_eq!(report.entities["category"].skipped, 3);
    assert_eq!(report.entities["category"].converted, 0);
}

#[test]
fn test_unknown_profile_fails_the_run() {
    let h = Harness::new();
    let connection = Connection::new(CONNECTION_ID, "Magento", "magento19");
    let ctx = MigrationContext::new(connection, RUN_ID, entities::PRODUCT);

    let err = MigrationRunner::new(&h.registry).run(&dump(), &ctx).unwrap_err();

    assert!(matches!(err, ConvertError::ProfileNotFound(name) if name == "magento19"));
}

#[test]
fn test_registry_lookup() {
    let h = Harness::new();

    let legacy = h.registry.entities_for(SHOPWARE55);
    for entity in LEGACY_ENTITY_ORDER {
        assert!(legacy.contains(entity), "missing converter for {entity}");
    }
    let current = h.registry.entities_for(SHOPWARE6_MAJOR);
    assert!(current.contains(&entities::CMS_PAGE));
    assert!(!current.contains(&entities::CUSTOMER));

    let err = h
        .registry
        .get_converter(&legacy_ctx(entities::PROPERTY_GROUP))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ConvertError::ConverterNotFound { ref entity, .. } if entity == "property_group"
    ));
}
