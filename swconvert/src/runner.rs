//! Drives a migration run: pages through the gateway entity by entity,
//! converts every row and records the outcome in the catalog.

use mstorage::catalog::Catalog;
use mstorage::models::MigrationData;
use mstorage::utils::id::checksum;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::context::MigrationContext;
use crate::converter::ConverterRegistry;
use crate::entities;
use crate::error::{ConvertError, Result};
use crate::gateway::Gateway;
use crate::profile::{ProfileRegistry, SourceFamily};

/// Conversion order of legacy entities; later entities read mappings
/// created by earlier ones.
pub const LEGACY_ENTITY_ORDER: &[&str] = &[
    entities::CUSTOMER_GROUP,
    entities::CURRENCY,
    entities::CATEGORY,
    entities::PRODUCT,
    entities::CUSTOMER,
    entities::SHIPPING_METHOD,
    entities::TRANSLATION,
    entities::ORDER_DOCUMENT,
];

pub const CURRENT_ENTITY_ORDER: &[&str] = &[
    entities::CURRENCY,
    entities::SALUTATION,
    entities::TAX,
    entities::PRODUCT_MANUFACTURER,
    entities::CMS_PAGE,
    entities::PAGE_SYSTEM_CONFIG,
    entities::PRODUCT_STREAM,
    entities::MAIL_TEMPLATE,
    entities::NUMBER_RANGE,
    entities::DOCUMENT_INHERITANCE,
];

/// Counters for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityReport {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub media: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub entities: BTreeMap<String, EntityReport>,
}

pub struct MigrationRunner<'a> {
    registry: &'a ConverterRegistry,
    catalog: Option<&'a Catalog>,
    page_size: usize,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(registry: &'a ConverterRegistry) -> Self {
        Self {
            registry,
            catalog: None,
            page_size: 250,
        }
    }

    /// Persist raw, converted and unmapped payloads of every row.
    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Entity order for the profile of `ctx`.
    pub fn entity_order(ctx: &MigrationContext) -> Result<&'static [&'static str]> {
        let profile = ProfileRegistry::get_profile(ctx.profile_name())?;
        Ok(match profile.family {
            SourceFamily::Legacy => LEGACY_ENTITY_ORDER,
            SourceFamily::Current => CURRENT_ENTITY_ORDER,
        })
    }

    /// Converts every entity the gateway offers, in dependency order.
    /// A row whose conversion fails is logged and counted; the run goes on.
    pub fn run(&self, gateway: &dyn Gateway, ctx: &MigrationContext) -> Result<RunReport> {
        let mut report = RunReport {
            run_id: ctx.run_id.clone(),
            entities: BTreeMap::new(),
        };
        for entity in Self::entity_order(ctx)? {
            let total = gateway.read_total(entity)?;
            if total == 0 {
                continue;
            }
            let entity_report = self.run_entity(gateway, &ctx.for_entity(entity), total)?;
            report.entities.insert(entity.to_string(), entity_report);
        }
        Ok(report)
    }

    fn run_entity(
        &self,
        gateway: &dyn Gateway,
        ctx: &MigrationContext,
        total: usize,
    ) -> Result<EntityReport> {
        let mut report = EntityReport {
            total,
            ..EntityReport::default()
        };
        let converter = match self.registry.get_converter(ctx) {
            Ok(converter) => converter,
            Err(ConvertError::ConverterNotFound { profile, entity }) => {
                log::warn!("no converter for {entity} in profile {profile}, skipping {total} rows");
                report.skipped = total;
                return Ok(report);
            }
            Err(err) => return Err(err),
        };
        log::info!("[{}] converting {} {} rows", ctx.run_id, total, ctx.entity);

        let mut offset = 0;
        while offset < total {
            let page_ctx = ctx.clone().with_page(offset, self.page_size);
            let rows = gateway.read(&ctx.entity, self.page_size, offset)?;
            if rows.is_empty() {
                break;
            }
            offset += rows.len();

            let mut converted_page: Vec<Value> = Vec::new();
            for row in &rows {
                let source_id = converter.source_identifier(row);
                match converter.convert(row, &page_ctx) {
                    Ok(result) => {
                        if let Some(converted) = &result.converted {
                            report.converted += 1;
                            converted_page.push(converted.clone());
                        } else {
                            report.skipped += 1;
                        }
                        if let Some(catalog) = self.catalog {
                            let raw = row.to_value();
                            catalog.insert_migration_data(&MigrationData {
                                run_id: ctx.run_id.clone(),
                                entity: ctx.entity.clone(),
                                source_id,
                                checksum: Some(checksum(&raw)),
                                raw,
                                converted: result.converted,
                                unmapped: result.unmapped,
                                mapping_id: result.mapping_id,
                            })?;
                        }
                    }
                    Err(err) => {
                        report.failed += 1;
                        log::error!(
                            "[{}] {} {}: {err}",
                            ctx.run_id,
                            ctx.entity,
                            source_id.as_deref().unwrap_or("?")
                        );
                    }
                }
            }
            if let Some(media) = converter.media_uuids(&converted_page) {
                report.media += media.len();
            }
        }

        log::info!(
            "[{}] {}: {} converted, {} skipped, {} failed",
            ctx.run_id,
            ctx.entity,
            report.converted,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
