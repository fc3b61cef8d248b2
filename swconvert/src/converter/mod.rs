//! Converter contract and the per-call scope every converter works in.

pub mod helpers;
pub mod registry;
pub mod shopware;
pub mod shopware6;

use mstorage::log_store::LogSink;
use mstorage::mapping::MappingStore;
use mstorage::models::Mapping;
use mstorage::target::TargetRepository;
use mstorage::utils::id::checksum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::context::MigrationContext;
use crate::error::Result;
use crate::logging::{write_log, MigrationLog};
use crate::lookup::Lookups;
use crate::mapping::{resolved_id, MappingService};
use crate::media::MediaFileService;
use crate::record::RawRecord;

pub use registry::ConverterRegistry;

/// Outcome of converting one source row.
///
/// `converted == None` means the row must not be written; logs written
/// while converting still stand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    pub converted: Option<Value>,
    pub unmapped: Option<Value>,
    pub mapping_id: Option<String>,
}

impl ConversionResult {
    pub fn is_converted(&self) -> bool {
        self.converted.is_some()
    }

    /// Row rejected before any mapping was touched.
    pub fn rejected(record: &RawRecord) -> Self {
        Self {
            converted: None,
            unmapped: Some(record.to_value()),
            mapping_id: None,
        }
    }
}

/// Collaborators shared by all converters.
#[derive(Clone)]
pub struct ConverterServices {
    pub mappings: MappingService,
    pub logger: Arc<dyn LogSink>,
    pub lookups: Arc<Lookups>,
    pub media: Arc<dyn MediaFileService>,
}

impl ConverterServices {
    /// Wires the mapping service and lookups over one mapping store.
    pub fn new(
        store: Arc<dyn MappingStore>,
        logger: Arc<dyn LogSink>,
        target: Arc<dyn TargetRepository>,
        media: Arc<dyn MediaFileService>,
    ) -> Self {
        let mappings = MappingService::new(store);
        let lookups = Arc::new(Lookups::new(mappings.clone(), target));
        Self {
            mappings,
            logger,
            lookups,
            media,
        }
    }
}

pub trait Converter: Send + Sync {
    /// Source profiles this converter handles.
    fn profiles(&self) -> &'static [&'static str];

    /// Entity type this converter handles.
    fn entity(&self) -> &'static str;

    fn supports(&self, ctx: &MigrationContext) -> bool {
        ctx.entity == self.entity() && self.profiles().contains(&ctx.profile_name())
    }

    /// Identifier of the row in the source system.
    fn source_identifier(&self, record: &RawRecord) -> Option<String> {
        record.id("id")
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult>;

    /// Media ids referenced by a batch of converted rows, for converters
    /// whose rows own media.
    fn media_uuids(&self, _converted: &[Value]) -> Option<Vec<String>> {
        None
    }
}

/// Id a row is mapped under. Rows without one are logged as missing their
/// `id` and yield `None`, so no mapping is ever keyed by an empty id.
pub fn require_source_id(
    services: &ConverterServices,
    ctx: &MigrationContext,
    entity: &str,
    source_id: Option<String>,
) -> Result<Option<String>> {
    if source_id.is_none() {
        write_log(
            services.logger.as_ref(),
            ctx,
            MigrationLog::empty_necessary_field(entity, "", "id"),
        )?;
    }
    Ok(source_id)
}

/// State of a single `convert` call: the row's checksum and the main
/// mapping, once established. Lives on the stack so converters stay free of
/// per-call instance state.
pub struct ConvertScope<'a> {
    pub ctx: &'a MigrationContext,
    pub services: &'a ConverterServices,
    pub source_id: String,
    checksum: String,
    main_mapping: Option<Mapping>,
}

impl<'a> ConvertScope<'a> {
    pub fn new(
        services: &'a ConverterServices,
        ctx: &'a MigrationContext,
        record: &RawRecord,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            services,
            source_id: source_id.into(),
            checksum: checksum(&record.to_value()),
            main_mapping: None,
        }
    }

    pub fn lookups(&self) -> &Lookups {
        &self.services.lookups
    }

    pub fn mappings(&self) -> &MappingService {
        &self.services.mappings
    }

    pub fn log(&self, log: MigrationLog) -> Result<()> {
        write_log(self.services.logger.as_ref(), self.ctx, log)
    }

    /// Establishes the main mapping and returns the destination id.
    /// `forced` pins the id when the destination row is already known.
    pub fn main_mapping(
        &mut self,
        entity: &str,
        old_identifier: &str,
        forced: Option<&str>,
    ) -> Result<String> {
        let mapping = self.services.mappings.get_or_create_with(
            self.ctx,
            entity,
            old_identifier,
            None,
            forced,
        )?;
        let id = resolved_id(&mapping)?;
        self.main_mapping = Some(mapping);
        Ok(id)
    }

    pub fn mapping_id(&self) -> Option<String> {
        self.main_mapping.as_ref().map(|m| m.id.clone())
    }

    /// Destination id for `old_identifier`, creating the mapping on first use.
    pub fn get_or_create(&self, entity: &str, old_identifier: &str) -> Result<String> {
        let mapping = self
            .services
            .mappings
            .get_or_create(self.ctx, entity, old_identifier)?;
        resolved_id(&mapping)
    }

    /// Destination id of an existing mapping; never creates one.
    pub fn get_uuid(&self, entity: &str, old_identifier: &str) -> Result<Option<String>> {
        self.services.mappings.get_uuid(self.ctx, entity, old_identifier)
    }

    pub fn get_mapping(&self, entity: &str, old_identifier: &str) -> Result<Option<Mapping>> {
        self.services
            .mappings
            .get_mapping(self.ctx, entity, old_identifier)
    }

    /// Successful conversion. Stores the row checksum on the main mapping.
    pub fn finish(self, converted: Value, unmapped: Option<Value>) -> Result<ConversionResult> {
        if let Some(mapping) = &self.main_mapping {
            self.services
                .mappings
                .update_checksum(&mapping.id, &self.checksum)?;
        }
        Ok(ConversionResult {
            converted: Some(converted),
            unmapped,
            mapping_id: self.mapping_id(),
        })
    }

    /// Aborted conversion; `unmapped` usually carries the whole row.
    pub fn abort(self, unmapped: Option<Value>) -> ConversionResult {
        log::debug!(
            "[{}] {} {} not converted",
            self.ctx.run_id,
            self.ctx.entity,
            self.source_id
        );
        ConversionResult {
            converted: None,
            unmapped,
            mapping_id: self.mapping_id(),
        }
    }
}
