//! Conversion and identity-mapping engine for storefront migrations.
//!
//! Rows read from a source system ([`gateway::Gateway`]) are turned into
//! destination payloads by per-entity [`converter::Converter`]s. Every
//! foreign key goes through the persistent old id → new id mapping table
//! ([`mapping::MappingService`]) or a lookup of reference data already
//! present in the destination ([`lookup::Lookups`]); every anomaly is written
//! to a reviewable log ([`logging::MigrationLog`]).

pub mod context;
pub mod converter;
pub mod entities;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod lookup;
pub mod mapping;
pub mod media;
pub mod profile;
pub mod record;
pub mod runner;
pub mod serialized;

pub use context::{Connection, MigrationContext};
pub use converter::{ConversionResult, Converter, ConverterRegistry, ConverterServices};
pub use error::{ConvertError, Result};
pub use record::RawRecord;
pub use runner::{MigrationRunner, RunReport};
