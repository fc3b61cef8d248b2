use mstorage::mapping::MappingStore;
use mstorage::models::{Mapping, NewMapping};
use serde_json::Value;
use std::sync::Arc;

use crate::context::MigrationContext;
use crate::error::{ConvertError, Result};

/// Connection-scoped view of the Mapping Store used by converters and
/// lookups.
#[derive(Clone)]
pub struct MappingService {
    store: Arc<dyn MappingStore>,
}

impl MappingService {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MappingStore> {
        &self.store
    }

    pub fn get_mapping(
        &self,
        ctx: &MigrationContext,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Option<Mapping>> {
        Ok(self
            .store
            .get_mapping(ctx.connection_id(), entity, old_identifier)?)
    }

    /// Resolved destination id of an existing mapping, if any.
    pub fn get_uuid(
        &self,
        ctx: &MigrationContext,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .get_mapping(ctx, entity, old_identifier)?
            .and_then(|m| m.new_identifier))
    }

    pub fn get_or_create(
        &self,
        ctx: &MigrationContext,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Mapping> {
        self.get_or_create_with(ctx, entity, old_identifier, None, None)
    }

    pub fn get_or_create_with(
        &self,
        ctx: &MigrationContext,
        entity: &str,
        old_identifier: &str,
        satellite: Option<Value>,
        forced_new_identifier: Option<&str>,
    ) -> Result<Mapping> {
        let mut new = NewMapping::new(ctx.connection_id(), entity, old_identifier);
        if let Some(data) = satellite {
            new = new.with_satellite(data);
        }
        if let Some(id) = forced_new_identifier {
            new = new.with_new_identifier(id);
        }
        Ok(self.store.get_or_create_mapping(new)?)
    }

    /// Fails if a mapping for the triple already exists.
    pub fn create(
        &self,
        ctx: &MigrationContext,
        entity: &str,
        old_identifier: &str,
        forced_new_identifier: Option<&str>,
    ) -> Result<Mapping> {
        let mut new = NewMapping::new(ctx.connection_id(), entity, old_identifier);
        if let Some(id) = forced_new_identifier {
            new = new.with_new_identifier(id);
        }
        Ok(self.store.create_mapping(new)?)
    }

    pub fn update_checksum(&self, mapping_id: &str, checksum: &str) -> Result<()> {
        Ok(self.store.update_checksum(mapping_id, checksum)?)
    }
}

/// Destination id carried by a mapping returned from `get_or_create*`,
/// which always resolves it.
pub fn resolved_id(mapping: &Mapping) -> Result<String> {
    mapping.new_identifier.clone().ok_or_else(|| {
        ConvertError::Internal(format!(
            "mapping {} ({}:{}) has no destination id",
            mapping.id, mapping.entity, mapping.old_identifier
        ))
    })
}
