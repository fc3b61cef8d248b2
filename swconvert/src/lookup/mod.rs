//! Resolvers for reference data that already exists in the destination
//! system (languages, countries, taxes, default pages, ...).
//!
//! All lookups share one algorithm:
//! 1. a positive answer memoized in-process for this connection,
//! 2. an existing mapping for `(connection, entity, old id)`,
//! 3. a natural-key search in the destination repository, persisted as a
//!    mapping when it hits,
//! 4. optionally the old id itself, for defaults that are guaranteed to be
//!    pre-seeded under the same id.

mod cms;
mod reference;
mod system;
mod tax;

pub use reference::SYSTEM_LANGUAGE_ID;

use mstorage::errors::StorageError;
use mstorage::target::{Criteria, TargetRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::context::MigrationContext;
use crate::error::Result;
use crate::mapping::{resolved_id, MappingService};

type MemoKey = (String, String, String);

pub(crate) struct LookupRequest<'a> {
    /// Mapping namespace.
    pub entity: &'a str,
    pub old_identifier: &'a str,
    /// Destination table searched on a mapping miss.
    pub target_entity: &'a str,
    pub criteria: Criteria,
    pub fallback_to_old: bool,
}

pub struct Lookups {
    mappings: MappingService,
    target: Arc<dyn TargetRepository>,
    memo: Mutex<HashMap<MemoKey, String>>,
}

impl Lookups {
    pub fn new(mappings: MappingService, target: Arc<dyn TargetRepository>) -> Self {
        Self {
            mappings,
            target,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn target(&self) -> &Arc<dyn TargetRepository> {
        &self.target
    }

    /// Forgets memoized answers; the mapping table is left alone.
    pub fn clear_memo(&self) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.clear();
        }
    }

    fn memo_get(&self, key: &MemoKey) -> Result<Option<String>> {
        let memo = self
            .memo
            .lock()
            .map_err(|_| StorageError::Other(anyhow::anyhow!("lookup memo lock poisoned")))?;
        Ok(memo.get(key).cloned())
    }

    fn memo_put(&self, key: MemoKey, id: &str) -> Result<()> {
        let mut memo = self
            .memo
            .lock()
            .map_err(|_| StorageError::Other(anyhow::anyhow!("lookup memo lock poisoned")))?;
        memo.insert(key, id.to_string());
        Ok(())
    }

    pub(crate) fn resolve(
        &self,
        ctx: &MigrationContext,
        request: LookupRequest<'_>,
    ) -> Result<Option<String>> {
        let key = (
            ctx.connection_id().to_string(),
            request.entity.to_string(),
            request.old_identifier.to_string(),
        );
        if let Some(id) = self.memo_get(&key)? {
            return Ok(Some(id));
        }

        if let Some(id) = self
            .mappings
            .get_uuid(ctx, request.entity, request.old_identifier)?
        {
            self.memo_put(key, &id)?;
            return Ok(Some(id));
        }

        let found = match self
            .target
            .first_id(request.target_entity, &request.criteria)?
        {
            Some(id) => Some(id),
            None if request.fallback_to_old => {
                log::debug!(
                    "{} '{}' not found in destination, reusing the old id",
                    request.entity,
                    request.old_identifier
                );
                Some(request.old_identifier.to_string())
            }
            None => None,
        };

        let Some(found) = found else {
            return Ok(None);
        };

        let mapping = self.mappings.get_or_create_with(
            ctx,
            request.entity,
            request.old_identifier,
            None,
            Some(&found),
        )?;
        let id = resolved_id(&mapping)?;
        self.memo_put(key, &id)?;
        Ok(Some(id))
    }
}
