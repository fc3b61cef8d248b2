use mstorage::models::TargetRecord;
use mstorage::target::{Criteria, Filter};
use serde_json::Value;
use std::collections::BTreeSet;

use super::{LookupRequest, Lookups};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::mapping::resolved_id;

/// Translated names of a destination cms page.
fn page_names(record: &TargetRecord) -> BTreeSet<String> {
    record
        .payload
        .get("translations")
        .and_then(Value::as_array)
        .map(|translations| {
            translations
                .iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn name_set(names: &[String]) -> BTreeSet<String> {
    names.iter().cloned().collect()
}

impl Lookups {
    /// The locked product listing layout every category falls back to.
    pub fn default_cms_page(&self, ctx: &MigrationContext) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::DEFAULT_CMS_PAGE,
                old_identifier: entities::DEFAULT_CMS_PAGE,
                target_entity: entities::CMS_PAGE,
                criteria: Criteria::new()
                    .filter(Filter::equals("locked", true))
                    .filter(Filter::equals("type", "product_list")),
                fallback_to_old: false,
            },
        )
    }

    /// Unlocked page whose translated names are exactly `names`. Unlocked
    /// pages are user content and are matched fresh each time.
    pub fn cms_page_by_names(&self, names: &[String]) -> Result<Option<String>> {
        if names.is_empty() {
            return Ok(None);
        }
        let wanted = name_set(names);
        let criteria = Criteria::new().filter(Filter::equals("locked", false));
        Ok(self
            .target()
            .search(entities::CMS_PAGE, &criteria)?
            .into_iter()
            .find(|record| page_names(record) == wanted)
            .map(|record| record.id))
    }

    /// Locked system page of `page_type` whose translated names are exactly
    /// `names`. A hit is persisted as the `cms_page` mapping of
    /// `old_identifier`.
    pub fn map_locked_cms_page(
        &self,
        ctx: &MigrationContext,
        names: &[String],
        page_type: &str,
        old_identifier: &str,
    ) -> Result<Option<String>> {
        if let Some(id) = self.mappings.get_uuid(ctx, entities::CMS_PAGE, old_identifier)? {
            return Ok(Some(id));
        }
        if names.is_empty() {
            return Ok(None);
        }
        let wanted = name_set(names);
        let criteria = Criteria::new()
            .filter(Filter::equals("locked", true))
            .filter(Filter::equals("type", page_type));
        let found = self
            .target()
            .search(entities::CMS_PAGE, &criteria)?
            .into_iter()
            .find(|record| page_names(record) == wanted);
        let Some(found) = found else {
            return Ok(None);
        };
        let mapping = self.mappings.get_or_create_with(
            ctx,
            entities::CMS_PAGE,
            old_identifier,
            None,
            Some(&found.id),
        )?;
        Ok(Some(resolved_id(&mapping)?))
    }
}
