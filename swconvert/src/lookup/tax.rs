use mstorage::target::{Criteria, Filter};

use super::{LookupRequest, Lookups};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;

impl Lookups {
    /// Tax by rate, narrowed by name when the source provides one.
    pub fn tax(
        &self,
        ctx: &MigrationContext,
        source_id: &str,
        tax_rate: f64,
        name: Option<&str>,
    ) -> Result<Option<String>> {
        let mut criteria = Criteria::new().filter(Filter::equals("taxRate", tax_rate));
        if let Some(name) = name {
            criteria = criteria.filter(Filter::equals("name", name));
        }
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::TAX,
                old_identifier: source_id,
                target_entity: entities::TAX,
                criteria,
                fallback_to_old: false,
            },
        )
    }

    pub fn tax_rule(
        &self,
        ctx: &MigrationContext,
        source_id: &str,
        tax_id: &str,
        country_id: &str,
        tax_rule_type_id: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::TAX_RULE,
                old_identifier: source_id,
                target_entity: entities::TAX_RULE,
                criteria: Criteria::new()
                    .filter(Filter::equals("taxId", tax_id))
                    .filter(Filter::equals("countryId", country_id))
                    .filter(Filter::equals("taxRuleTypeId", tax_rule_type_id)),
                fallback_to_old: false,
            },
        )
    }

    pub fn tax_rule_type(
        &self,
        ctx: &MigrationContext,
        source_id: &str,
        technical_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::TAX_RULE_TYPE,
                old_identifier: source_id,
                target_entity: entities::TAX_RULE_TYPE,
                criteria: Criteria::new().filter(Filter::equals("technicalName", technical_name)),
                fallback_to_old: false,
            },
        )
    }
}
