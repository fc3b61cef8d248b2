use mstorage::target::{Criteria, Filter};
use serde_json::Value;

use super::{LookupRequest, Lookups};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;

impl Lookups {
    /// System config row by key and sales channel (`None` = global).
    pub fn system_config(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        configuration_key: &str,
        sales_channel_id: Option<&str>,
    ) -> Result<Option<String>> {
        let sales_channel = sales_channel_id.map_or(Value::Null, |id| Value::from(id));
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::SYSTEM_CONFIG,
                old_identifier,
                target_entity: entities::SYSTEM_CONFIG,
                criteria: Criteria::new().filter(Filter::And(vec![
                    Filter::equals("salesChannelId", sales_channel),
                    Filter::equals("configurationKey", configuration_key),
                ])),
                fallback_to_old: false,
            },
        )
    }

    /// Product sorting by key, returning its id and whether it is locked.
    /// Sortings are matched fresh every time and never mapped.
    pub fn product_sorting(&self, key: &str) -> Result<Option<(String, bool)>> {
        let criteria = Criteria::new().filter(Filter::equals("key", key)).limit(1);
        Ok(self
            .target()
            .search(entities::PRODUCT_SORTING, &criteria)?
            .into_iter()
            .next()
            .map(|record| {
                let locked = record
                    .payload
                    .get("locked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (record.id, locked)
            }))
    }

    pub fn state_machine_state(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        technical_name: &str,
        state_machine_technical_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::STATE_MACHINE_STATE,
                old_identifier,
                target_entity: entities::STATE_MACHINE_STATE,
                criteria: Criteria::new()
                    .filter(Filter::equals("technicalName", technical_name))
                    .filter(Filter::equals(
                        "stateMachine.technicalName",
                        state_machine_technical_name,
                    )),
                fallback_to_old: false,
            },
        )
    }

    /// Global base config of a document type. Falls back to the old id.
    pub fn document_base_config(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        document_type_id: &str,
    ) -> Result<String> {
        let id = self.resolve(
            ctx,
            LookupRequest {
                entity: entities::ORDER_DOCUMENT_BASE_CONFIG,
                old_identifier,
                target_entity: entities::DOCUMENT_BASE_CONFIG,
                criteria: Criteria::new()
                    .filter(Filter::equals("global", true))
                    .filter(Filter::equals("documentTypeId", document_type_id)),
                fallback_to_old: true,
            },
        )?;
        Ok(id.unwrap_or_else(|| old_identifier.to_string()))
    }

    /// Document type by technical name (`invoice`, `delivery_note`, ...).
    pub fn document_type(
        &self,
        ctx: &MigrationContext,
        technical_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::ORDER_DOCUMENT_TYPE,
                old_identifier: technical_name,
                target_entity: entities::DOCUMENT_TYPE,
                criteria: Criteria::new().filter(Filter::equals("technicalName", technical_name)),
                fallback_to_old: false,
            },
        )
    }

    /// System default template of a mail template type. Falls back to the
    /// old id.
    pub fn system_default_mail_template(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        mail_template_type_id: &str,
    ) -> Result<String> {
        let id = self.resolve(
            ctx,
            LookupRequest {
                entity: entities::MAIL_TEMPLATE,
                old_identifier,
                target_entity: entities::MAIL_TEMPLATE,
                criteria: Criteria::new()
                    .filter(Filter::equals("systemDefault", true))
                    .filter(Filter::equals("mailTemplateTypeId", mail_template_type_id)),
                fallback_to_old: true,
            },
        )?;
        Ok(id.unwrap_or_else(|| old_identifier.to_string()))
    }

    pub fn mail_template_type(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        technical_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::MAIL_TEMPLATE_TYPE,
                old_identifier,
                target_entity: entities::MAIL_TEMPLATE_TYPE,
                criteria: Criteria::new().filter(Filter::equals("technicalName", technical_name)),
                fallback_to_old: false,
            },
        )
    }

    pub fn number_range_type(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        technical_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::NUMBER_RANGE_TYPE,
                old_identifier,
                target_entity: entities::NUMBER_RANGE_TYPE,
                criteria: Criteria::new().filter(Filter::equals("technicalName", technical_name)),
                fallback_to_old: false,
            },
        )
    }
}
