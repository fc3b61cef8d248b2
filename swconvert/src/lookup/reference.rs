use mstorage::target::{Criteria, Filter};

use super::{LookupRequest, Lookups};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;

/// Id of the destination system's built-in default language.
pub const SYSTEM_LANGUAGE_ID: &str = "2fbb5fe2e29a4d70aa5854ce7ce3e20b";

impl Lookups {
    /// Language by locale code (`de-DE`).
    pub fn language(&self, ctx: &MigrationContext, locale_code: &str) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::LANGUAGE,
                old_identifier: locale_code,
                target_entity: entities::LANGUAGE,
                criteria: Criteria::new().filter(Filter::equals("locale.code", locale_code)),
                fallback_to_old: false,
            },
        )
    }

    /// Locale code of a destination language.
    pub fn language_locale(&self, language_id: &str) -> Result<Option<String>> {
        Ok(self
            .target()
            .get(entities::LANGUAGE, language_id)?
            .and_then(|record| {
                record
                    .payload
                    .pointer("/locale/code")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            }))
    }

    /// Country by source id, matched on ISO alpha-2 and alpha-3 codes.
    pub fn country(
        &self,
        ctx: &MigrationContext,
        source_id: &str,
        iso: &str,
        iso3: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::COUNTRY,
                old_identifier: source_id,
                target_entity: entities::COUNTRY,
                criteria: Criteria::new()
                    .filter(Filter::equals("iso", iso))
                    .filter(Filter::equals("iso3", iso3)),
                fallback_to_old: false,
            },
        )
    }

    /// Country by ISO codes alone, for rows that carry no country id.
    pub fn country_by_iso(
        &self,
        ctx: &MigrationContext,
        iso: &str,
        iso3: &str,
    ) -> Result<Option<String>> {
        self.country(ctx, &format!("{iso}-{iso3}"), iso, iso3)
    }

    /// Country state by source id, matched on the composite short code
    /// `<country iso>-<state code>` (`DE-NW`).
    pub fn country_state(
        &self,
        ctx: &MigrationContext,
        source_id: &str,
        country_iso: &str,
        state_code: &str,
    ) -> Result<Option<String>> {
        let short_code = format!("{country_iso}-{state_code}");
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::COUNTRY_STATE,
                old_identifier: source_id,
                target_entity: entities::COUNTRY_STATE,
                criteria: Criteria::new().filter(Filter::equals("shortCode", short_code.as_str())),
                fallback_to_old: false,
            },
        )
    }

    pub fn currency(&self, ctx: &MigrationContext, iso_code: &str) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::CURRENCY,
                old_identifier: iso_code,
                target_entity: entities::CURRENCY,
                criteria: Criteria::new().filter(Filter::equals("isoCode", iso_code)),
                fallback_to_old: false,
            },
        )
    }

    pub fn salutation(
        &self,
        ctx: &MigrationContext,
        old_identifier: &str,
        salutation_key: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::SALUTATION,
                old_identifier,
                target_entity: entities::SALUTATION,
                criteria: Criteria::new().filter(Filter::equals("salutationKey", salutation_key)),
                fallback_to_old: false,
            },
        )
    }

    pub fn delivery_time(
        &self,
        ctx: &MigrationContext,
        min: i64,
        max: i64,
        unit: &str,
    ) -> Result<Option<String>> {
        let key = format!("{min}-{max}-{unit}");
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::DELIVERY_TIME,
                old_identifier: &key,
                target_entity: entities::DELIVERY_TIME,
                criteria: Criteria::new()
                    .filter(Filter::equals("min", min))
                    .filter(Filter::equals("max", max))
                    .filter(Filter::equals("unit", unit)),
                fallback_to_old: false,
            },
        )
    }

    /// Default media folder configured for an entity (`product`, `category`).
    pub fn media_default_folder(
        &self,
        ctx: &MigrationContext,
        entity_name: &str,
    ) -> Result<Option<String>> {
        self.resolve(
            ctx,
            LookupRequest {
                entity: entities::MEDIA_DEFAULT_FOLDER,
                old_identifier: entity_name,
                target_entity: entities::MEDIA_DEFAULT_FOLDER,
                criteria: Criteria::new().filter(Filter::equals("entity", entity_name)),
                fallback_to_old: false,
            },
        )
    }
}
