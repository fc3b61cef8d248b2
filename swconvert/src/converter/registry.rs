use std::sync::Arc;

use super::{shopware, shopware6, Converter, ConverterServices};
use crate::context::MigrationContext;
use crate::error::{ConvertError, Result};

/// Picks the converter for a (profile, entity) pair.
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new(converters: Vec<Arc<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// Registry holding every built-in converter.
    pub fn with_defaults(services: ConverterServices) -> Self {
        let mut converters = shopware::converters(&services);
        converters.extend(shopware6::converters(&services));
        Self::new(converters)
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    /// First registered converter supporting `ctx`.
    pub fn get_converter(&self, ctx: &MigrationContext) -> Result<Arc<dyn Converter>> {
        self.converters
            .iter()
            .find(|c| c.supports(ctx))
            .cloned()
            .ok_or_else(|| ConvertError::ConverterNotFound {
                profile: ctx.profile_name().to_string(),
                entity: ctx.entity.clone(),
            })
    }

    /// Entity types with at least one converter for `profile`.
    pub fn entities_for(&self, profile: &str) -> Vec<&'static str> {
        let mut entities: Vec<&'static str> = self
            .converters
            .iter()
            .filter(|c| c.profiles().contains(&profile))
            .map(|c| c.entity())
            .collect();
        entities.sort_unstable();
        entities.dedup();
        entities
    }
}
