use serde_json::{Map, Value};

use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::CURRENT_PROFILES;
use crate::record::{Field, RawRecord};

/// Taxes with their country rules. A tax is matched by rate and name; each
/// rule by tax, country and rule type.
pub struct TaxConverter {
    services: ConverterServices,
}

impl TaxConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for TaxConverter {
    fn profiles(&self) -> &'static [&'static str] {
        CURRENT_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::TAX
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let existing = match record.field("taxRate").as_f64() {
            Some(rate) => scope.lookups().tax(
                ctx,
                &source_id,
                rate,
                record.field("name").as_text(),
            )?,
            None => None,
        };
        let tax_id = existing.unwrap_or_else(|| source_id.clone());
        let tax_id = scope.main_mapping(entities::TAX, &source_id, Some(&tax_id))?;

        let mut converted = record.as_map().clone();
        converted.insert("id".into(), Value::String(tax_id.clone()));

        if let Some(rules) = converted.remove("rules") {
            let mut kept = Vec::new();
            for rule in rules.as_array().into_iter().flatten() {
                if let Some(rule) = rule.as_object() {
                    if let Some(rule) = convert_rule(&scope, rule, &tax_id)? {
                        kept.push(Value::Object(rule));
                    }
                }
            }
            if !kept.is_empty() {
                converted.insert("rules".into(), Value::Array(kept));
            }
        }

        scope.finish(Value::Object(converted), None)
    }
}

/// `None` when the rule's type is unknown to the destination.
fn convert_rule(
    scope: &ConvertScope<'_>,
    rule: &Map<String, Value>,
    tax_id: &str,
) -> Result<Option<Map<String, Value>>> {
    let field = |key: &str| Field::from_option(rule.get(key));
    let Some(rule_id) = field("id").as_id() else {
        return Ok(None);
    };
    let old_type_id = field("taxRuleTypeId").as_id().unwrap_or_default();
    let type_id = match field("type").get("technicalName").as_text() {
        Some(technical_name) => {
            scope
                .lookups()
                .tax_rule_type(scope.ctx, &old_type_id, technical_name)?
        }
        None => None,
    };
    let Some(type_id) = type_id else {
        scope.log(MigrationLog::association_required_missing(
            entities::TAX_RULE,
            &rule_id,
            entities::TAX_RULE_TYPE,
        ))?;
        return Ok(None);
    };

    // Countries are shared reference data and keep their id when unmapped.
    let old_country = field("countryId").as_id().unwrap_or_default();
    let country_id = scope
        .get_uuid(entities::COUNTRY, &old_country)?
        .unwrap_or(old_country);

    let rule_id = scope
        .lookups()
        .tax_rule(scope.ctx, &rule_id, tax_id, &country_id, &type_id)?
        .unwrap_or(rule_id);

    let mut converted = rule.clone();
    converted.remove("type");
    converted.insert("id".into(), Value::String(rule_id));
    converted.insert("taxId".into(), Value::String(tax_id.to_string()));
    converted.insert("countryId".into(), Value::String(country_id));
    converted.insert("taxRuleTypeId".into(), Value::String(type_id));
    Ok(Some(converted))
}
