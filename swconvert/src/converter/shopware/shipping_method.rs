//! Dispatch methods (`s_premium_dispatch`) with their cost tiers and the
//! extended dispatch settings, which become an availability rule.

use mstorage::utils::id::stable_child_id;
use serde_json::{json, Map, Value};

use super::language_id;
use crate::converter::helpers::{attribute_custom_fields, format_time_of_day, round_to};
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::{Field, RawRecord, Working};

/// Destination price calculation types.
const CALCULATION_QUANTITY: i64 = 1;
const CALCULATION_PRICE: i64 = 2;
const CALCULATION_WEIGHT: i64 = 3;

const DISCARDED_FIELDS: &[&str] = &[
    "type",
    "comment",
    "surcharge_calculation",
    "shippingfree",
    "multishopID",
    "customergroupID",
    "bind_instock",
    "bind_sql",
    "calculation_sql",
    "changed",
];

pub struct ShippingMethodConverter {
    services: ConverterServices,
}

impl ShippingMethodConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

/// Legacy calculation code to destination type; `None` for codes without
/// an equivalent.
fn map_calculation(legacy: &str) -> Option<i64> {
    match legacy {
        "0" => Some(CALCULATION_WEIGHT),
        "1" => Some(CALCULATION_PRICE),
        "2" => Some(CALCULATION_QUANTITY),
        _ => None,
    }
}

/// Gap between one tier's end and the next tier's start.
fn quantity_end_difference(calculation: i64) -> f64 {
    match calculation {
        CALCULATION_PRICE => 0.01,
        CALCULATION_WEIGHT => 0.001,
        _ => 1.0,
    }
}

/// Days covered by a weekday range. A range running past Sunday wraps into
/// two runs: `1..=to` and `from..=7`.
pub(crate) fn weekdays(from: Option<i64>, to: Option<i64>) -> Vec<i64> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => (1..=to).chain(from..=7).collect(),
        (Some(from), Some(to)) => (from..=to).collect(),
        (Some(from), None) => (from..=7).collect(),
        (None, Some(to)) => (1..=to).collect(),
        (None, None) => Vec::new(),
    }
}

impl Converter for ShippingMethodConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::SHIPPING_METHOD
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        if record.field("name").is_blank() {
            scope.log(MigrationLog::empty_necessary_field(
                entities::SHIPPING_METHOD,
                &source_id,
                "name",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        }

        let Some(delivery_time_id) =
            scope.get_uuid(entities::DEFAULT_DELIVERY_TIME, entities::DEFAULT_DELIVERY_TIME)?
        else {
            scope.log(MigrationLog::entity_unknown(
                entities::DELIVERY_TIME,
                entities::DEFAULT_DELIVERY_TIME,
                entities::SHIPPING_METHOD,
                &source_id,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let shipping_method_id = scope.main_mapping(entities::SHIPPING_METHOD, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id"]);
        data.discard(DISCARDED_FIELDS);

        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;

        let mut out = Map::new();
        out.insert("id".into(), Value::String(shipping_method_id.clone()));
        out.insert("active".into(), Value::Bool(data.take_bool("active")));
        out.insert("deliveryTimeId".into(), Value::String(delivery_time_id));
        if let Some(position) = data.take_i64("position") {
            out.insert("position".into(), Value::from(position));
        }

        match data.take_id("tax_calculation").filter(|t| t != "0") {
            Some(tax) => {
                out.insert("taxType".into(), Value::String("fixed".into()));
                if let Some(tax_id) = scope.get_uuid(entities::TAX, &tax)? {
                    out.insert("taxId".into(), Value::String(tax_id));
                }
            }
            None => {
                out.insert("taxType".into(), Value::String("auto".into()));
            }
        }

        let legacy_calculation = data.take_id("calculation").unwrap_or_default();
        let calculation = match map_calculation(&legacy_calculation) {
            Some(calculation) => calculation,
            None => {
                scope.log(MigrationLog::unsupported_shipping_calculation(
                    entities::SHIPPING_METHOD,
                    &source_id,
                    &legacy_calculation,
                ))?;
                CALCULATION_QUANTITY
            }
        };

        let costs = data.take_array("shippingCosts").unwrap_or_default();
        let prices = convert_prices(&scope, &costs, &shipping_method_id, calculation)?;
        out.insert("prices".into(), Value::Array(prices));

        let mut translation = Map::new();
        translation.insert("shippingMethodId".into(), Value::String(shipping_method_id.clone()));
        translation.insert("languageId".into(), Value::String(language.clone()));
        let name = data.take_text("name").unwrap_or_default();
        translation.insert("name".into(), Value::String(name.clone()));
        if let Some(description) = data.take_text("description") {
            translation.insert("description".into(), Value::String(description));
        }
        if let Some(tracking) = data.take_text("status_link") {
            translation.insert("trackingUrl".into(), Value::String(tracking));
        }
        if let Some(attributes) = data.take_object("attributes") {
            if let Some(fields) = attribute_custom_fields(
                &scope,
                entities::SHIPPING_METHOD,
                &attributes,
                &["id", "dispatchID"],
            )? {
                translation.insert("customFields".into(), Value::Object(fields));
            }
        }
        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));
        out.insert("translations".into(), Value::Object(translations));

        match availability_rule(&scope, &mut data, &shipping_method_id, &name)? {
            Some(rule) => {
                out.insert("availabilityRule".into(), rule);
            }
            None => {
                let default_rule = scope.get_uuid(
                    entities::DEFAULT_SHIPPING_AVAILABILITY_RULE,
                    entities::DEFAULT_SHIPPING_AVAILABILITY_RULE,
                )?;
                let Some(rule_id) = default_rule else {
                    scope.log(MigrationLog::entity_unknown(
                        entities::RULE,
                        entities::DEFAULT_SHIPPING_AVAILABILITY_RULE,
                        entities::SHIPPING_METHOD,
                        &source_id,
                    ))?;
                    return Ok(scope.abort(Some(record.to_value())));
                };
                out.insert("availabilityRuleId".into(), Value::String(rule_id));
            }
        }

        scope.finish(Value::Object(out), data.into_unmapped())
    }
}

fn convert_prices(
    scope: &ConvertScope<'_>,
    costs: &[Value],
    shipping_method_id: &str,
    calculation: i64,
) -> Result<Vec<Value>> {
    let mut prices = Vec::with_capacity(costs.len());
    for (index, cost) in costs.iter().enumerate() {
        let field = |key: &str| Field::from_option(cost.get(key));
        let Some(cost_id) = field("id").as_id() else {
            continue;
        };

        let iso = field("currencyShortName").as_text().unwrap_or("EUR");
        let Some(currency_id) = scope.lookups().currency(scope.ctx, iso)? else {
            scope.log(MigrationLog::entity_unknown(
                entities::CURRENCY,
                iso,
                entities::SHIPPING_METHOD_PRICE,
                &cost_id,
            ))?;
            continue;
        };

        if field("factor").as_f64().unwrap_or(0.0) != 0.0 {
            scope.log(MigrationLog::unsupported_shipping_price(
                entities::SHIPPING_METHOD_PRICE,
                &cost_id,
                &scope.source_id,
            ))?;
        }

        let value = field("value").as_f64().unwrap_or(0.0);
        let mut price = json!({
            "id": scope.get_or_create(entities::SHIPPING_METHOD_PRICE, &cost_id)?,
            "shippingMethodId": shipping_method_id,
            "calculation": calculation,
            "quantityStart": field("from").as_f64().unwrap_or(0.0),
            "currencyPrice": [{
                "currencyId": currency_id,
                "net": value,
                "gross": value,
                "linked": false,
            }],
        });
        let next_from = costs
            .get(index + 1)
            .and_then(|next| Field::from_option(next.get("from")).as_f64());
        if let Some(next_from) = next_from {
            price["quantityEnd"] =
                Value::from(round_to(next_from - quantity_end_difference(calculation), 3));
        }
        prices.push(price);
    }
    Ok(prices)
}

/// Builds conditions inside one rule: `orContainer > andContainer > ...`.
struct RuleBuilder {
    rule_id: String,
    and_id: String,
    children: Vec<Value>,
}

impl RuleBuilder {
    fn new(rule_id: String) -> Self {
        let and_id = stable_child_id(&rule_id, "andContainer", &[]);
        Self {
            rule_id,
            and_id,
            children: Vec::new(),
        }
    }

    fn condition_id(&self, kind: &str, discriminator: String) -> String {
        stable_child_id(
            &self.rule_id,
            kind,
            &[("position", self.children.len().to_string()), ("key", discriminator)],
        )
    }

    fn push(&mut self, kind: &str, value: Option<Value>) {
        let id = self.condition_id(kind, String::new());
        let mut condition = json!({
            "id": id,
            "type": kind,
            "ruleId": self.rule_id,
            "parentId": self.and_id,
            "position": self.children.len(),
        });
        if let Some(value) = value {
            condition["value"] = value;
        }
        self.children.push(condition);
    }

    fn push_weekdays(&mut self, days: &[i64]) {
        let container_id = self.condition_id("orContainer", "weekdays".to_string());
        let days: Vec<Value> = days
            .iter()
            .enumerate()
            .map(|(position, day)| {
                json!({
                    "id": stable_child_id(&container_id, "dayOfWeek", &[("day", day.to_string())]),
                    "type": "dayOfWeek",
                    "ruleId": self.rule_id,
                    "parentId": container_id,
                    "position": position,
                    "value": { "operator": "=", "dayOfWeek": day },
                })
            })
            .collect();
        self.children.push(json!({
            "id": container_id,
            "type": "orContainer",
            "ruleId": self.rule_id,
            "parentId": self.and_id,
            "position": self.children.len(),
            "children": days,
        }));
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn build(self, name: &str) -> Value {
        let or_id = stable_child_id(&self.rule_id, "orContainer", &[]);
        json!({
            "id": self.rule_id,
            "name": name,
            "priority": 100,
            "moduleTypes": { "types": ["shipping"] },
            "conditions": [{
                "id": or_id,
                "type": "orContainer",
                "ruleId": self.rule_id,
                "position": 0,
                "children": [{
                    "id": self.and_id,
                    "type": "andContainer",
                    "ruleId": self.rule_id,
                    "parentId": or_id,
                    "position": 0,
                    "children": self.children,
                }],
            }],
        })
    }
}

/// Rule equivalent of the extended dispatch settings, `None` when the
/// method has none.
fn availability_rule(
    scope: &ConvertScope<'_>,
    data: &mut Working,
    shipping_method_id: &str,
    shipping_method_name: &str,
) -> Result<Option<Value>> {
    let mut rule = RuleBuilder::new(stable_child_id(shipping_method_id, "availabilityRule", &[]));

    let day = |value: Option<i64>| value.filter(|d| (1..=7).contains(d));
    let days = weekdays(
        day(data.take_i64("bind_weekday_from")),
        day(data.take_i64("bind_weekday_to")),
    );
    if !days.is_empty() {
        rule.push_weekdays(&days);
    }

    let time_from = data.take_i64("bind_time_from");
    let time_to = data.take_i64("bind_time_to");
    if time_from.is_some() || time_to.is_some() {
        let from = time_from.map_or_else(|| "00:00".to_string(), format_time_of_day);
        let to = time_to.map_or_else(|| "23:59".to_string(), format_time_of_day);
        rule.push("timeRange", Some(json!({ "fromTime": from, "toTime": to })));
    }

    if data.take_bool("bind_laststock") {
        rule.push(
            "cartLineItemClearanceSale",
            Some(json!({ "clearanceSale": true })),
        );
    }

    for (key, operator) in [("bind_weight_from", ">="), ("bind_weight_to", "<=")] {
        if let Some(weight) = data.take_f64(key) {
            rule.push(
                "cartWeight",
                Some(json!({ "operator": operator, "weight": weight })),
            );
        }
    }

    for (key, operator) in [("bind_price_from", ">="), ("bind_price_to", "<=")] {
        if let Some(amount) = data.take_f64(key) {
            rule.push(
                "cartLineItemTotalPrice",
                Some(json!({ "operator": operator, "amount": amount })),
            );
        }
    }

    let mut country_ids = Vec::new();
    for country in data.take_array("shippingCountries").unwrap_or_default() {
        let field = |key: &str| Field::from_option(country.get(key));
        let (Some(iso), Some(iso3)) = (field("countryiso").as_text(), field("iso3").as_text()) else {
            continue;
        };
        let old_id = field("countryID")
            .as_id()
            .unwrap_or_else(|| format!("{iso}-{iso3}"));
        if let Some(id) = scope.lookups().country(scope.ctx, &old_id, iso, iso3)? {
            country_ids.push(Value::String(id));
        }
    }
    if !country_ids.is_empty() {
        rule.push(
            "customerShippingCountry",
            Some(json!({ "operator": "=", "countryIds": country_ids })),
        );
    }

    let payment_ids = mapped_ids(scope, data.take_array("paymentMethods"), entities::PAYMENT_METHOD)?;
    if !payment_ids.is_empty() {
        rule.push(
            "paymentMethod",
            Some(json!({ "operator": "=", "paymentMethodIds": payment_ids })),
        );
    }

    let category_ids = mapped_ids(scope, data.take_array("excludedCategories"), entities::CATEGORY)?;
    if !category_ids.is_empty() {
        rule.push(
            "cartLineItemInCategory",
            Some(json!({ "operator": "!=", "categoryIds": category_ids })),
        );
    }

    if data.take_bool("bind_shippingfree") {
        rule.push("cartHasDeliveryFreeItem", None);
    }

    if rule.is_empty() {
        return Ok(None);
    }
    Ok(Some(rule.build(&format!("{shipping_method_name} availability"))))
}

/// Destination ids of a list of legacy ids (plain or `{"id": ..}`), skipping
/// unmapped ones.
fn mapped_ids(scope: &ConvertScope<'_>, items: Option<Vec<Value>>, entity: &str) -> Result<Vec<Value>> {
    let mut ids = Vec::new();
    for item in items.unwrap_or_default() {
        let old = match &item {
            Value::Object(map) => Field::from_option(map.get("id")).as_id(),
            other => Field::from_option(Some(other)).as_id(),
        };
        let Some(old) = old else {
            continue;
        };
        if let Some(id) = scope.get_uuid(entity, &old)? {
            ids.push(Value::String(id));
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_ranges() {
        assert_eq!(weekdays(Some(1), Some(5)), vec![1, 2, 3, 4, 5]);
        assert_eq!(weekdays(Some(5), Some(2)), vec![1, 2, 5, 6, 7]);
        assert_eq!(weekdays(Some(6), None), vec![6, 7]);
        assert_eq!(weekdays(None, Some(2)), vec![1, 2]);
        assert!(weekdays(None, None).is_empty());
    }

    #[test]
    fn test_calculation_mapping() {
        assert_eq!(map_calculation("0"), Some(CALCULATION_WEIGHT));
        assert_eq!(map_calculation("1"), Some(CALCULATION_PRICE));
        assert_eq!(map_calculation("2"), Some(CALCULATION_QUANTITY));
        assert_eq!(map_calculation("3"), None);
        assert_eq!(map_calculation("5"), None);
    }
}
