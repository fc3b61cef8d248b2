//! Legacy products. A row is one article detail; `kind == 1` marks the
//! main detail, which becomes the parent product, every other detail a
//! variant below it.

use mstorage::utils::id::stable_child_id;
use serde_json::{json, Map, Value};

use super::{convert_media, language_id};
use crate::converter::helpers::{attribute_custom_fields, round_to};
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::{Field, RawRecord, Working};

const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_CUSTOMER_GROUP: &str = "EK";

const DISCARDED_FIELDS: &[&str] = &[
    "id",
    "articleID",
    "ordernumber",
    "kind",
    "taxID",
    "supplierID",
    "unitID",
    "additionaltext",
    "changetime",
    "datum",
    "pricegroupID",
    "pricegroupActive",
    "filtergroupID",
    "main_detail_id",
    "configurator_set_id",
    "template",
    "mode",
];

pub struct ProductConverter {
    services: ConverterServices,
}

impl ProductConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

impl Converter for ProductConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::PRODUCT
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        let Some(product_number) = record.field("ordernumber").as_text().map(str::to_string) else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::PRODUCT,
                &source_id,
                "ordernumber",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };
        let Some(article_id) = record.id("articleID") else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::PRODUCT,
                &source_id,
                "articleID",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };
        let Some(tax) = record.field("tax").as_object() else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::PRODUCT,
                &source_id,
                "tax",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let currency_iso = record
            .field("prices")
            .as_array()
            .and_then(|prices| prices.first())
            .and_then(|price| Field::from_option(price.get("currencyShortName")).as_text())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();
        let Some(currency_id) = scope.lookups().currency(ctx, &currency_iso)? else {
            scope.log(MigrationLog::entity_unknown(
                entities::CURRENCY,
                &currency_iso,
                entities::PRODUCT,
                &source_id,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let is_main = record.field("kind").as_i64() == Some(1);
        let mut out = Map::new();
        let product_id = if is_main {
            // The main detail answers for both the article and its own number.
            let id = scope.main_mapping(entities::PRODUCT_MAIN, &article_id, None)?;
            scope.mappings().get_or_create_with(
                ctx,
                entities::PRODUCT,
                &product_number,
                None,
                Some(&id),
            )?;
            id
        } else {
            let id = scope.main_mapping(entities::PRODUCT, &product_number, None)?;
            let parent_id = scope.get_or_create(entities::PRODUCT_MAIN, &article_id)?;
            out.insert("parentId".into(), Value::String(parent_id));
            id
        };

        let mut data = record.working_copy();
        data.discard(DISCARDED_FIELDS);
        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;

        out.insert("id".into(), Value::String(product_id.clone()));
        out.insert("productNumber".into(), Value::String(product_number));
        out.insert("active".into(), Value::Bool(data.take_bool("active")));
        out.insert("isCloseout".into(), Value::Bool(data.take_bool("laststock")));
        out.insert("shippingFree".into(), Value::Bool(data.take_bool("shippingfree")));
        out.insert("markAsTopseller".into(), Value::Bool(data.take_bool("topseller")));
        out.insert(
            "stock".into(),
            Value::from(data.take_i64("instock").unwrap_or_default()),
        );
        for (from, to) in [
            ("minpurchase", "minPurchase"),
            ("maxpurchase", "maxPurchase"),
            ("purchasesteps", "purchaseSteps"),
        ] {
            if let Some(value) = data.take_i64(from) {
                out.insert(to.into(), Value::from(value));
            }
        }
        for (from, to) in [
            ("weight", "weight"),
            ("width", "width"),
            ("height", "height"),
            ("length", "length"),
            ("purchaseunit", "purchaseUnit"),
            ("referenceunit", "referenceUnit"),
        ] {
            if let Some(value) = data.take_f64(from) {
                out.insert(to.into(), Value::from(value));
            }
        }
        for (from, to) in [
            ("ean", "ean"),
            ("suppliernumber", "manufacturerNumber"),
            ("releasedate", "releaseDate"),
        ] {
            if let Some(value) = data.take_text(from) {
                out.insert(to.into(), Value::String(value));
            }
        }

        data.discard(&["tax"]);
        let tax_rate = Field::from_option(tax.get("tax")).as_f64().unwrap_or_default();
        let tax_old_id = Field::from_option(tax.get("id"))
            .as_id()
            .unwrap_or_else(|| tax_rate.to_string());
        match scope.lookups().tax(ctx, &tax_old_id, tax_rate, None)? {
            Some(tax_id) => {
                out.insert("taxId".into(), Value::String(tax_id));
            }
            None => {
                let tax_id = scope.get_or_create(entities::TAX, &tax_old_id)?;
                let name = Field::from_option(tax.get("description"))
                    .as_text()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{tax_rate} %"));
                out.insert(
                    "tax".into(),
                    json!({"id": tax_id, "taxRate": tax_rate, "name": name}),
                );
            }
        }

        if let Some(manufacturer) = data.take_object("manufacturer") {
            if let Some(converted) = convert_manufacturer(&scope, &manufacturer, &language)? {
                out.insert("manufacturer".into(), converted);
            }
        }
        if let Some(unit) = data.take_object("unit") {
            if let Some(converted) = convert_unit(&scope, &unit, &language)? {
                out.insert("unit".into(), converted);
            }
        }

        if let Some(days) = data.take_i64("shippingtime") {
            match scope.lookups().delivery_time(ctx, days, days, "day")? {
                Some(delivery_time) => {
                    out.insert("deliveryTimeId".into(), Value::String(delivery_time));
                }
                None => scope.log(MigrationLog::entity_unknown(
                    entities::DELIVERY_TIME,
                    &days.to_string(),
                    entities::PRODUCT,
                    &source_id,
                ))?,
            }
        }

        if let Some(prices) = data.take_array("prices") {
            convert_prices(
                &scope,
                &mut out,
                &prices,
                &product_id,
                &currency_id,
                tax_rate,
            )?;
        }

        if let Some(assets) = data.take_array("assets") {
            convert_assets(&scope, &mut out, &assets, &product_id, &language)?;
        }

        if let Some(categories) = data.take_array("categories") {
            let mut mapped = Vec::new();
            for category in &categories {
                let Some(old) = Field::from_option(category.get("id")).as_id() else {
                    continue;
                };
                match scope.get_uuid(entities::CATEGORY, &old)? {
                    Some(id) => mapped.push(json!({"id": id})),
                    None => scope.log(MigrationLog::entity_unknown(
                        entities::CATEGORY,
                        &old,
                        entities::PRODUCT,
                        &source_id,
                    ))?,
                }
            }
            if !mapped.is_empty() {
                out.insert("categories".into(), Value::Array(mapped));
            }
        }

        let translation = build_translation(&scope, &mut data, &product_id, &language)?;
        let mut translations = Map::new();
        translations.insert(language, Value::Object(translation));
        out.insert("translations".into(), Value::Object(translations));

        scope.finish(Value::Object(out), data.into_unmapped())
    }

    fn media_uuids(&self, converted: &[Value]) -> Option<Vec<String>> {
        let ids: Vec<String> = converted
            .iter()
            .filter_map(|product| product.get("media").and_then(Value::as_array))
            .flatten()
            .filter_map(|product_media| {
                product_media
                    .pointer("/media/id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect();
        Some(ids)
    }
}

fn build_translation(
    scope: &ConvertScope<'_>,
    data: &mut Working,
    product_id: &str,
    language: &str,
) -> Result<Map<String, Value>> {
    let mut translation = Map::new();
    translation.insert("productId".into(), Value::String(product_id.to_string()));
    translation.insert("languageId".into(), Value::String(language.to_string()));
    for (from, to) in [
        ("name", "name"),
        ("description_long", "description"),
        ("description", "metaDescription"),
        ("keywords", "keywords"),
        ("metaTitle", "metaTitle"),
        ("packunit", "packUnit"),
    ] {
        if let Some(value) = data.take_text(from) {
            translation.insert(to.into(), Value::String(value));
        }
    }
    if let Some(attributes) = data.take_object("attributes") {
        if let Some(fields) = attribute_custom_fields(
            scope,
            entities::PRODUCT,
            &attributes,
            &["id", "articleID", "articledetailsID"],
        )? {
            translation.insert("customFields".into(), Value::Object(fields));
        }
    }
    Ok(translation)
}

fn convert_manufacturer(
    scope: &ConvertScope<'_>,
    manufacturer: &Map<String, Value>,
    language: &str,
) -> Result<Option<Value>> {
    let field = |key: &str| Field::from_option(manufacturer.get(key));
    let Some(old_id) = field("id").as_id() else {
        return Ok(None);
    };
    let id = scope.get_or_create(entities::PRODUCT_MANUFACTURER, &old_id)?;

    let mut translation = Map::new();
    translation.insert("productManufacturerId".into(), Value::String(id.clone()));
    translation.insert("languageId".into(), Value::String(language.to_string()));
    if let Some(name) = field("name").as_text() {
        translation.insert("name".into(), Value::String(name.to_string()));
    }
    if let Some(description) = field("description").as_text() {
        translation.insert("description".into(), Value::String(description.to_string()));
    }

    let mut converted = Map::new();
    converted.insert("id".into(), Value::String(id));
    if let Some(link) = field("link").as_text() {
        converted.insert("link".into(), Value::String(link.to_string()));
    }
    if let Some(media) = field("media").as_object() {
        if let Some(media) = convert_media(scope, media, entities::PRODUCT_MANUFACTURER, language)? {
            converted.insert("media".into(), media);
        }
    }
    let mut translations = Map::new();
    translations.insert(language.to_string(), Value::Object(translation));
    converted.insert("translations".into(), Value::Object(translations));
    Ok(Some(Value::Object(converted)))
}

fn convert_unit(
    scope: &ConvertScope<'_>,
    unit: &Map<String, Value>,
    language: &str,
) -> Result<Option<Value>> {
    let field = |key: &str| Field::from_option(unit.get(key));
    let Some(old_id) = field("id").as_id() else {
        return Ok(None);
    };
    let id = scope.get_or_create(entities::UNIT, &old_id)?;
    let mut translation = Map::new();
    translation.insert("unitId".into(), Value::String(id.clone()));
    translation.insert("languageId".into(), Value::String(language.to_string()));
    if let Some(short_code) = field("unit").as_text() {
        translation.insert("shortCode".into(), Value::String(short_code.to_string()));
    }
    if let Some(name) = field("description").as_text() {
        translation.insert("name".into(), Value::String(name.to_string()));
    }
    let mut translations = Map::new();
    translations.insert(language.to_string(), Value::Object(translation));
    Ok(Some(json!({"id": id, "translations": translations})))
}

fn currency_price(currency_id: &str, net: f64, tax_rate: f64) -> Value {
    json!([{
        "currencyId": currency_id,
        "net": net,
        "gross": round_to(net * (1.0 + tax_rate / 100.0), 2),
        "linked": true,
    }])
}

/// Sets the default `price` from the base customer group's first tier and
/// turns every tier of a known customer group into an advanced price.
fn convert_prices(
    scope: &ConvertScope<'_>,
    out: &mut Map<String, Value>,
    prices: &[Value],
    product_id: &str,
    currency_id: &str,
    tax_rate: f64,
) -> Result<()> {
    let group_key = |price: &Value| {
        Field::from_option(price.get("pricegroup"))
            .as_text()
            .unwrap_or(DEFAULT_CUSTOMER_GROUP)
            .to_string()
    };
    let default_price = prices
        .iter()
        .find(|p| {
            group_key(p) == DEFAULT_CUSTOMER_GROUP
                && Field::from_option(p.get("from")).as_i64().unwrap_or(1) == 1
        })
        .or_else(|| prices.first());
    if let Some(price) = default_price {
        let net = Field::from_option(price.get("price")).as_f64().unwrap_or_default();
        out.insert("price".into(), currency_price(currency_id, net, tax_rate));
    }

    let mut advanced = Vec::new();
    for price in prices {
        let field = |key: &str| Field::from_option(price.get(key));
        let Some(price_id) = field("id").as_id() else {
            continue;
        };
        let key = group_key(price);
        let group_old_id = field("customergroup")
            .get("id")
            .as_id()
            .unwrap_or_else(|| key.clone());
        let Some(group_id) = scope.get_uuid(entities::CUSTOMER_GROUP, &group_old_id)? else {
            scope.log(MigrationLog::entity_unknown(
                entities::CUSTOMER_GROUP,
                &group_old_id,
                entities::PRODUCT_PRICE,
                &price_id,
            ))?;
            continue;
        };

        // One rule per customer group, shared by every product.
        let rule_id = scope.get_or_create(entities::RULE, &format!("customer_group_{key}"))?;
        let condition_id = stable_child_id(&rule_id, "customerGroupCondition", &[]);
        let net = field("price").as_f64().unwrap_or_default();
        let mut row = json!({
            "id": scope.get_or_create(entities::PRODUCT_PRICE, &price_id)?,
            "productId": product_id,
            "ruleId": rule_id,
            "rule": {
                "id": rule_id,
                "name": format!("Customer group: {key}"),
                "priority": 0,
                "conditions": [{
                    "id": condition_id,
                    "type": "customerCustomerGroup",
                    "value": {"operator": "=", "customerGroupIds": [group_id]},
                }],
            },
            "quantityStart": field("from").as_i64().unwrap_or(1),
            "price": currency_price(currency_id, net, tax_rate),
        });
        // The last tier has `to` set to "beliebig".
        if let Some(end) = field("to").as_i64() {
            row["quantityEnd"] = Value::from(end);
        }
        advanced.push(row);
    }
    if !advanced.is_empty() {
        out.insert("prices".into(), Value::Array(advanced));
    }
    Ok(())
}

fn convert_assets(
    scope: &ConvertScope<'_>,
    out: &mut Map<String, Value>,
    assets: &[Value],
    product_id: &str,
    language: &str,
) -> Result<()> {
    let mut product_media = Vec::new();
    for asset in assets {
        let field = |key: &str| Field::from_option(asset.get(key));
        let (Some(asset_id), Some(media)) = (field("id").as_id(), field("media").as_object()) else {
            continue;
        };
        let Some(media) = convert_media(scope, media, entities::PRODUCT, language)? else {
            continue;
        };
        let id = scope.get_or_create(entities::PRODUCT_MEDIA, &asset_id)?;
        if field("main").as_i64() == Some(1) {
            out.insert("coverId".into(), Value::String(id.clone()));
        }
        product_media.push(json!({
            "id": id,
            "productId": product_id,
            "position": field("position").as_i64().unwrap_or_default(),
            "media": media,
        }));
    }
    if !product_media.is_empty() {
        out.insert("media".into(), Value::Array(product_media));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gross_price_is_rounded() {
        let price = currency_price("c", 8.4033, 19.0);
        assert_eq!(price[0]["gross"], json!(10.0));
        assert_eq!(price[0]["linked"], json!(true));
    }
}
