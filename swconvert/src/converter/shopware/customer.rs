use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use super::language_id;
use crate::converter::helpers::{attribute_custom_fields, is_valid_email};
use crate::converter::{
    require_source_id, ConversionResult, ConvertScope, Converter, ConverterServices,
};
use crate::context::MigrationContext;
use crate::entities;
use crate::error::Result;
use crate::logging::MigrationLog;
use crate::profile::LEGACY_PROFILES;
use crate::record::{Field, RawRecord, Working};

const REQUIRED_FIELDS: &[&str] = &["email", "firstname", "lastname"];
const REQUIRED_ADDRESS_FIELDS: &[&str] = &["firstname", "lastname", "zipcode", "city", "street"];

/// Columns without a counterpart in the destination customer.
const DISCARDED_FIELDS: &[&str] = &[
    "paymentID",
    "paymentpreset",
    "sessionID",
    "validation",
    "confirmationkey",
    "pricegroupID",
    "internalcomment",
    "failedlogins",
    "lockeduntil",
    "newsletter",
    "language",
    "customergroup",
    "group",
    "changed",
    "password_change_date",
    "login_token",
    "doubleOptinRegister",
    "doubleOptinEmailSentDate",
    "doubleOptinConfirmDate",
];

const DISCARDED_ADDRESS_FIELDS: &[&str] = &["user_id", "country_id", "state_id", "original_type"];

pub struct CustomerConverter {
    services: ConverterServices,
}

impl CustomerConverter {
    pub fn new(services: ConverterServices) -> Self {
        Self { services }
    }
}

/// Valid address already converted, with its source id.
struct ConvertedAddress {
    old_id: String,
    value: Value,
}

impl Converter for CustomerConverter {
    fn profiles(&self) -> &'static [&'static str] {
        LEGACY_PROFILES
    }

    fn entity(&self) -> &'static str {
        entities::CUSTOMER
    }

    fn convert(&self, record: &RawRecord, ctx: &MigrationContext) -> Result<ConversionResult> {
        let Some(source_id) =
            require_source_id(&self.services, ctx, self.entity(), record.id("id"))?
        else {
            return Ok(ConversionResult::rejected(record));
        };
        let mut scope = ConvertScope::new(&self.services, ctx, record, source_id.clone());

        for field in REQUIRED_FIELDS {
            if record.field(field).is_blank() {
                scope.log(MigrationLog::empty_necessary_field(
                    entities::CUSTOMER,
                    &source_id,
                    field,
                ))?;
                return Ok(scope.abort(Some(record.to_value())));
            }
        }

        let Some(payment_method_id) = resolve_payment_method(&scope, record)? else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CUSTOMER,
                &source_id,
                "defaultpayment",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let Some(old_group_id) = record.id("customerGroupId") else {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CUSTOMER,
                &source_id,
                "customerGroupId",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let email = record.field("email").as_text().unwrap_or_default().trim().to_string();
        if !is_valid_email(&email) {
            scope.log(MigrationLog::invalid_email(entities::CUSTOMER, &source_id, &email))?;
            return Ok(scope.abort(Some(record.to_value())));
        }

        let Some(group_id) = scope.get_uuid(entities::CUSTOMER_GROUP, &old_group_id)? else {
            scope.log(MigrationLog::association_required_missing(
                entities::CUSTOMER,
                &source_id,
                entities::CUSTOMER_GROUP,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let sales_channel_id = match record.id("subshopID") {
            Some(shop_id) => scope.get_uuid(entities::SALES_CHANNEL, &shop_id)?,
            None => None,
        };
        let Some(sales_channel_id) = sales_channel_id else {
            scope.log(MigrationLog::association_required_missing(
                entities::CUSTOMER,
                &source_id,
                entities::SALES_CHANNEL,
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        };

        let customer_id = scope.main_mapping(entities::CUSTOMER, &source_id, None)?;
        let mut data = record.working_copy();
        data.discard(&["id", "email", "customerGroupId", "subshopID", "defaultpayment"]);
        data.discard(DISCARDED_FIELDS);

        let mut out = Map::new();
        out.insert("id".into(), Value::String(customer_id.clone()));
        out.insert("email".into(), Value::String(email));
        out.insert("groupId".into(), Value::String(group_id));
        out.insert("salesChannelId".into(), Value::String(sales_channel_id.clone()));
        out.insert("defaultPaymentMethodId".into(), Value::String(payment_method_id));

        let locale = data.take_text("_locale");
        let language = language_id(&scope, locale.as_deref())?;
        out.insert("languageId".into(), Value::String(language));

        if let Some(shop) = data.take_object("shop") {
            if Field::from_option(shop.get("customer_scope")).as_bool() {
                out.insert("boundSalesChannelId".into(), Value::String(sales_channel_id));
            }
        }

        set_text(&mut out, &mut data, "firstname", "firstName");
        set_text(&mut out, &mut data, "lastname", "lastName");
        set_text(&mut out, &mut data, "title", "title");
        set_text(&mut out, &mut data, "firstlogin", "firstLogin");
        set_text(&mut out, &mut data, "lastlogin", "lastLogin");
        set_text(&mut out, &mut data, "referer", "campaignCode");
        if let Some(birthday) = data.take_text("birthday").as_deref().and_then(parse_birthday) {
            out.insert("birthday".into(), Value::String(birthday));
        }

        let guest = data.field("accountmode").as_i64() == Some(1);
        data.discard(&["accountmode"]);
        out.insert("guest".into(), Value::Bool(guest));
        out.insert("active".into(), Value::Bool(data.take_bool("active")));
        data.discard(&["affiliate"]);

        let customer_number = data
            .take_text("customernumber")
            .unwrap_or_else(|| format!("number-{source_id}"));
        out.insert("customerNumber".into(), Value::String(customer_number));

        if let Some(password) = data.take_text("password") {
            let encoder = data.take_text("encoder").unwrap_or_else(|| "md5".to_string());
            out.insert("legacyPassword".into(), Value::String(password));
            out.insert("legacyEncoder".into(), Value::String(capitalize(&encoder)));
        } else {
            data.discard(&["encoder"]);
        }

        if let Some(salutation) = data.take_text("salutation") {
            match scope.lookups().salutation(ctx, &salutation, &salutation)? {
                Some(id) => {
                    out.insert("salutationId".into(), Value::String(id));
                }
                None => scope.log(MigrationLog::entity_unknown(
                    entities::SALUTATION,
                    &salutation,
                    entities::CUSTOMER,
                    &source_id,
                ))?,
            }
        }

        if let Some(attributes) = data.take_object("attributes") {
            if let Some(fields) =
                attribute_custom_fields(&scope, entities::CUSTOMER, &attributes, &["id", "userID"])?
            {
                out.insert("customFields".into(), Value::Object(fields));
            }
        }

        let default_billing = data.take_id("default_billing_address_id");
        let default_shipping = data.take_id("default_shipping_address_id");
        let raw_addresses = data.take_array("addresses").unwrap_or_default();

        let mut address_leftovers = Vec::new();
        let mut addresses = Vec::new();
        for raw in &raw_addresses {
            let Some(raw) = raw.as_object() else {
                continue;
            };
            if let Some(address) =
                convert_address(&scope, raw, &customer_id, &source_id, &mut address_leftovers)?
            {
                addresses.push(address);
            }
        }

        if addresses.is_empty() {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CUSTOMER,
                &source_id,
                "address data",
            ))?;
            return Ok(scope.abort(Some(record.to_value())));
        }

        let (billing_id, shipping_id) =
            select_default_addresses(&scope, &addresses, default_billing, default_shipping)?;
        out.insert("defaultBillingAddressId".into(), Value::String(billing_id));
        out.insert("defaultShippingAddressId".into(), Value::String(shipping_id));
        out.insert(
            "addresses".into(),
            Value::Array(addresses.into_iter().map(|a| a.value).collect()),
        );

        if !address_leftovers.is_empty() {
            data.insert("addresses", Value::Array(address_leftovers));
        }
        let unmapped = data.into_unmapped();
        scope.finish(Value::Object(out), unmapped)
    }
}

/// Customer's own payment method, else the operator's default.
fn resolve_payment_method(scope: &ConvertScope<'_>, record: &RawRecord) -> Result<Option<String>> {
    if let Some(old) = record.path(&["defaultpayment", "id"]).as_id() {
        if let Some(id) = scope.get_uuid(entities::PAYMENT_METHOD, &old)? {
            return Ok(Some(id));
        }
    }
    scope.get_uuid(entities::PAYMENT_METHOD, entities::DEFAULT_PAYMENT_METHOD)
}

/// Applies the fallback chain for default addresses and logs every
/// substitution. Returns destination ids of (billing, shipping).
fn select_default_addresses(
    scope: &ConvertScope<'_>,
    addresses: &[ConvertedAddress],
    billing: Option<String>,
    shipping: Option<String>,
) -> Result<(String, String)> {
    let find = |old: &Option<String>| -> Option<String> {
        let old = old.as_deref()?;
        addresses
            .iter()
            .find(|a| a.old_id == old)
            .and_then(|a| a.value.get("id").and_then(Value::as_str))
            .map(str::to_string)
    };
    let first = addresses
        .first()
        .and_then(|a| a.value.get("id").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let reassigned = |empty: &str, replacement: &str| {
        scope.log(MigrationLog::field_reassigned(
            entities::CUSTOMER,
            &scope.source_id,
            empty,
            replacement,
        ))
    };

    match (find(&billing), find(&shipping)) {
        (Some(billing), Some(shipping)) => Ok((billing, shipping)),
        (None, Some(shipping)) => {
            reassigned("default billing address", "default shipping address")?;
            Ok((shipping.clone(), shipping))
        }
        (Some(billing), None) => {
            reassigned("default shipping address", "default billing address")?;
            Ok((billing.clone(), billing))
        }
        (None, None) => {
            reassigned("default billing and shipping address", "first address")?;
            Ok((first.clone(), first))
        }
    }
}

/// Converts one address, or logs the first blank required field and
/// returns `None`.
fn convert_address(
    scope: &ConvertScope<'_>,
    raw: &Map<String, Value>,
    customer_id: &str,
    customer_source_id: &str,
    leftovers: &mut Vec<Value>,
) -> Result<Option<ConvertedAddress>> {
    let field = |key: &str| Field::from_option(raw.get(key));
    let Some(old_id) = field("id").as_id() else {
        scope.log(MigrationLog::empty_necessary_field(
            entities::CUSTOMER_ADDRESS,
            customer_source_id,
            "id",
        ))?;
        return Ok(None);
    };

    for required in REQUIRED_ADDRESS_FIELDS {
        if field(required).is_blank() {
            scope.log(MigrationLog::empty_necessary_field(
                entities::CUSTOMER_ADDRESS,
                &old_id,
                required,
            ))?;
            return Ok(None);
        }
    }

    let mut data = Working::new(raw.clone());
    data.discard(&["id"]);
    data.discard(DISCARDED_ADDRESS_FIELDS);
    let address_id = scope.get_or_create(entities::CUSTOMER_ADDRESS, &old_id)?;
    let mut address = Map::new();
    address.insert("id".into(), Value::String(address_id));
    address.insert("customerId".into(), Value::String(customer_id.to_string()));

    set_text(&mut address, &mut data, "firstname", "firstName");
    set_text(&mut address, &mut data, "lastname", "lastName");
    set_text(&mut address, &mut data, "zipcode", "zipcode");
    set_text(&mut address, &mut data, "city", "city");
    set_text(&mut address, &mut data, "street", "street");
    set_text(&mut address, &mut data, "company", "company");
    set_text(&mut address, &mut data, "department", "department");
    set_text(&mut address, &mut data, "title", "title");
    set_text(&mut address, &mut data, "ustid", "vatId");
    set_text(&mut address, &mut data, "phone", "phoneNumber");
    set_text(&mut address, &mut data, "additional_address_line1", "additionalAddressLine1");
    set_text(&mut address, &mut data, "additional_address_line2", "additionalAddressLine2");

    if let Some(salutation) = data.take_text("salutation") {
        if let Some(id) = scope.lookups().salutation(scope.ctx, &salutation, &salutation)? {
            address.insert("salutationId".into(), Value::String(id));
        }
    }

    let country = data.take_object("country");
    let country_iso = country
        .as_ref()
        .and_then(|c| Field::from_option(c.get("countryiso")).as_text())
        .map(str::to_string);
    if let Some(country) = &country {
        convert_country(scope, raw, country, &mut address)?;
    }

    let state = data.take_object("state");
    if let Some(state_id) = field("state_id").as_id().filter(|id| id != "0") {
        let resolved = match scope.get_uuid(entities::COUNTRY_STATE, &state_id)? {
            Some(id) => Some(id),
            None => match (&state, country_iso.as_deref()) {
                (Some(state), Some(iso)) => {
                    match Field::from_option(state.get("shortcode")).as_text() {
                        Some(code) => scope
                            .lookups()
                            .country_state(scope.ctx, &state_id, iso, code)?,
                        None => None,
                    }
                }
                _ => None,
            },
        };
        match resolved {
            Some(id) => {
                address.insert("countryState".into(), json!({ "id": id }));
            }
            None => scope.log(MigrationLog::entity_unknown(
                entities::COUNTRY_STATE,
                &state_id,
                entities::CUSTOMER,
                customer_source_id,
            ))?,
        }
    }

    if let Some(attributes) = data.take_object("attributes") {
        if let Some(fields) = attribute_custom_fields(
            scope,
            entities::CUSTOMER_ADDRESS,
            &attributes,
            &["id", "address_id"],
        )? {
            address.insert("customFields".into(), Value::Object(fields));
        }
    }

    if !data.is_empty() {
        let mut leftover = data.into_map();
        leftover.insert("id".into(), Value::String(old_id.clone()));
        leftovers.push(Value::Object(leftover));
    }

    Ok(Some(ConvertedAddress {
        old_id,
        value: Value::Object(address),
    }))
}

/// Points the address at an existing country matched by ISO codes. A
/// country the destination lacks is emitted inline under `country` so it is
/// created together with the address.
fn convert_country(
    scope: &ConvertScope<'_>,
    raw: &Map<String, Value>,
    country: &Map<String, Value>,
    address: &mut Map<String, Value>,
) -> Result<()> {
    let field = |key: &str| Field::from_option(country.get(key));
    let (Some(iso), Some(iso3)) = (field("countryiso").as_text(), field("iso3").as_text()) else {
        return Ok(());
    };
    let old_id = field("id")
        .as_id()
        .or_else(|| Field::from_option(raw.get("country_id")).as_id())
        .unwrap_or_else(|| format!("{iso}-{iso3}"));
    if let Some(id) = scope.lookups().country(scope.ctx, &old_id, iso, iso3)? {
        address.insert("countryId".into(), Value::String(id));
        return Ok(());
    }

    let country_id = scope.get_or_create(entities::COUNTRY, &old_id)?;
    let name = field("countryname").as_text().unwrap_or(iso);
    address.insert("countryId".into(), Value::String(country_id.clone()));
    address.insert(
        "country".into(),
        json!({"id": country_id, "iso": iso, "iso3": iso3, "name": name}),
    );
    Ok(())
}

/// Calendar date of a birthday column; zero dates and impossible days are
/// dropped. A trailing time part is ignored.
fn parse_birthday(raw: &str) -> Option<String> {
    let date = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn set_text(out: &mut Map<String, Value>, data: &mut Working, from: &str, to: &str) {
    if let Some(value) = data.take_text(from) {
        out.insert(to.to_string(), Value::String(value));
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_birthday() {
        assert_eq!(parse_birthday("1990-01-01"), Some("1990-01-01".to_string()));
        assert_eq!(parse_birthday("1985-07-14 00:00:00"), Some("1985-07-14".to_string()));
        assert_eq!(parse_birthday("0000-00-00"), None);
        assert_eq!(parse_birthday("1990-02-30"), None);
        assert_eq!(parse_birthday(""), None);
    }
}
