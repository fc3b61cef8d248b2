//! Entity names used as mapping namespaces and log subjects.

pub const CATEGORY: &str = "category";
pub const CMS_PAGE: &str = "cms_page";
pub const COUNTRY: &str = "country";
pub const COUNTRY_STATE: &str = "country_state";
pub const CURRENCY: &str = "currency";
pub const CUSTOMER: &str = "customer";
pub const CUSTOMER_ADDRESS: &str = "customer_address";
pub const CUSTOMER_GROUP: &str = "customer_group";
pub const DELIVERY_TIME: &str = "delivery_time";
pub const DOCUMENT_BASE_CONFIG: &str = "document_base_config";
pub const DOCUMENT_INHERITANCE: &str = "document_inheritance";
pub const DOCUMENT_TYPE: &str = "document_type";
pub const LANGUAGE: &str = "language";
pub const MAIL_TEMPLATE: &str = "mail_template";
pub const MAIL_TEMPLATE_TYPE: &str = "mail_template_type";
pub const MEDIA: &str = "media";
pub const MEDIA_DEFAULT_FOLDER: &str = "media_default_folder";
pub const MEDIA_FOLDER: &str = "media_folder";
pub const NUMBER_RANGE: &str = "number_range";
pub const NUMBER_RANGE_TYPE: &str = "number_range_type";
pub const ORDER: &str = "order";
pub const ORDER_DOCUMENT: &str = "order_document";
pub const ORDER_DOCUMENT_BASE_CONFIG: &str = "order_document_base_config";
pub const ORDER_DOCUMENT_TYPE: &str = "order_document_type";
pub const PAGE_SYSTEM_CONFIG: &str = "page_system_config";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const PRODUCT: &str = "product";
pub const PRODUCT_MAIN: &str = "product_main";
pub const PRODUCT_MANUFACTURER: &str = "product_manufacturer";
pub const PRODUCT_MEDIA: &str = "product_media";
pub const PRODUCT_PRICE: &str = "product_price";
pub const PRODUCT_SORTING: &str = "product_sorting";
pub const PRODUCT_STREAM: &str = "product_stream";
pub const PROPERTY_GROUP: &str = "property_group";
pub const PROPERTY_GROUP_OPTION: &str = "property_group_option";
pub const RULE: &str = "rule";
pub const RULE_CONDITION: &str = "rule_condition";
pub const SALES_CHANNEL: &str = "sales_channel";
pub const SALUTATION: &str = "salutation";
pub const SHIPPING_METHOD: &str = "shipping_method";
pub const SHIPPING_METHOD_PRICE: &str = "shipping_method_price";
pub const STATE_MACHINE_STATE: &str = "state_machine_state";
pub const SYSTEM_CONFIG: &str = "system_config";
pub const TAX: &str = "tax";
pub const TAX_RULE: &str = "tax_rule";
pub const TAX_RULE_TYPE: &str = "tax_rule_type";
pub const TRANSLATION: &str = "translation";
pub const UNIT: &str = "unit";

// Premapping namespaces: rows the operator assigns before a run.
pub const DEFAULT_PAYMENT_METHOD: &str = "default_payment_method";
pub const DEFAULT_SHIPPING_AVAILABILITY_RULE: &str = "default_shipping_availability_rule";
pub const DEFAULT_DELIVERY_TIME: &str = "default_delivery_time";
pub const DEFAULT_CMS_PAGE: &str = "default_cms_page";

/// Namespace of the custom-field definitions derived from `entity`'s
/// attribute columns (`product_custom_field`, ...).
pub fn custom_field_entity(entity: &str) -> String {
    format!("{entity}_custom_field")
}
