use serde_json::Value;
use uuid::Uuid;

/// Fresh destination identifier in the 32-char lowercase hex form the target
/// system uses for primary keys.
pub fn random_hex() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn uuid_v5_hex(ns: Uuid, name: &str) -> String {
    Uuid::new_v5(&ns, name.as_bytes()).simple().to_string()
}

/// Deterministic id for a child record that has no source identifier of its
/// own (rule conditions, generated price rows, ...).
pub fn stable_child_id(parent_id: &str, kind: &str, key_values: &[(&str, String)]) -> String {
    // "rule_condition|parent=<id>|position=3"
    let mut name = String::from(kind);
    name.push_str("|parent=");
    name.push_str(parent_id);
    for (k, v) in key_values {
        name.push('|');
        name.push_str(k);
        name.push('=');
        name.push_str(v);
    }
    uuid_v5_hex(Uuid::NAMESPACE_OID, &name)
}

/// Checksum over a raw record. Object keys are serialized in sorted order by
/// `serde_json::Map`, so equal records hash equally regardless of input order.
pub fn checksum(value: &Value) -> String {
    let canonical = value.to_string();
    uuid_v5_hex(Uuid::NAMESPACE_URL, &canonical)
}

pub fn is_hex_id(candidate: &str) -> bool {
    candidate.len() == 32 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}
