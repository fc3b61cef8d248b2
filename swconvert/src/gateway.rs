//! Source-side contract: paged reads of raw rows per entity type.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::record::RawRecord;

pub trait Gateway: Send + Sync {
    fn read(&self, entity: &str, limit: usize, offset: usize) -> Result<Vec<RawRecord>>;

    fn read_total(&self, entity: &str) -> Result<usize>;
}

/// Reads an exported dump: one JSON object whose keys are entity names and
/// whose values are arrays of raw rows.
///
/// ```json
/// { "customer": [ { "id": "1", "email": "..." } ], "translation": [] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonDumpGateway {
    tables: BTreeMap<String, Vec<Map<String, Value>>>,
}

impl JsonDumpGateway {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_value(serde_json::from_str(&raw)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(entities) = value else {
            return Err(ConvertError::InvalidParam(
                "dump must be an object keyed by entity name".to_string(),
            ));
        };

        let mut tables = BTreeMap::new();
        for (entity, rows) in entities {
            let Value::Array(rows) = rows else {
                return Err(ConvertError::InvalidParam(format!(
                    "rows for '{entity}' must be an array"
                )));
            };
            let rows = rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    other => {
                        log::warn!("skipping non-object row in '{entity}': {other}");
                        None
                    }
                })
                .collect();
            tables.insert(entity, rows);
        }
        Ok(Self { tables })
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl Gateway for JsonDumpGateway {
    fn read(&self, entity: &str, limit: usize, offset: usize) -> Result<Vec<RawRecord>> {
        Ok(self
            .tables
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .map(RawRecord::new)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_total(&self, entity: &str) -> Result<usize> {
        Ok(self.tables.get(entity).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pages_through_rows() {
        let gateway = JsonDumpGateway::from_value(json!({
            "currency": [{"id": "1"}, {"id": "2"}, {"id": "3"}],
        }))
        .unwrap();

        assert_eq!(gateway.read_total("currency").unwrap(), 3);
        assert_eq!(gateway.read_total("customer").unwrap(), 0);

        let page = gateway.read("currency", 2, 1).unwrap();
        let ids: Vec<_> = page.iter().filter_map(|r| r.id("id")).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_rejects_malformed_dump() {
        assert!(JsonDumpGateway::from_value(json!([1, 2])).is_err());
        assert!(JsonDumpGateway::from_value(json!({"currency": {"id": "1"}})).is_err());
    }
}
