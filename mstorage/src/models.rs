use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// --- Mapping table ---

/// One row of the identity table: `(connection, entity, old id) -> new id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: String,
    pub connection_id: String,
    pub entity: String,
    pub old_identifier: String,
    pub new_identifier: Option<String>,
    pub satellite_data: Option<Value>,
    pub checksum: Option<String>,
}

impl Mapping {
    /// The resolved destination id, if one has been assigned.
    pub fn new_id(&self) -> Option<&str> {
        self.new_identifier.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMapping {
    pub connection_id: String,
    pub entity: String,
    pub old_identifier: String,
    pub satellite_data: Option<Value>,
    /// Destination id already known to the caller (natural-key match, ids
    /// carried over from a same-schema source, premapping selections).
    pub forced_new_identifier: Option<String>,
    /// Leave `new_identifier` empty until a later `resolve_mapping`.
    pub unresolved: bool,
}

impl NewMapping {
    pub fn new(
        connection_id: impl Into<String>,
        entity: impl Into<String>,
        old_identifier: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            entity: entity.into(),
            old_identifier: old_identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_satellite(mut self, data: Value) -> Self {
        self.satellite_data = Some(data);
        self
    }

    pub fn with_new_identifier(mut self, id: impl Into<String>) -> Self {
        self.forced_new_identifier = Some(id.into());
        self
    }

    pub fn unresolved(mut self) -> Self {
        self.unresolved = true;
        self
    }
}

// --- Migration log ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "info" => Some(LogLevel::Info),
            "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub run_id: Option<String>,
    pub level: LogLevel,
    pub code: String,
    pub entity: Option<String>,
    pub source_id: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

// --- Target system rows ---

/// A row of the destination system's own tables, as searched by lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub entity: String,
    pub id: String,
    pub payload: Value,
}

// --- Converted data ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationData {
    pub run_id: String,
    pub entity: String,
    pub source_id: Option<String>,
    pub raw: Value,
    pub converted: Option<Value>,
    pub unmapped: Option<Value>,
    pub mapping_id: Option<String>,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub run_id: String,
    pub entity: String,
    pub uri: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub media_id: String,
}
