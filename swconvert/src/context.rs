use serde::{Deserialize, Serialize};

/// A configured source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub profile_name: String,
    pub gateway_name: String,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile_name: profile_name.into(),
            gateway_name: "local".to_string(),
        }
    }
}

/// Identifies one conversion call: which connection, which run, which
/// entity type, and the page being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationContext {
    pub connection: Connection,
    pub run_id: String,
    pub entity: String,
    pub offset: usize,
    pub limit: usize,
}

impl MigrationContext {
    pub fn new(connection: Connection, run_id: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            connection,
            run_id: run_id.into(),
            entity: entity.into(),
            offset: 0,
            limit: 250,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection.id
    }

    pub fn profile_name(&self) -> &str {
        &self.connection.profile_name
    }

    /// Same connection and run, different entity type.
    pub fn for_entity(&self, entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}
