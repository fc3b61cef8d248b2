//! Read/write access to the destination system's own tables.
//!
//! Lookups search this repository by natural key (`locale.code`, `iso3`,
//! `technicalName`, ...). Payloads are JSON documents; criteria address
//! nested fields with dotted paths and treat arrays as "any element".

use crate::errors::{Result, StorageError};
use crate::models::TargetRecord;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals { field: String, value: Value },
    EqualsAny { field: String, values: Vec<Value> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn equals_any<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::EqualsAny {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            Filter::Equals { field, value } => {
                leaf_values(payload, field).iter().any(|leaf| values_equal(leaf, value))
            }
            Filter::EqualsAny { field, values } => leaf_values(payload, field)
                .iter()
                .any(|leaf| values.iter().any(|v| values_equal(leaf, v))),
            Filter::And(filters) => filters.iter().all(|f| f.matches(payload)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(payload)),
            Filter::Not(inner) => !inner.matches(payload),
        }
    }
}

/// All values reachable through `path`. A missing field yields `Null`, so
/// `Equals(field, null)` matches absent fields too.
static NULL: Value = Value::Null;

fn leaf_values<'a>(payload: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![payload];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            collect_segment(value, segment, &mut next);
        }
        current = next;
    }
    if current.is_empty() {
        current.push(&NULL);
    }
    current
}

fn collect_segment<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_segment(item, segment, out);
            }
        }
        Value::Object(map) => {
            if let Some(child) = map.get(segment) {
                out.push(child);
            }
        }
        _ => {}
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(items), _) => items.iter().any(|item| values_equal(item, right)),
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => a == b,
        },
        _ => left == right,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, payload: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(payload))
    }

    fn apply<'a>(&self, records: impl Iterator<Item = &'a TargetRecord>) -> Vec<TargetRecord> {
        let matching = records.filter(|r| self.matches(&r.payload)).cloned();
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

pub trait TargetRepository: Send + Sync {
    fn search(&self, entity: &str, criteria: &Criteria) -> Result<Vec<TargetRecord>>;

    fn get(&self, entity: &str, id: &str) -> Result<Option<TargetRecord>>;

    fn upsert(&self, record: TargetRecord) -> Result<()>;

    fn search_ids(&self, entity: &str, criteria: &Criteria) -> Result<Vec<String>> {
        Ok(self
            .search(entity, criteria)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    fn first_id(&self, entity: &str, criteria: &Criteria) -> Result<Option<String>> {
        let criteria = criteria.clone().limit(1);
        Ok(self.search_ids(entity, &criteria)?.into_iter().next())
    }
}

// --- SQLite ---

#[derive(Clone)]
pub struct SqliteTargetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTargetRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS target_entities (
                entity TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (entity, id)
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::poisoned("target connection"))?;
        f(&guard)
    }
}

impl TargetRepository for SqliteTargetRepository {
    fn search(&self, entity: &str, criteria: &Criteria) -> Result<Vec<TargetRecord>> {
        let records = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, payload FROM target_entities WHERE entity = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![entity], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (id, payload) = row?;
                out.push(TargetRecord {
                    entity: entity.to_string(),
                    id,
                    payload: serde_json::from_str(&payload)?,
                });
            }
            Ok(out)
        })?;
        Ok(criteria.apply(records.iter()))
    }

    fn get(&self, entity: &str, id: &str) -> Result<Option<TargetRecord>> {
        self.with_conn(|conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM target_entities WHERE entity = ?1 AND id = ?2",
                    params![entity, id],
                    |row| row.get(0),
                )
                .optional()?;
            payload
                .map(|raw| {
                    Ok(TargetRecord {
                        entity: entity.to_string(),
                        id: id.to_string(),
                        payload: serde_json::from_str(&raw)?,
                    })
                })
                .transpose()
        })
    }

    fn upsert(&self, record: TargetRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO target_entities (entity, id, payload) VALUES (?1, ?2, ?3)
                 ON CONFLICT(entity, id) DO UPDATE SET payload = excluded.payload",
                params![record.entity, record.id, payload],
            )?;
            Ok(())
        })
    }
}

// --- In-memory ---

#[derive(Default)]
pub struct InMemoryTargetRepository {
    tables: Mutex<BTreeMap<String, Vec<TargetRecord>>>,
}

impl InMemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row; mainly for fixtures.
    pub fn insert(&self, entity: &str, id: &str, payload: Value) -> Result<()> {
        self.upsert(TargetRecord {
            entity: entity.to_string(),
            id: id.to_string(),
            payload,
        })
    }
}

impl TargetRepository for InMemoryTargetRepository {
    fn search(&self, entity: &str, criteria: &Criteria) -> Result<Vec<TargetRecord>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| StorageError::poisoned("target tables"))?;
        Ok(tables
            .get(entity)
            .map(|rows| criteria.apply(rows.iter()))
            .unwrap_or_default())
    }

    fn get(&self, entity: &str, id: &str) -> Result<Option<TargetRecord>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| StorageError::poisoned("target tables"))?;
        Ok(tables
            .get(entity)
            .and_then(|rows| rows.iter().find(|r| r.id == id).cloned()))
    }

    fn upsert(&self, record: TargetRecord) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StorageError::poisoned("target tables"))?;
        let rows = tables.entry(record.entity.clone()).or_default();
        match rows.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
        Ok(())
    }
}
