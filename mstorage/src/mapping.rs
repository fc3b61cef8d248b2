use crate::catalog::Catalog;
use crate::errors::{Result, StorageError};
use crate::models::{Mapping, NewMapping};
use crate::utils::id::random_hex;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persistent `(connection, entity, old id) -> new id` table.
///
/// Implementations guarantee at most one row per triple. Creation is
/// idempotent: asking twice for the same triple yields the same row, and a
/// resolved `new_identifier` never changes afterwards.
pub trait MappingStore: Send + Sync {
    fn get_mapping(
        &self,
        connection_id: &str,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Option<Mapping>>;

    fn get_or_create_mapping(&self, new: NewMapping) -> Result<Mapping>;

    /// Like [`MappingStore::get_or_create_mapping`] but fails with
    /// [`StorageError::DuplicateMapping`] when the triple is already taken.
    fn create_mapping(&self, new: NewMapping) -> Result<Mapping>;

    /// Assigns the destination id of a mapping that was created unresolved.
    fn resolve_mapping(&self, mapping_id: &str, new_identifier: &str) -> Result<Mapping>;

    fn update_checksum(&self, mapping_id: &str, checksum: &str) -> Result<()>;

    fn list_mappings(&self, connection_id: &str, entity: &str) -> Result<Vec<Mapping>>;
}

fn initial_identifier(new: &NewMapping) -> Option<String> {
    if new.unresolved {
        return None;
    }
    Some(
        new.forced_new_identifier
            .clone()
            .unwrap_or_else(random_hex),
    )
}

fn fresh_mapping(new: &NewMapping) -> Mapping {
    Mapping {
        id: random_hex(),
        connection_id: new.connection_id.clone(),
        entity: new.entity.clone(),
        old_identifier: new.old_identifier.clone(),
        new_identifier: initial_identifier(new),
        satellite_data: new.satellite_data.clone(),
        checksum: None,
    }
}

fn duplicate(new: &NewMapping) -> StorageError {
    StorageError::DuplicateMapping {
        connection_id: new.connection_id.clone(),
        entity: new.entity.clone(),
        old_identifier: new.old_identifier.clone(),
    }
}

// --- SQLite ---

pub struct SqliteMappingStore {
    catalog: Catalog,
}

const MAPPING_COLUMNS: &str =
    "id, connection_id, entity, old_identifier, entity_uuid, additional_data, checksum";

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Mapping, Option<String>)> {
    Ok((
        Mapping {
            id: row.get(0)?,
            connection_id: row.get(1)?,
            entity: row.get(2)?,
            old_identifier: row.get(3)?,
            new_identifier: row.get(4)?,
            satellite_data: None,
            checksum: row.get(6)?,
        },
        row.get(5)?,
    ))
}

fn hydrate(raw: Option<(Mapping, Option<String>)>) -> Result<Option<Mapping>> {
    match raw {
        Some((mut mapping, satellite)) => {
            mapping.satellite_data = satellite.as_deref().map(serde_json::from_str).transpose()?;
            Ok(Some(mapping))
        }
        None => Ok(None),
    }
}

fn select_by_triple(
    conn: &Connection,
    connection_id: &str,
    entity: &str,
    old_identifier: &str,
) -> Result<Option<Mapping>> {
    let sql = format!(
        "SELECT {MAPPING_COLUMNS} FROM swag_migration_mapping
         WHERE connection_id = ?1 AND entity = ?2 AND old_identifier = ?3"
    );
    let raw = conn
        .query_row(&sql, params![connection_id, entity, old_identifier], row_to_mapping)
        .optional()?;
    hydrate(raw)
}

fn select_by_id(conn: &Connection, mapping_id: &str) -> Result<Option<Mapping>> {
    let sql = format!("SELECT {MAPPING_COLUMNS} FROM swag_migration_mapping WHERE id = ?1");
    let raw = conn
        .query_row(&sql, params![mapping_id], row_to_mapping)
        .optional()?;
    hydrate(raw)
}

/// Inserts unless the triple exists. Returns the number of inserted rows.
fn insert_if_absent(conn: &Connection, mapping: &Mapping) -> Result<usize> {
    let satellite = mapping
        .satellite_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let inserted = conn.execute(
        "INSERT INTO swag_migration_mapping
            (id, connection_id, entity, old_identifier, entity_uuid, additional_data, checksum, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)
         ON CONFLICT(connection_id, entity, old_identifier) DO NOTHING",
        params![
            mapping.id,
            mapping.connection_id,
            mapping.entity,
            mapping.old_identifier,
            mapping.new_identifier,
            satellite,
            chrono::Utc::now().timestamp(),
        ],
    )?;
    Ok(inserted)
}

impl SqliteMappingStore {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl MappingStore for SqliteMappingStore {
    fn get_mapping(
        &self,
        connection_id: &str,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Option<Mapping>> {
        self.catalog
            .with_conn(|conn| select_by_triple(conn, connection_id, entity, old_identifier))
    }

    fn get_or_create_mapping(&self, new: NewMapping) -> Result<Mapping> {
        self.catalog.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(existing) =
                select_by_triple(&tx, &new.connection_id, &new.entity, &new.old_identifier)?
            {
                let requested = initial_identifier(&new);
                let mapping = match requested {
                    Some(new_id) if existing.new_identifier.is_none() => {
                        tx.execute(
                            "UPDATE swag_migration_mapping SET entity_uuid = ?1
                             WHERE id = ?2 AND entity_uuid IS NULL",
                            params![new_id, existing.id],
                        )?;
                        let mapping_id = existing.id.clone();
                        select_by_id(&tx, &mapping_id)?.unwrap_or(existing)
                    }
                    _ => existing,
                };
                tx.commit()?;
                return Ok(mapping);
            }

            let candidate = fresh_mapping(&new);
            if insert_if_absent(&tx, &candidate)? == 0 {
                log::debug!(
                    "mapping {}:{} created concurrently, re-reading",
                    new.entity,
                    new.old_identifier
                );
            }
            // Re-read so a concurrent winner's row is returned instead of ours.
            let stored = select_by_triple(&tx, &new.connection_id, &new.entity, &new.old_identifier)?
                .ok_or_else(|| {
                    StorageError::NotFound(format!("mapping {}:{}", new.entity, new.old_identifier))
                })?;
            tx.commit()?;
            Ok(stored)
        })
    }

    fn create_mapping(&self, new: NewMapping) -> Result<Mapping> {
        self.catalog.with_conn(|conn| {
            let candidate = fresh_mapping(&new);
            if insert_if_absent(conn, &candidate)? == 0 {
                return Err(duplicate(&new));
            }
            Ok(candidate)
        })
    }

    fn resolve_mapping(&self, mapping_id: &str, new_identifier: &str) -> Result<Mapping> {
        self.catalog.with_conn(|conn| {
            let tx = conn.transaction()?;
            let existing = select_by_id(&tx, mapping_id)?
                .ok_or_else(|| StorageError::NotFound(format!("mapping {mapping_id}")))?;
            let resolved = match existing.new_identifier.as_deref() {
                Some(current) if current == new_identifier => existing,
                Some(current) => {
                    return Err(StorageError::IdentifierRebind {
                        mapping_id: mapping_id.to_string(),
                        existing: current.to_string(),
                        requested: new_identifier.to_string(),
                    });
                }
                None => {
                    tx.execute(
                        "UPDATE swag_migration_mapping SET entity_uuid = ?1 WHERE id = ?2",
                        params![new_identifier, mapping_id],
                    )?;
                    Mapping {
                        new_identifier: Some(new_identifier.to_string()),
                        ..existing
                    }
                }
            };
            tx.commit()?;
            Ok(resolved)
        })
    }

    fn update_checksum(&self, mapping_id: &str, checksum: &str) -> Result<()> {
        self.catalog.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE swag_migration_mapping SET checksum = ?1 WHERE id = ?2",
                params![checksum, mapping_id],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(format!("mapping {mapping_id}")));
            }
            Ok(())
        })
    }

    fn list_mappings(&self, connection_id: &str, entity: &str) -> Result<Vec<Mapping>> {
        self.catalog.with_conn(|conn| {
            let sql = format!(
                "SELECT {MAPPING_COLUMNS} FROM swag_migration_mapping
                 WHERE connection_id = ?1 AND entity = ?2 ORDER BY created_at, old_identifier"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![connection_id, entity], row_to_mapping)?;
            let mut out = Vec::new();
            for row in rows {
                if let Some(mapping) = hydrate(Some(row?))? {
                    out.push(mapping);
                }
            }
            Ok(out)
        })
    }
}

// --- In-memory ---

type TripleKey = (String, String, String);

/// Mapping store for dry runs and tests. One lock guards the whole table.
#[derive(Default)]
pub struct InMemoryMappingStore {
    rows: Mutex<HashMap<TripleKey, Mapping>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(connection_id: &str, entity: &str, old_identifier: &str) -> TripleKey {
        (
            connection_id.to_string(),
            entity.to_string(),
            old_identifier.to_string(),
        )
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TripleKey, Mapping>>> {
        self.rows
            .lock()
            .map_err(|_| StorageError::poisoned("mapping table"))
    }
}

impl MappingStore for InMemoryMappingStore {
    fn get_mapping(
        &self,
        connection_id: &str,
        entity: &str,
        old_identifier: &str,
    ) -> Result<Option<Mapping>> {
        let rows = self.lock()?;
        Ok(rows
            .get(&Self::key(connection_id, entity, old_identifier))
            .cloned())
    }

    fn get_or_create_mapping(&self, new: NewMapping) -> Result<Mapping> {
        let mut rows = self.lock()?;
        let key = Self::key(&new.connection_id, &new.entity, &new.old_identifier);
        let resolved = initial_identifier(&new);
        let entry = rows.entry(key).or_insert_with(|| fresh_mapping(&new));
        if entry.new_identifier.is_none() {
            entry.new_identifier = resolved;
        }
        Ok(entry.clone())
    }

    fn create_mapping(&self, new: NewMapping) -> Result<Mapping> {
        let mut rows = self.lock()?;
        let key = Self::key(&new.connection_id, &new.entity, &new.old_identifier);
        if rows.contains_key(&key) {
            return Err(duplicate(&new));
        }
        let mapping = fresh_mapping(&new);
        rows.insert(key, mapping.clone());
        Ok(mapping)
    }

    fn resolve_mapping(&self, mapping_id: &str, new_identifier: &str) -> Result<Mapping> {
        let mut rows = self.lock()?;
        let mapping = rows
            .values_mut()
            .find(|m| m.id == mapping_id)
            .ok_or_else(|| StorageError::NotFound(format!("mapping {mapping_id}")))?;
        match mapping.new_identifier.as_deref() {
            Some(current) if current != new_identifier => Err(StorageError::IdentifierRebind {
                mapping_id: mapping_id.to_string(),
                existing: current.to_string(),
                requested: new_identifier.to_string(),
            }),
            _ => {
                mapping.new_identifier = Some(new_identifier.to_string());
                Ok(mapping.clone())
            }
        }
    }

    fn update_checksum(&self, mapping_id: &str, checksum: &str) -> Result<()> {
        let mut rows = self.lock()?;
        let mapping = rows
            .values_mut()
            .find(|m| m.id == mapping_id)
            .ok_or_else(|| StorageError::NotFound(format!("mapping {mapping_id}")))?;
        mapping.checksum = Some(checksum.to_string());
        Ok(())
    }

    fn list_mappings(&self, connection_id: &str, entity: &str) -> Result<Vec<Mapping>> {
        let rows = self.lock()?;
        let mut out: Vec<Mapping> = rows
            .values()
            .filter(|m| m.connection_id == connection_id && m.entity == entity)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.old_identifier.cmp(&b.old_identifier));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sqlite_store() -> SqliteMappingStore {
        let catalog = Catalog::in_memory().unwrap();
        catalog.initialize_schema().unwrap();
        SqliteMappingStore::new(catalog)
    }

    fn stores() -> Vec<(&'static str, Box<dyn MappingStore>)> {
        vec![
            ("sqlite", Box::new(sqlite_store())),
            ("memory", Box::new(InMemoryMappingStore::new())),
        ]
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        for (name, store) in stores() {
            let first = store
                .get_or_create_mapping(NewMapping::new("conn", "customer", "1"))
                .unwrap();
            let second = store
                .get_or_create_mapping(NewMapping::new("conn", "customer", "1"))
                .unwrap();
            assert_eq!(first.id, second.id, "{name}");
            assert_eq!(first.new_identifier, second.new_identifier, "{name}");
            assert!(first.new_identifier.is_some(), "{name}");
        }
    }

    #[test]
    fn test_forced_identifier_does_not_rebind_existing() {
        for (name, store) in stores() {
            let first = store
                .get_or_create_mapping(
                    NewMapping::new("conn", "tax", "19").with_new_identifier("aaaa"),
                )
                .unwrap();
            let second = store
                .get_or_create_mapping(
                    NewMapping::new("conn", "tax", "19").with_new_identifier("bbbb"),
                )
                .unwrap();
            assert_eq!(first.new_id(), Some("aaaa"), "{name}");
            assert_eq!(second.new_id(), Some("aaaa"), "{name}");
        }
    }

    #[test]
    fn test_create_mapping_rejects_duplicates() {
        for (name, store) in stores() {
            store
                .create_mapping(NewMapping::new("conn", "currency", "EUR"))
                .unwrap();
            let err = store
                .create_mapping(NewMapping::new("conn", "currency", "EUR"))
                .unwrap_err();
            assert!(matches!(err, StorageError::DuplicateMapping { .. }), "{name}");
            // Another connection is a separate namespace.
            assert!(
                store
                    .create_mapping(NewMapping::new("other", "currency", "EUR"))
                    .is_ok(),
                "{name}"
            );
        }
    }

    #[test]
    fn test_unresolved_mapping_resolves_once() {
        for (name, store) in stores() {
            let pending = store
                .get_or_create_mapping(NewMapping::new("conn", "media", "5").unresolved())
                .unwrap();
            assert!(pending.new_identifier.is_none(), "{name}");

            let resolved = store.resolve_mapping(&pending.id, "cafe").unwrap();
            assert_eq!(resolved.new_id(), Some("cafe"), "{name}");
            assert!(store.resolve_mapping(&pending.id, "cafe").is_ok(), "{name}");
            let err = store.resolve_mapping(&pending.id, "beef").unwrap_err();
            assert!(matches!(err, StorageError::IdentifierRebind { .. }), "{name}");
        }
    }

    #[test]
    fn test_satellite_data_and_checksum_persist() {
        for (name, store) in stores() {
            let mapping = store
                .get_or_create_mapping(
                    NewMapping::new("conn", "product_custom_field", "attr1")
                        .with_satellite(json!({"columnType": "integer"})),
                )
                .unwrap();
            store.update_checksum(&mapping.id, "sum").unwrap();

            let stored = store
                .get_mapping("conn", "product_custom_field", "attr1")
                .unwrap()
                .unwrap();
            assert_eq!(stored.satellite_data, Some(json!({"columnType": "integer"})), "{name}");
            assert_eq!(stored.checksum.as_deref(), Some("sum"), "{name}");
            assert!(store.update_checksum("missing", "sum").is_err(), "{name}");
        }
    }

    #[test]
    fn test_list_mappings_scoped_by_entity() {
        for (name, store) in stores() {
            store.get_or_create_mapping(NewMapping::new("conn", "category", "1")).unwrap();
            store.get_or_create_mapping(NewMapping::new("conn", "category", "2")).unwrap();
            store.get_or_create_mapping(NewMapping::new("conn", "product", "1")).unwrap();
            assert_eq!(store.list_mappings("conn", "category").unwrap().len(), 2, "{name}");
            assert!(store.get_mapping("conn", "category", "3").unwrap().is_none(), "{name}");
        }
    }
}
