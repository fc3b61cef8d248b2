use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};
use crate::models::{MediaFile, MigrationData};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite database holding everything the migration writes about itself:
/// the mapping table, the anomaly log, converted payloads and pending media.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        Self::open(&config.catalog_path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn initialize_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "BEGIN;
                CREATE TABLE IF NOT EXISTS swag_migration_mapping (
                    id TEXT PRIMARY KEY,
                    connection_id TEXT NOT NULL,
                    entity TEXT NOT NULL,
                    old_identifier TEXT NOT NULL,
                    entity_uuid TEXT,
                    additional_data TEXT,
                    checksum TEXT,
                    created_at INTEGER NOT NULL,
                    UNIQUE (connection_id, entity, old_identifier)
                );
                CREATE INDEX IF NOT EXISTS idx_mapping_new_identifier
                    ON swag_migration_mapping (connection_id, entity, entity_uuid);
                CREATE TABLE IF NOT EXISTS migration_logs (
                    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    run_id TEXT,
                    level TEXT NOT NULL,
                    code TEXT NOT NULL,
                    entity TEXT,
                    source_id TEXT,
                    parameters TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS migration_data (
                    data_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    run_id TEXT NOT NULL,
                    entity TEXT NOT NULL,
                    source_id TEXT,
                    raw TEXT NOT NULL,
                    converted TEXT,
                    unmapped TEXT,
                    mapping_id TEXT,
                    checksum TEXT
                );
                CREATE TABLE IF NOT EXISTS media_files (
                    run_id TEXT NOT NULL,
                    entity TEXT NOT NULL,
                    uri TEXT NOT NULL,
                    file_name TEXT NOT NULL,
                    file_size INTEGER,
                    media_id TEXT NOT NULL,
                    written INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (run_id, media_id)
                );
                COMMIT;",
            )?;
            Ok(())
        })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::poisoned("catalog connection"))?;
        f(&mut guard)
    }

    pub fn insert_migration_data(&self, data: &MigrationData) -> Result<i64> {
        let raw = serde_json::to_string(&data.raw)?;
        let converted = data.converted.as_ref().map(serde_json::to_string).transpose()?;
        let unmapped = data.unmapped.as_ref().map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO migration_data (run_id, entity, source_id, raw, converted, unmapped, mapping_id, checksum)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    data.run_id,
                    data.entity,
                    data.source_id,
                    raw,
                    converted,
                    unmapped,
                    data.mapping_id,
                    data.checksum,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn migration_data_for_run(&self, run_id: &str, entity: &str) -> Result<Vec<MigrationData>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, entity, source_id, raw, converted, unmapped, mapping_id, checksum
                 FROM migration_data WHERE run_id = ?1 AND entity = ?2 ORDER BY data_id ASC",
            )?;
            let rows = stmt.query_map(params![run_id, entity], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (run_id, entity, source_id, raw, converted, unmapped, mapping_id, checksum) = row?;
                out.push(MigrationData {
                    run_id,
                    entity,
                    source_id,
                    raw: serde_json::from_str(&raw)?,
                    converted: converted.as_deref().map(serde_json::from_str).transpose()?,
                    unmapped: unmapped.as_deref().map(serde_json::from_str).transpose()?,
                    mapping_id,
                    checksum,
                });
            }
            Ok(out)
        })
    }

    pub fn upsert_media_file(&self, file: &MediaFile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO media_files (run_id, entity, uri, file_name, file_size, media_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(run_id, media_id) DO UPDATE SET
                    entity = excluded.entity,
                    uri = excluded.uri,
                    file_name = excluded.file_name,
                    file_size = excluded.file_size",
                params![
                    file.run_id,
                    file.entity,
                    file.uri,
                    file.file_name,
                    file.file_size,
                    file.media_id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn pending_media_files(&self, run_id: &str) -> Result<Vec<MediaFile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, entity, uri, file_name, file_size, media_id
                 FROM media_files WHERE run_id = ?1 AND written = 0 ORDER BY media_id",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok(MediaFile {
                    run_id: row.get(0)?,
                    entity: row.get(1)?,
                    uri: row.get(2)?,
                    file_name: row.get(3)?,
                    file_size: row.get(4)?,
                    media_id: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn setup() -> (Catalog, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path());
        let catalog = Catalog::new(&config).unwrap();
        catalog.initialize_schema().unwrap();
        (catalog, dir)
    }

    #[test]
    fn test_schema_is_idempotent() {
        let (catalog, _dir) = setup();
        assert!(catalog.initialize_schema().is_ok());
    }

    #[test]
    fn test_migration_data_roundtrip() {
        let (catalog, _dir) = setup();

        let data = MigrationData {
            run_id: "run-1".to_string(),
            entity: "customer".to_string(),
            source_id: Some("7".to_string()),
            raw: json!({"id": "7", "email": "a@example.com"}),
            converted: None,
            unmapped: Some(json!({"legacy": true})),
            mapping_id: None,
            checksum: Some("abc".to_string()),
        };
        let row_id = catalog.insert_migration_data(&data).unwrap();
        assert_eq!(row_id, 1);

        let rows = catalog.migration_data_for_run("run-1", "customer").unwrap();
        assert_eq!(rows, vec![data]);
        assert!(catalog.migration_data_for_run("run-2", "customer").unwrap().is_empty());
    }

    #[test]
    fn test_media_file_upsert_keeps_one_row_per_media() {
        let (catalog, _dir) = setup();
        let mut file = MediaFile {
            run_id: "run-1".to_string(),
            entity: "media".to_string(),
            uri: "https://shop.example/media/image/a.png".to_string(),
            file_name: "a".to_string(),
            file_size: Some(10),
            media_id: "m1".to_string(),
        };
        catalog.upsert_media_file(&file).unwrap();
        file.file_size = Some(20);
        catalog.upsert_media_file(&file).unwrap();

        let pending = catalog.pending_media_files("run-1").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].file_size, Some(20));
    }
}
