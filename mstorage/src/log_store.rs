use crate::catalog::Catalog;
use crate::errors::{Result, StorageError};
use crate::models::{LogEntry, LogLevel};
use rusqlite::params;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Append-only sink for conversion anomalies. Entries are never updated.
pub trait LogSink: Send + Sync {
    fn add_log_entry(&self, entry: LogEntry) -> Result<()>;

    /// All entries, oldest first, optionally restricted to one run.
    fn entries(&self, run_id: Option<&str>) -> Result<Vec<LogEntry>>;
}

pub struct SqliteLogStore {
    catalog: Catalog,
}

impl SqliteLogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Number of entries per code for a run, used for the end-of-run summary.
    pub fn count_by_code(&self, run_id: &str) -> Result<BTreeMap<String, i64>> {
        self.catalog.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, COUNT(*) FROM migration_logs WHERE run_id = ?1 GROUP BY code",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            Ok(rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()?)
        })
    }
}

impl LogSink for SqliteLogStore {
    fn add_log_entry(&self, entry: LogEntry) -> Result<()> {
        let parameters = serde_json::to_string(&entry.parameters)?;
        self.catalog.with_conn(|conn| {
            conn.execute(
                "INSERT INTO migration_logs (run_id, level, code, entity, source_id, parameters, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.run_id,
                    entry.level.as_str(),
                    entry.code,
                    entry.entity,
                    entry.source_id,
                    parameters,
                    chrono::Utc::now().timestamp(),
                ],
            )?;
            Ok(())
        })
    }

    fn entries(&self, run_id: Option<&str>) -> Result<Vec<LogEntry>> {
        self.catalog.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, level, code, entity, source_id, parameters FROM migration_logs
                 WHERE (?1 IS NULL OR run_id = ?1) ORDER BY log_id ASC",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (run_id, level, code, entity, source_id, parameters) = row?;
                let level = LogLevel::parse(&level).ok_or_else(|| {
                    StorageError::InvalidArg(format!("unknown log level '{level}'"))
                })?;
                out.push(LogEntry {
                    run_id,
                    level,
                    code,
                    entity,
                    source_id,
                    parameters: serde_json::from_str(&parameters)?,
                });
            }
            Ok(out)
        })
    }
}

/// Collects entries in memory; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn codes(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|e| e.code).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for MemoryLogSink {
    fn add_log_entry(&self, entry: LogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| StorageError::poisoned("log sink"))?
            .push(entry);
        Ok(())
    }

    fn entries(&self, run_id: Option<&str>) -> Result<Vec<LogEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::poisoned("log sink"))?;
        Ok(entries
            .iter()
            .filter(|e| run_id.is_none() || e.run_id.as_deref() == run_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(run: &str, code: &str) -> LogEntry {
        let mut parameters = BTreeMap::new();
        parameters.insert("emptyField".to_string(), "email".to_string());
        LogEntry {
            run_id: Some(run.to_string()),
            level: LogLevel::Warning,
            code: code.to_string(),
            entity: Some("customer".to_string()),
            source_id: Some("1".to_string()),
            parameters,
        }
    }

    #[test]
    fn test_sqlite_log_store_appends_in_order() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.initialize_schema().unwrap();
        let store = SqliteLogStore::new(catalog);

        store.add_log_entry(entry("r1", "A")).unwrap();
        store.add_log_entry(entry("r1", "B")).unwrap();
        store.add_log_entry(entry("r2", "A")).unwrap();

        let r1 = store.entries(Some("r1")).unwrap();
        assert_eq!(r1.iter().map(|e| e.code.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(r1[0].parameters.get("emptyField").map(String::as_str), Some("email"));
        assert_eq!(store.entries(None).unwrap().len(), 3);

        let counts = store.count_by_code("r1").unwrap();
        assert_eq!(counts.get("A"), Some(&1));
        assert_eq!(counts.get("B"), Some(&1));
    }

    #[test]
    fn test_memory_sink_filters_by_run() {
        let sink = MemoryLogSink::new();
        sink.add_log_entry(entry("r1", "A")).unwrap();
        sink.add_log_entry(entry("r2", "B")).unwrap();
        assert_eq!(sink.entries(Some("r2")).unwrap().len(), 1);
        assert_eq!(sink.codes(), vec!["A".to_string(), "B".to_string()]);
        sink.clear();
        assert!(sink.snapshot().is_empty());
    }
}
