pub mod catalog;
pub mod config;
pub mod errors;
pub mod log_store;
pub mod mapping;
pub mod models;
pub mod target;
pub mod utils;

use crate::catalog::Catalog;
use crate::config::StorageConfig;
use crate::errors::Result;
use crate::log_store::SqliteLogStore;
use crate::mapping::SqliteMappingStore;
use crate::target::SqliteTargetRepository;
use std::sync::Arc;

/// The main entry point for the `mstorage` library.
///
/// `MStorage` bundles the persistence side of a migration run:
/// - a SQLite `Catalog` holding the mapping table, the anomaly log, converted
///   payloads and media files queued for transfer,
/// - the `MappingStore` and `LogSink` implementations on top of it,
/// - the destination system's own tables (`TargetRepository`), searched by
///   lookups when resolving reference data.
///
/// # Example
///
/// ```rust,no_run
/// use mstorage::{MStorage, config::StorageConfig};
/// use tempfile::tempdir;
///
/// let dir = tempdir().unwrap();
/// let storage = MStorage::new(StorageConfig::new(dir.path())).unwrap();
/// // storage.mappings, storage.logs, storage.target ...
/// ```
pub struct MStorage {
    pub config: StorageConfig,
    pub catalog: Catalog,
    pub mappings: Arc<SqliteMappingStore>,
    pub logs: Arc<SqliteLogStore>,
    pub target: Arc<SqliteTargetRepository>,
}

impl MStorage {
    /// Opens (or creates) both databases and initializes the catalog schema.
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.ensure_dirs()?;

        let catalog = Catalog::new(&config)?;
        catalog.initialize_schema()?;
        let target = Arc::new(SqliteTargetRepository::open(&config.target_path)?);

        log::debug!(
            "opened migration catalog at {} and target at {}",
            config.catalog_path.display(),
            config.target_path.display()
        );

        Ok(Self {
            mappings: Arc::new(SqliteMappingStore::new(catalog.clone())),
            logs: Arc::new(SqliteLogStore::new(catalog.clone())),
            catalog,
            target,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mstorage_initialization() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path().join("nested"));

        let storage = MStorage::new(config.clone());
        assert!(storage.is_ok());

        assert!(config.catalog_path.exists());
        assert!(config.target_path.exists());
    }
}
