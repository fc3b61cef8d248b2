use crate::errors::{Result, StorageError};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfig {
    pub catalog_path: PathBuf,
    pub target_path: PathBuf,
}

impl StorageConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            catalog_path: base_path.join("catalog.sqlite"),
            target_path: base_path.join("target.sqlite"),
        }
    }

    /// Builds a config from the process environment (after loading `.env`).
    ///
    /// `MIGRATION_BASE_PATH` picks the directory, the two path variables
    /// override individual files.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let base = std::env::var("MIGRATION_BASE_PATH").unwrap_or_else(|_| ".".to_string());
        if base.trim().is_empty() {
            return Err(StorageError::Config(
                "MIGRATION_BASE_PATH must not be empty".to_string(),
            ));
        }

        let mut config = Self::new(base);
        if let Ok(path) = std::env::var("MIGRATION_CATALOG_PATH") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("MIGRATION_TARGET_PATH") {
            config.target_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for path in [&self.catalog_path, &self.target_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_base() {
        let config = StorageConfig::new("/tmp/migration");
        assert_eq!(
            config.catalog_path,
            PathBuf::from("/tmp/migration/catalog.sqlite")
        );
        assert_eq!(
            config.target_path,
            PathBuf::from("/tmp/migration/target.sqlite")
        );
    }
}
