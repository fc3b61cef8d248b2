use mstorage::catalog::Catalog;
use mstorage::errors::StorageError;
use mstorage::models::MediaFile;
use std::sync::Mutex;

use crate::error::Result;

/// Records that a media file must be transferred later. Converters only
/// register files; downloading is someone else's job.
pub trait MediaFileService: Send + Sync {
    fn save_media_file(&self, file: MediaFile) -> Result<()>;
}

/// Queues files in the catalog's `media_files` table.
pub struct CatalogMediaFileService {
    catalog: Catalog,
}

impl CatalogMediaFileService {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl MediaFileService for CatalogMediaFileService {
    fn save_media_file(&self, file: MediaFile) -> Result<()> {
        self.catalog.upsert_media_file(&file)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMediaFileService {
    files: Mutex<Vec<MediaFile>>,
}

impl InMemoryMediaFileService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<MediaFile> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl MediaFileService for InMemoryMediaFileService {
    fn save_media_file(&self, file: MediaFile) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| StorageError::Other(anyhow::anyhow!("media file queue lock poisoned")))?;
        match files
            .iter_mut()
            .find(|f| f.run_id == file.run_id && f.media_id == file.media_id)
        {
            Some(existing) => *existing = file,
            None => files.push(file),
        }
        Ok(())
    }
}
