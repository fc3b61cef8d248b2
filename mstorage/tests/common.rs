use mstorage::{MStorage, config::StorageConfig};
use tempfile::TempDir;

#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: StorageConfig,
    pub storage: MStorage,
}

pub fn init_test_context() -> anyhow::Result<TestContext> {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = tempfile::tempdir()?;
    let config = StorageConfig::new(temp_dir.path());
    let storage = MStorage::new(config.clone())?;

    Ok(TestContext {
        temp_dir,
        config,
        storage,
    })
}
