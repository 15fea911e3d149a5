use filedeck::error::Result;
use filedeck::manager::{FileEntry, FileManager, ListQuery, TrashEntry};
use filedeck::storage::local::LocalBackend;
use filedeck::storage::object::ObjectStoreBackend;
use filedeck::storage::{SharedBackend, StorageConfig};
use libtest_mimic::{Failed, Trial};
use rand::Rng;
use rand::prelude::*;
use std::sync::{Arc, LazyLock};
use tempfile::TempDir;
use uuid::Uuid;

pub static TEST_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
});

/// One backend under test together with the directory backing it.
pub struct TestBackend {
    pub label: &'static str,
    pub manager: FileManager,
    _root: TempDir,
}

impl TestBackend {
    async fn local() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let backend = LocalBackend::new(root.path().join("uploads"), root.path().join("trash"));
        backend.ensure_roots().await?;
        Ok(Self::with_backend("local", Arc::new(backend), root))
    }

    /// Object store emulation driven through the filesystem service, so the
    /// prefix layout and copy-then-delete moves run without a network.
    async fn object_store() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let config = StorageConfig::fs(root.path().to_string_lossy().to_string());
        let backend = ObjectStoreBackend::new(&config)?;
        backend.ensure_layout().await?;
        Ok(Self::with_backend("object", Arc::new(backend), root))
    }

    fn with_backend(label: &'static str, backend: SharedBackend, root: TempDir) -> Self {
        Self {
            label,
            manager: FileManager::new(backend),
            _root: root,
        }
    }
}

pub async fn init_test_backends() -> Result<Vec<TestBackend>> {
    Ok(vec![
        TestBackend::local().await?,
        TestBackend::object_store().await?,
    ])
}

/// Hands out names that no other trial sharing the backend will use.
pub struct Fixture;

impl Fixture {
    /// A token to embed in every name a trial creates, so listings can be
    /// narrowed to that trial with a search.
    pub fn new_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    pub fn new_name(&self, token: &str, suffix: &str) -> String {
        format!("{token}-{suffix}")
    }

    pub fn new_content(&self, range: std::ops::Range<usize>) -> Vec<u8> {
        let mut rng = rand::rng();
        let size = rng.random_range(range);
        self.new_content_of_size(size)
    }

    pub fn new_content_of_size(&self, size: usize) -> Vec<u8> {
        let mut content = vec![0; size];
        rand::rng().fill_bytes(&mut content);
        content
    }
}

pub static TEST_FIXTURE: Fixture = Fixture;

pub fn search(token: &str) -> ListQuery {
    ListQuery {
        search: Some(token.to_string()),
        sort_by: None,
    }
}

pub fn search_sorted(token: &str, sort_by: &str) -> ListQuery {
    ListQuery {
        search: Some(token.to_string()),
        sort_by: Some(sort_by.to_string()),
    }
}

pub async fn active_files(manager: &FileManager, token: &str) -> Result<Vec<FileEntry>> {
    manager.list_files(&search(token)).await
}

pub async fn trashed_files(manager: &FileManager, token: &str) -> Result<Vec<TrashEntry>> {
    manager.list_trash(&search(token)).await
}

pub fn build_async_trial<F, Fut>(name: &str, backend: &TestBackend, f: F) -> Trial
where
    F: FnOnce(FileManager) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    let handle = TEST_RUNTIME.handle().clone();
    let manager = backend.manager.clone();

    Trial::test(format!("behavior::{}::{name}", backend.label), move || {
        handle
            .block_on(f(manager))
            .map_err(|err| Failed::from(err.to_string()))
    })
}

#[macro_export]
macro_rules! async_trials {
    ($backend:ident, $($test:ident),*) => {
        vec![$(build_async_trial(stringify!($test), $backend, $test),)*]
    };
}
