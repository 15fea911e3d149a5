use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub mod constants;
pub mod local;
pub mod object;
pub mod utils;

use self::constants::{DEFAULT_ACTIVE_DIR, DEFAULT_FS_ROOT, DEFAULT_TRASH_DIR};
use self::local::LocalBackend;
use self::object::ObjectStoreBackend;

/// The two logical partitions a file can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Active,
    Trash,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Active => "active",
            Namespace::Trash => "trash",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw metadata of one stored file, as reported by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Primitive storage operations keyed by `(namespace, name)`.
///
/// Implementations never enforce name uniqueness on `put`; collision rules
/// belong to the caller.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn provider(&self) -> StorageProvider;

    /// Write `content`, silently replacing any existing file of that name.
    async fn put(
        &self,
        namespace: Namespace,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Read the full content of a file; `Error::NotFound` if absent.
    async fn get(&self, namespace: Namespace, name: &str) -> Result<Vec<u8>>;

    async fn exists(&self, namespace: Namespace, name: &str) -> Result<bool>;

    /// Unordered listing of the files in one namespace.
    async fn list(&self, namespace: Namespace) -> Result<Vec<ObjectMeta>>;

    /// Copy a file, replacing the destination if present.
    async fn copy(
        &self,
        from: Namespace,
        from_name: &str,
        to: Namespace,
        to_name: &str,
    ) -> Result<()>;

    /// Move a file. Fails with `Error::NotFound` when the source is absent and
    /// with `Error::AlreadyExists` when the destination exists and `overwrite`
    /// is false. A copy that landed without the source being removed is
    /// reported as `Error::PartialMove`.
    async fn move_to(
        &self,
        from: Namespace,
        from_name: &str,
        to: Namespace,
        to_name: &str,
        overwrite: bool,
    ) -> Result<()>;

    /// Permanently remove a file; `Error::NotFound` if absent.
    async fn delete(&self, namespace: Namespace, name: &str) -> Result<()>;
}

/// Backend handle shared by every request for the process lifetime.
pub type SharedBackend = Arc<dyn StorageBackend>;

/// Storage provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    /// Two sibling directories on local disk.
    Local,
    Oss,
    S3,
    /// Object store emulation on top of a local directory.
    Fs,
}

impl StorageProvider {
    pub fn is_object_store(&self) -> bool {
        !matches!(self, StorageProvider::Local)
    }
}

impl FromStr for StorageProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "oss" => Ok(Self::Oss),
            "s3" | "minio" => Ok(Self::S3),
            "fs" => Ok(Self::Fs),
            _ => Err(Error::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// Unified storage configuration for different providers
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub root_path: Option<String>,
    pub active_dir: PathBuf,
    pub trash_dir: PathBuf,
}

impl StorageConfig {
    pub fn local(active_dir: impl Into<PathBuf>, trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider: StorageProvider::Local,
            bucket: "local".to_string(),
            access_key_id: None,
            access_key_secret: None,
            endpoint: None,
            region: None,
            root_path: None,
            active_dir: active_dir.into(),
            trash_dir: trash_dir.into(),
        }
    }

    /// OSS is addressed by endpoint alone; the region is part of its host.
    pub fn oss(bucket: String, access_key_id: String, access_key_secret: String) -> Self {
        Self {
            provider: StorageProvider::Oss,
            bucket,
            access_key_id: Some(access_key_id),
            access_key_secret: Some(access_key_secret),
            ..Self::local(DEFAULT_ACTIVE_DIR, DEFAULT_TRASH_DIR)
        }
    }

    pub fn s3(
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
        region: Option<String>,
    ) -> Self {
        Self {
            provider: StorageProvider::S3,
            bucket,
            access_key_id: Some(access_key_id),
            access_key_secret: Some(secret_access_key),
            region,
            ..Self::local(DEFAULT_ACTIVE_DIR, DEFAULT_TRASH_DIR)
        }
    }

    pub fn fs(root_path: String) -> Self {
        Self {
            provider: StorageProvider::Fs,
            root_path: Some(root_path),
            ..Self::local(DEFAULT_ACTIVE_DIR, DEFAULT_TRASH_DIR)
        }
    }

    pub fn fs_root(&self) -> &str {
        self.root_path.as_deref().unwrap_or(DEFAULT_FS_ROOT)
    }
}

/// Create the local active/trash roots.
///
/// Failure is fatal only when the local backend is the one selected; with an
/// object store configured the directories are unused and the error is logged.
pub async fn prepare_local_roots(config: &StorageConfig) -> Result<()> {
    let backend = LocalBackend::new(&config.active_dir, &config.trash_dir);
    match backend.ensure_roots().await {
        Ok(()) => Ok(()),
        Err(e) if config.provider.is_object_store() => {
            log::warn!(
                "could not create local roots {} / {} (unused with provider {:?}): {e}",
                config.active_dir.display(),
                config.trash_dir.display(),
                config.provider
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Build the backend selected by `config`.
pub async fn connect(config: &StorageConfig) -> Result<SharedBackend> {
    log::debug!("connect provider={:?}", config.provider);
    match config.provider {
        StorageProvider::Local => Ok(Arc::new(LocalBackend::new(
            &config.active_dir,
            &config.trash_dir,
        ))),
        _ => {
            let backend = ObjectStoreBackend::new(config)?;
            backend.ensure_layout().await?;
            Ok(Arc::new(backend))
        }
    }
}
