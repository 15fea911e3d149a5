//! Local filesystem backend: one directory per namespace.

use crate::error::{AlreadyExistsSnafu, Error, NotFoundSnafu, Result};
use crate::storage::{Namespace, ObjectMeta, StorageBackend, StorageProvider};
use async_trait::async_trait;
use snafu::ensure;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalBackend {
    active_root: PathBuf,
    trash_root: PathBuf,
}

impl LocalBackend {
    pub fn new(active_root: impl AsRef<Path>, trash_root: impl AsRef<Path>) -> Self {
        Self {
            active_root: active_root.as_ref().to_path_buf(),
            trash_root: trash_root.as_ref().to_path_buf(),
        }
    }

    /// Create both root directories if they are missing.
    pub async fn ensure_roots(&self) -> Result<()> {
        fs::create_dir_all(&self.active_root).await?;
        fs::create_dir_all(&self.trash_root).await?;
        Ok(())
    }

    fn root(&self, namespace: Namespace) -> &Path {
        match namespace {
            Namespace::Active => &self.active_root,
            Namespace::Trash => &self.trash_root,
        }
    }

    fn to_real_path(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.root(namespace).join(name)
    }

    async fn is_file(path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn map_not_found(e: io::Error, namespace: Namespace, name: &str) -> Error {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound {
                namespace,
                name: name.to_string(),
            }
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    async fn put(
        &self,
        namespace: Namespace,
        name: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        fs::write(self.to_real_path(namespace, name), content).await?;
        Ok(())
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Vec<u8>> {
        let real = self.to_real_path(namespace, name);
        ensure!(
            Self::is_file(&real).await?,
            NotFoundSnafu { namespace, name }
        );
        fs::read(&real)
            .await
            .map_err(|e| Self::map_not_found(e, namespace, name))
    }

    async fn exists(&self, namespace: Namespace, name: &str) -> Result<bool> {
        Self::is_file(&self.to_real_path(namespace, name)).await
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<ObjectMeta>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(self.root(namespace)).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Removed between readdir and stat.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }
            entries.push(ObjectMeta {
                name: entry.file_name().to_string_lossy().to_string(),
                size: meta.len(),
                modified: meta.modified().ok().map(Into::into),
            });
        }

        Ok(entries)
    }

    async fn copy(
        &self,
        from: Namespace,
        from_name: &str,
        to: Namespace,
        to_name: &str,
    ) -> Result<()> {
        let src = self.to_real_path(from, from_name);
        ensure!(
            Self::is_file(&src).await?,
            NotFoundSnafu {
                namespace: from,
                name: from_name,
            }
        );
        fs::copy(&src, self.to_real_path(to, to_name))
            .await
            .map_err(|e| Self::map_not_found(e, from, from_name))?;
        Ok(())
    }

    async fn move_to(
        &self,
        from: Namespace,
        from_name: &str,
        to: Namespace,
        to_name: &str,
        overwrite: bool,
    ) -> Result<()> {
        let src = self.to_real_path(from, from_name);
        let dst = self.to_real_path(to, to_name);
        ensure!(
            Self::is_file(&src).await?,
            NotFoundSnafu {
                namespace: from,
                name: from_name,
            }
        );
        ensure!(
            overwrite || !Self::is_file(&dst).await?,
            AlreadyExistsSnafu {
                namespace: to,
                name: to_name,
            }
        );

        let rename_err = match fs::rename(&src, &dst).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Self::map_not_found(e, from, from_name));
            }
            Err(e) => e,
        };

        // Roots on different filesystems cannot be renamed across.
        log::debug!(
            "rename {} -> {} failed ({rename_err}), falling back to copy",
            src.display(),
            dst.display()
        );
        fs::copy(&src, &dst)
            .await
            .map_err(|e| Self::map_not_found(e, from, from_name))?;
        fs::remove_file(&src)
            .await
            .map_err(|e| Error::PartialMove {
                from: src.display().to_string(),
                to: dst.display().to_string(),
                source: Box::new(e.into()),
            })
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<()> {
        let real = self.to_real_path(namespace, name);
        ensure!(Self::is_file(&real).await?, NotFoundSnafu { namespace, name });
        fs::remove_file(&real)
            .await
            .map_err(|e| Self::map_not_found(e, namespace, name))
    }
}
