//! Object store backend: namespaces are emulated as `active/` and `trash/`
//! key prefixes inside one bucket.
//!
//! Object stores have no rename, so `move_to` is a copy followed by a delete
//! of the source key. The pair is not atomic and nothing serializes
//! concurrent moves of the same name; the last writer wins. A failure after
//! the copy landed surfaces as `Error::PartialMove`.

use crate::error::{AlreadyExistsSnafu, Error, NotFoundSnafu, Result};
use crate::storage::constants::DEFAULT_CHUNK_SIZE;
use crate::storage::utils::path::{namespace_prefix, object_key, strip_namespace};
use crate::storage::{Namespace, ObjectMeta, StorageBackend, StorageConfig, StorageProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use opendal::{EntryMode, ErrorKind, Metadata, Operator};
use snafu::ensure;

pub struct ObjectStoreBackend {
    operator: Operator,
    provider: StorageProvider,
}

impl ObjectStoreBackend {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let operator = Self::build_operator(config)?;
        Ok(Self::from_operator(operator, config.provider))
    }

    pub fn from_operator(operator: Operator, provider: StorageProvider) -> Self {
        Self { operator, provider }
    }

    fn build_operator(config: &StorageConfig) -> Result<Operator> {
        match &config.provider {
            StorageProvider::Oss => {
                let mut builder = opendal::services::Oss::default().bucket(&config.bucket);
                if let Some(access_key_id) = &config.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }
                if let Some(access_key_secret) = &config.access_key_secret {
                    builder = builder.access_key_secret(access_key_secret);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Ok(Operator::new(builder)?.finish())
            }
            StorageProvider::S3 => {
                let mut builder = opendal::services::S3::default().bucket(&config.bucket);
                if let Some(access_key_id) = &config.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }
                if let Some(secret_access_key) = &config.access_key_secret {
                    builder = builder.secret_access_key(secret_access_key);
                }
                if let Some(region) = &config.region {
                    builder = builder.region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Ok(Operator::new(builder)?.finish())
            }
            StorageProvider::Fs => {
                let builder = opendal::services::Fs::default().root(config.fs_root());
                Ok(Operator::new(builder)?.finish())
            }
            StorageProvider::Local => Err(Error::UnsupportedProvider {
                provider: "local (not an object store)".to_string(),
            }),
        }
    }

    /// Create the `active/` and `trash/` directory markers.
    pub async fn ensure_layout(&self) -> Result<()> {
        for namespace in [Namespace::Active, Namespace::Trash] {
            self.operator.create_dir(&namespace_prefix(namespace)).await?;
        }
        Ok(())
    }

    async fn stat_file(&self, key: &str) -> Result<Option<Metadata>> {
        match self.operator.stat(key).await {
            Ok(meta) if meta.mode() == EntryMode::FILE => Ok(Some(meta)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn map_not_found(e: opendal::Error, namespace: Namespace, name: &str) -> Error {
        if e.kind() == ErrorKind::NotFound {
            Error::NotFound {
                namespace,
                name: name.to_string(),
            }
        } else {
            e.into()
        }
    }

    /// Stream copy a single object in chunks.
    async fn stream_copy(&self, src_key: &str, dest_key: &str) -> opendal::Result<()> {
        let file_size = self.operator.stat(src_key).await?.content_length();
        let mut writer = self.operator.writer(dest_key).await?;
        let mut offset = 0u64;

        while offset < file_size {
            let chunk_size = std::cmp::min(DEFAULT_CHUNK_SIZE as u64, file_size - offset);
            let data = self
                .operator
                .read_with(src_key)
                .range(offset..offset + chunk_size)
                .await?;
            let data_len = data.len();
            if data_len == 0 {
                break;
            }
            writer.write(data).await?;
            offset += data_len as u64;
        }

        writer.close().await?;
        Ok(())
    }

    async fn copy_key(&self, src_key: &str, dest_key: &str) -> opendal::Result<()> {
        if self.operator.info().full_capability().copy {
            self.operator.copy(src_key, dest_key).await
        } else {
            self.stream_copy(src_key, dest_key).await
        }
    }
}

/// Parse the timestamp a listing reported; unparseable values become `None`.
fn parse_modified(meta: &Metadata) -> Option<DateTime<Utc>> {
    let raw = meta.last_modified()?.to_rfc3339();
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            log::warn!("ignoring malformed last_modified '{raw}': {e}");
            None
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn provider(&self) -> StorageProvider {
        self.provider
    }

    async fn put(
        &self,
        namespace: Namespace,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let key = object_key(namespace, name);
        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(&key, content)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(&key, content).await?;
        }
        Ok(())
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Vec<u8>> {
        let buffer = self
            .operator
            .read(&object_key(namespace, name))
            .await
            .map_err(|e| Self::map_not_found(e, namespace, name))?;
        Ok(buffer.to_vec())
    }

    async fn exists(&self, namespace: Namespace, name: &str) -> Result<bool> {
        Ok(self.stat_file(&object_key(namespace, name)).await?.is_some())
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<ObjectMeta>> {
        let prefix = namespace_prefix(namespace);
        let mut lister = self.operator.lister(&prefix).await?;
        let mut entries = Vec::new();

        while let Some(entry) = lister.try_next().await? {
            if entry.metadata().mode() != EntryMode::FILE {
                continue;
            }
            let Some(name) = strip_namespace(&prefix, entry.path()) else {
                continue;
            };

            // Some services only report the mode while listing.
            let listed = entry.metadata();
            let meta = if listed.last_modified().is_some() {
                listed.clone()
            } else {
                match self.stat_file(entry.path()).await? {
                    Some(meta) => meta,
                    None => continue,
                }
            };

            entries.push(ObjectMeta {
                name: name.to_string(),
                size: meta.content_length(),
                modified: parse_modified(&meta),
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
        let src_key = object_key(from, from_name);
        ensure!(
            self.stat_file(&src_key).await?.is_some(),
            NotFoundSnafu {
                namespace: from,
                name: from_name,
            }
        );
        self.copy_key(&src_key, &object_key(to, to_name))
            .await
            .map_err(|e| Self::map_not_found(e, from, from_name))
    }

    async fn move_to(
        &self,
        from: Namespace,
        from_name: &str,
        to: Namespace,
        to_name: &str,
        overwrite: bool,
    ) -> Result<()> {
        let src_key = object_key(from, from_name);
        let dest_key = object_key(to, to_name);
        ensure!(
            self.stat_file(&src_key).await?.is_some(),
            NotFoundSnafu {
                namespace: from,
                name: from_name,
            }
        );
        ensure!(
            overwrite || self.stat_file(&dest_key).await?.is_none(),
            AlreadyExistsSnafu {
                namespace: to,
                name: to_name,
            }
        );

        self.copy_key(&src_key, &dest_key)
            .await
            .map_err(|e| Self::map_not_found(e, from, from_name))?;

        self.operator
            .delete(&src_key)
            .await
            .map_err(|e| Error::PartialMove {
                from: src_key.clone(),
                to: dest_key.clone(),
                source: Box::new(e.into()),
            })
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<()> {
        let key = object_key(namespace, name);
        ensure!(
            self.stat_file(&key).await?.is_some(),
            NotFoundSnafu { namespace, name }
        );
        self.operator.delete(&key).await?;
        Ok(())
    }
}
