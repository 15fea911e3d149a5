//! Backend-agnostic file operations: upload, listing, trash, restore, rename,
//! create and download, expressed only through [`StorageBackend`].

use crate::error::{AlreadyExistsSnafu, NotFoundSnafu, Result};
use crate::storage::constants::DEFAULT_CONTENT_TYPE;
use crate::storage::utils::path::validate_name;
use crate::storage::{Namespace, SharedBackend, StorageBackend};
use crate::wrap_err;
use snafu::ensure;

pub mod listing;

pub use listing::{FileEntry, ListQuery, SortKey, TrashEntry};

/// Bytes of an active file plus the name to save it under.
#[derive(Debug, Clone)]
pub struct Download {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Clone)]
pub struct FileManager {
    backend: SharedBackend,
}

impl FileManager {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Store an uploaded file in the active namespace, replacing any file
    /// of the same name.
    pub async fn upload(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        validate_name("file name", name)?;
        log::debug!(
            "upload provider={:?} name={} bytes={}",
            self.backend.provider(),
            name,
            content.len()
        );
        wrap_err!(
            self.backend
                .put(
                    Namespace::Active,
                    name,
                    content,
                    content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
                )
                .await,
            UploadFailed {
                name: name.to_string()
            }
        )?;
        log::info!("File {name} uploaded successfully.");
        Ok(())
    }

    /// Create a text file in the active namespace. Empty content is allowed
    /// and an existing file of the same name is replaced.
    pub async fn create_file(&self, name: &str, content: &str) -> Result<()> {
        validate_name("filename", name)?;
        log::debug!(
            "create_file provider={:?} name={}",
            self.backend.provider(),
            name
        );
        wrap_err!(
            self.backend
                .put(
                    Namespace::Active,
                    name,
                    content.as_bytes().to_vec(),
                    "text/plain; charset=utf-8",
                )
                .await,
            CreateFailed {
                name: name.to_string()
            }
        )?;
        log::info!("File {name} created successfully.");
        Ok(())
    }

    pub async fn list_files(&self, query: &ListQuery) -> Result<Vec<FileEntry>> {
        log::debug!(
            "list_files provider={:?} search={:?} sort_by={:?}",
            self.backend.provider(),
            query.search,
            query.sort_by
        );
        let raw = wrap_err!(
            self.backend.list(Namespace::Active).await,
            ListFailed {
                namespace: Namespace::Active
            }
        )?;
        Ok(listing::build_listing(raw, query))
    }

    pub async fn list_trash(&self, query: &ListQuery) -> Result<Vec<TrashEntry>> {
        log::debug!("list_trash provider={:?}", self.backend.provider());
        let raw = wrap_err!(
            self.backend.list(Namespace::Trash).await,
            ListFailed {
                namespace: Namespace::Trash
            }
        )?;
        Ok(listing::build_listing(raw, query))
    }

    /// Move an active file into the trash under the same name.
    pub async fn soft_delete(&self, name: &str) -> Result<()> {
        self.transfer(name, Namespace::Active, Namespace::Trash).await?;
        log::info!("File {name} moved to trash.");
        Ok(())
    }

    /// Move a trashed file back, replacing an active file of the same name.
    pub async fn restore(&self, name: &str) -> Result<()> {
        self.transfer(name, Namespace::Trash, Namespace::Active).await?;
        log::info!("File {name} restored.");
        Ok(())
    }

    async fn transfer(&self, name: &str, from: Namespace, to: Namespace) -> Result<()> {
        validate_name("file name", name)?;
        log::debug!(
            "transfer provider={:?} name={} from={} to={}",
            self.backend.provider(),
            name,
            from,
            to
        );
        let present = wrap_err!(
            self.backend.exists(from, name).await,
            MoveFailed {
                name: name.to_string(),
                from: from,
                to: to
            }
        )?;
        ensure!(present, NotFoundSnafu { namespace: from, name });

        wrap_err!(
            self.backend.move_to(from, name, to, name, true).await,
            MoveFailed {
                name: name.to_string(),
                from: from,
                to: to
            }
        )
    }

    /// Irrecoverably remove a file from the trash.
    pub async fn delete_permanently(&self, name: &str) -> Result<()> {
        validate_name("file name", name)?;
        log::debug!(
            "delete_permanently provider={:?} name={}",
            self.backend.provider(),
            name
        );
        let present = wrap_err!(
            self.backend.exists(Namespace::Trash, name).await,
            DeleteFailed {
                name: name.to_string()
            }
        )?;
        ensure!(
            present,
            NotFoundSnafu {
                namespace: Namespace::Trash,
                name,
            }
        );
        wrap_err!(
            self.backend.delete(Namespace::Trash, name).await,
            DeleteFailed {
                name: name.to_string()
            }
        )?;
        log::info!("File {name} permanently deleted.");
        Ok(())
    }

    /// Rename an active file. Unlike upload and restore, an existing file
    /// under `new_name` is never replaced.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        validate_name("old_name", old_name)?;
        validate_name("new_name", new_name)?;
        log::debug!(
            "rename provider={:?} old_name={} new_name={}",
            self.backend.provider(),
            old_name,
            new_name
        );

        let (old_present, new_present) = wrap_err!(
            async {
                let old = self.backend.exists(Namespace::Active, old_name).await?;
                let new = self.backend.exists(Namespace::Active, new_name).await?;
                Ok::<_, crate::error::Error>((old, new))
            }
            .await,
            RenameFailed {
                old_name: old_name.to_string(),
                new_name: new_name.to_string()
            }
        )?;
        ensure!(
            old_present,
            NotFoundSnafu {
                namespace: Namespace::Active,
                name: old_name,
            }
        );
        ensure!(
            !new_present,
            AlreadyExistsSnafu {
                namespace: Namespace::Active,
                name: new_name,
            }
        );

        wrap_err!(
            self.backend
                .move_to(Namespace::Active, old_name, Namespace::Active, new_name, false)
                .await,
            RenameFailed {
                old_name: old_name.to_string(),
                new_name: new_name.to_string()
            }
        )?;
        log::info!("File renamed from {old_name} to {new_name}.");
        Ok(())
    }

    pub async fn download(&self, name: &str) -> Result<Download> {
        validate_name("file name", name)?;
        log::debug!(
            "download provider={:?} name={}",
            self.backend.provider(),
            name
        );
        let content = wrap_err!(
            self.backend.get(Namespace::Active, name).await,
            DownloadFailed {
                name: name.to_string()
            }
        )?;
        Ok(Download {
            name: name.to_string(),
            content,
        })
    }
}
