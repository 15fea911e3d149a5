use snafu::Snafu;

use crate::storage::Namespace;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Environment variable '{key}' is required but not found"))]
    MissingEnvVar { key: String },

    #[snafu(display("Unsupported storage provider: {provider}"))]
    UnsupportedProvider { provider: String },

    #[snafu(display("Invalid {field}: {reason}"))]
    InvalidName { field: String, reason: String },

    #[snafu(display("File not found in {namespace}: {name}"))]
    NotFound { namespace: Namespace, name: String },

    #[snafu(display("A file named '{name}' already exists in {namespace}"))]
    AlreadyExists { namespace: Namespace, name: String },

    /// The destination was written but the source could not be removed; the
    /// object now exists under both keys and needs manual reconciliation.
    #[snafu(display("Partial move '{from}' -> '{to}': copied but source not removed: {source}"))]
    PartialMove {
        from: String,
        to: String,
        source: Box<Error>,
    },

    #[snafu(display("Failed to upload '{name}': {source}"))]
    UploadFailed { name: String, source: Box<Error> },

    #[snafu(display("Failed to create '{name}': {source}"))]
    CreateFailed { name: String, source: Box<Error> },

    #[snafu(display("Failed to list {namespace}: {source}"))]
    ListFailed {
        namespace: Namespace,
        source: Box<Error>,
    },

    #[snafu(display("Failed to move '{name}' from {from} to {to}: {source}"))]
    MoveFailed {
        name: String,
        from: Namespace,
        to: Namespace,
        source: Box<Error>,
    },

    #[snafu(display("Failed to rename '{old_name}' to '{new_name}': {source}"))]
    RenameFailed {
        old_name: String,
        new_name: String,
        source: Box<Error>,
    },

    #[snafu(display("Failed to delete '{name}': {source}"))]
    DeleteFailed { name: String, source: Box<Error> },

    #[snafu(display("Failed to download '{name}': {source}"))]
    DownloadFailed { name: String, source: Box<Error> },

    #[snafu(display("OpenDAL error: {source}"))]
    OpenDal { source: opendal::Error },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },
}

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Backend,
}

impl Error {
    /// Operation wrappers report the kind of their source, so a NotFound
    /// raised inside a backend call is still a NotFound to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyExists { .. } => ErrorKind::Conflict,
            Error::UploadFailed { source, .. }
            | Error::CreateFailed { source, .. }
            | Error::ListFailed { source, .. }
            | Error::MoveFailed { source, .. }
            | Error::RenameFailed { source, .. }
            | Error::DeleteFailed { source, .. }
            | Error::DownloadFailed { source, .. } => match source.kind() {
                ErrorKind::Validation => ErrorKind::Backend,
                kind => kind,
            },
            _ => ErrorKind::Backend,
        }
    }

    pub fn is_partial_move(&self) -> bool {
        match self {
            Error::PartialMove { .. } => true,
            Error::UploadFailed { source, .. }
            | Error::CreateFailed { source, .. }
            | Error::ListFailed { source, .. }
            | Error::MoveFailed { source, .. }
            | Error::RenameFailed { source, .. }
            | Error::DeleteFailed { source, .. }
            | Error::DownloadFailed { source, .. } => source.is_partial_move(),
            _ => false,
        }
    }
}

impl From<opendal::Error> for Error {
    fn from(error: opendal::Error) -> Self {
        Error::OpenDal { source: error }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io { source: error }
    }
}
