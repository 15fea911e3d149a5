// Buffer related constants
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

// Local backend defaults
pub const DEFAULT_ACTIVE_DIR: &str = "uploads";
pub const DEFAULT_TRASH_DIR: &str = "trash";

// Filesystem-backed object store default
pub const DEFAULT_FS_ROOT: &str = "./storage";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
