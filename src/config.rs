use crate::error::{Error, Result};
use crate::storage::constants::{DEFAULT_ACTIVE_DIR, DEFAULT_FS_ROOT, DEFAULT_TRASH_DIR};
use crate::storage::{StorageConfig, StorageProvider};
use std::env;
use std::str::FromStr;

/// Read-only view of the variables configuration is resolved from.
struct EnvVars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvVars<'_> {
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    // Helper function to reduce repetitive environment variable loading logic.
    fn get_env_var(&self, primary_key: &str, secondary_key: &str) -> Result<String> {
        self.first_of(&[primary_key, secondary_key])
            .ok_or_else(|| Error::MissingEnvVar {
                key: format!("{primary_key} or {secondary_key}"),
            })
    }

    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.var(key))
    }

    /// Whether bucket credentials for the default cloud provider are present.
    fn cloud_credentials_present(&self) -> bool {
        self.get_env_var("STORAGE_BUCKET", "AWS_S3_BUCKET").is_ok()
            && self
                .get_env_var("STORAGE_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID")
                .is_ok()
            && self
                .get_env_var("STORAGE_ACCESS_KEY_SECRET", "AWS_SECRET_ACCESS_KEY")
                .is_ok()
    }
}

/// Load storage configuration from environment variables.
///
/// An explicit `STORAGE_PROVIDER` wins. Without it, cloud credentials select
/// S3 and their absence selects the local directory pair.
pub fn load_storage_config() -> Result<StorageConfig> {
    load_storage_config_from(&|key: &str| env::var(key).ok())
}

/// Same as [`load_storage_config`] with an explicit variable lookup.
pub fn load_storage_config_from(lookup: &dyn Fn(&str) -> Option<String>) -> Result<StorageConfig> {
    let vars = EnvVars { lookup };

    let provider_str = match vars.var("STORAGE_PROVIDER") {
        Some(value) => value,
        None if vars.cloud_credentials_present() => "s3".to_string(),
        None => "local".to_string(),
    };
    let provider = StorageProvider::from_str(&provider_str)?;

    let mut config = match provider {
        StorageProvider::Local => StorageConfig::local(DEFAULT_ACTIVE_DIR, DEFAULT_TRASH_DIR),
        StorageProvider::Oss => load_oss_config(&vars)?,
        StorageProvider::S3 => load_s3_config(&vars, &provider_str)?,
        StorageProvider::Fs => load_fs_config(&vars),
    };

    if let Some(dir) = vars.var("STORAGE_ACTIVE_DIR") {
        config.active_dir = dir.into();
    }
    if let Some(dir) = vars.var("STORAGE_TRASH_DIR") {
        config.trash_dir = dir.into();
    }
    log::debug!("resolved storage config provider={:?}", config.provider);
    Ok(config)
}

/// Load OSS (Alibaba Cloud) configuration
fn load_oss_config(vars: &EnvVars<'_>) -> Result<StorageConfig> {
    let bucket = vars.get_env_var("STORAGE_BUCKET", "OSS_BUCKET")?;
    let access_key_id = vars.get_env_var("STORAGE_ACCESS_KEY_ID", "OSS_ACCESS_KEY_ID")?;
    let access_key_secret =
        vars.get_env_var("STORAGE_ACCESS_KEY_SECRET", "OSS_ACCESS_KEY_SECRET")?;

    let endpoint = vars
        .first_of(&["STORAGE_ENDPOINT", "OSS_ENDPOINT"])
        .unwrap_or_else(|| "https://oss-cn-hangzhou.aliyuncs.com".to_string());

    let mut config = StorageConfig::oss(bucket, access_key_id, access_key_secret);
    config.endpoint = Some(endpoint);
    Ok(config)
}

/// Load S3 (AWS or MinIO) configuration
fn load_s3_config(vars: &EnvVars<'_>, provider_str: &str) -> Result<StorageConfig> {
    let is_minio = provider_str.eq_ignore_ascii_case("minio");

    let (bucket_alias, key_alias, secret_alias) = if is_minio {
        ("MINIO_BUCKET", "MINIO_ACCESS_KEY", "MINIO_SECRET_KEY")
    } else {
        ("AWS_S3_BUCKET", "AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY")
    };

    let bucket = vars.get_env_var("STORAGE_BUCKET", bucket_alias)?;
    let access_key_id = vars.get_env_var("STORAGE_ACCESS_KEY_ID", key_alias)?;
    let secret_access_key = vars.get_env_var("STORAGE_ACCESS_KEY_SECRET", secret_alias)?;

    let region = vars.first_of(&["STORAGE_REGION", "AWS_DEFAULT_REGION", "MINIO_DEFAULT_REGION"]);

    let endpoint = if is_minio {
        Some(
            vars.first_of(&["STORAGE_ENDPOINT", "MINIO_ENDPOINT"])
                .unwrap_or_else(|| "http://localhost:9000".to_string()),
        )
    } else {
        vars.var("STORAGE_ENDPOINT")
    };

    let mut config = StorageConfig::s3(bucket, access_key_id, secret_access_key, region);
    config.endpoint = endpoint;
    Ok(config)
}

/// Load the filesystem-backed object store configuration (for development)
fn load_fs_config(vars: &EnvVars<'_>) -> StorageConfig {
    let root_path = vars
        .var("STORAGE_ROOT_PATH")
        .unwrap_or_else(|| DEFAULT_FS_ROOT.to_string());
    StorageConfig::fs(root_path)
}
