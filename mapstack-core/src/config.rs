//! Process configuration
//!
//! Loaded once at startup from an optional TOML file, then adjusted by
//! environment variables, and passed explicitly to the components that
//! need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Which [`crate::storage::ContentStore`] backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    #[serde(alias = "s3")]
    Minio,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "minio" | "s3" => Ok(StorageBackend::Minio),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "storage.backend".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/mapstack.sqlite"),
        }
    }
}

/// S3 / MinIO connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub port: u16,
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost".to_string(),
            port: 9000,
            use_ssl: false,
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "mapstack-documents".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

impl ObjectStoreConfig {
    /// Full endpoint URL, e.g. `http://localhost:9000`
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: PathBuf,
    pub object: ObjectStoreConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_path: PathBuf::from("./storage"),
            object: ObjectStoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// File settings (or defaults) with process environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override fields from environment-style variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STORAGE_TYPE") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = lookup("LOCAL_STORAGE_PATH") {
            self.storage.local_path = PathBuf::from(v);
        }

        let object = &mut self.storage.object;
        if let Some(v) = lookup("MINIO_ENDPOINT") {
            object.endpoint = v;
        }
        if let Some(v) = lookup("MINIO_PORT") {
            object.port = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MINIO_PORT".to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("MINIO_USE_SSL") {
            object.use_ssl = parse_bool("MINIO_USE_SSL", &v)?;
        }
        if let Some(v) = lookup("MINIO_ROOT_USER") {
            object.access_key = v;
        }
        if let Some(v) = lookup("MINIO_ROOT_PASSWORD") {
            object.secret_key = v;
        }
        if let Some(v) = lookup("MINIO_BUCKET_NAME") {
            object.bucket = v;
        }
        if let Some(v) = lookup("MINIO_REGION") {
            object.region = v;
        }

        if let Some(v) = lookup("MAPSTACK_ADDR") {
            self.server.addr = v;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.storage.backend, StorageBackend::Local);
        assert_eq!(settings.storage.object.endpoint_url(), "http://localhost:9000");
        assert_eq!(settings.server.addr, "0.0.0.0:8000");
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
            [storage]
            backend = "s3"

            [storage.object]
            bucket = "docs"
            use_ssl = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Minio);
        assert_eq!(settings.storage.object.bucket, "docs");
        assert_eq!(settings.storage.object.port, 9000);
        assert_eq!(settings.storage.object.endpoint_url(), "https://localhost:9000");
        assert_eq!(settings.database, DatabaseConfig::default());
    }

    #[test]
    fn test_unknown_backend_in_file_fails() {
        let result = Settings::from_toml_str("[storage]\nbackend = \"ftp\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STORAGE_TYPE", "minio"),
            ("MINIO_PORT", "9100"),
            ("MINIO_USE_SSL", "true"),
            ("MINIO_BUCKET_NAME", "other"),
            ("DATABASE_PATH", "/tmp/x.sqlite"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.storage.backend, StorageBackend::Minio);
        assert_eq!(settings.storage.object.endpoint_url(), "https://localhost:9100");
        assert_eq!(settings.storage.object.bucket, "other");
        assert_eq!(settings.database.path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn test_env_invalid_backend() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_overrides(|k| (k == "STORAGE_TYPE").then(|| "ftp".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
