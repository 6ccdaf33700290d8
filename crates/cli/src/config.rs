//! CLI configuration
//!
//! Layered with the `config` crate: built-in defaults, then the first config
//! file found (or the one given with `--config`), then `GATHER__*`
//! environment variables.

use config::{Config, ConfigError, Environment, File};
use gather_core::{FileStorage, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (0 = none)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the access token is kept between runs
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    /// Where cookies (the refresh credential among them) are kept; defaults
    /// to `cookies.json` beside the token file
    #[serde(default)]
    pub cookie_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn file_storage(&self) -> gather_core::SessionResult<FileStorage> {
        match &self.token_path {
            Some(path) => Ok(FileStorage::new(path)),
            None => FileStorage::in_data_dir(),
        }
    }

    pub fn cookie_path(&self, token_path: &Path) -> PathBuf {
        self.cookie_path.clone().unwrap_or_else(|| {
            token_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("cookies.json")
        })
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl GatherConfig {
    /// Load configuration from `path`, or from the first default location that exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if let Some(found) = default_paths().into_iter().find(|p| p.exists()) {
                    builder = builder.add_source(File::from(found).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("GATHER")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("gather.toml"),
        PathBuf::from("config/gather.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("gather").join("gather.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_core::ContentionPolicy;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://gather.example"

[session]
check_interval_secs = 30
contention = "drop"

[storage]
token_path = "/tmp/gather-test/session.json"
"#
        )
        .unwrap();

        let config = GatherConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api.base_url, "https://gather.example");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.session.check_interval_secs, 30);
        assert_eq!(config.session.refresh_threshold_secs, 60);
        assert_eq!(config.session.contention, ContentionPolicy::Drop);
        assert_eq!(
            config.storage.token_path.as_deref(),
            Some(Path::new("/tmp/gather-test/session.json"))
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GatherConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let api = ApiConfig {
            timeout_secs: 0,
            ..ApiConfig::default()
        };
        assert_eq!(api.timeout(), None);
        assert_eq!(ApiConfig::default().timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_cookie_jar_sits_beside_token_file() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.cookie_path(Path::new("/var/lib/gather/session.json")),
            PathBuf::from("/var/lib/gather/cookies.json")
        );

        let storage = StorageConfig {
            cookie_path: Some(PathBuf::from("/tmp/jar.json")),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.cookie_path(Path::new("/var/lib/gather/session.json")),
            PathBuf::from("/tmp/jar.json")
        );
    }
}
