//! Application configuration loaded from TOML.
//!
//! Lookup order: the file named by `CLIMATE_ATLAS_CONFIG`, then
//! `climate-atlas.toml` in the working directory, then built-in defaults.
//! Every section and field is optional in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CLIMATE_ATLAS_CONFIG";
/// Config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "climate-atlas.toml";
const APP_DIR: &str = "climate-atlas";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
    pub export: ExportConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub content: ContentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            export: ExportConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving exported files
    pub output_dir: PathBuf,
    /// Open the file with the system viewer after a successful export
    pub open_after_export: bool,
    /// Width of the off-screen export container (logical px)
    pub container_width: u32,
    /// Text of the watermark badge
    pub watermark_label: String,
    /// Optional logo image used instead of the text badge
    pub watermark_logo: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let base = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            output_dir: base.join(APP_DIR),
            open_after_export: false,
            container_width: 800,
            watermark_label: "Africa Climate Atlas".to_string(),
            watermark_logo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding persisted client state (cookie consent)
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            state_path: base.join(APP_DIR).join("state.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public key identifying the application to the identity provider
    pub publishable_key: String,
    pub sign_in_url: String,
    pub sign_up_url: String,
    /// Where the provider sends the user after signing in
    pub after_sign_in_url: String,
    /// Environment variable holding the session token
    pub session_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            publishable_key: String::new(),
            sign_in_url: "https://accounts.climate-atlas.africa/sign-in".to_string(),
            sign_up_url: "https://accounts.climate-atlas.africa/sign-up".to_string(),
            after_sign_in_url: "https://climate-atlas.africa/".to_string(),
            session_env: "CLIMATE_ATLAS_SESSION".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Catalog JSON replacing the bundled content
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config using the process environment and working directory.
    pub fn discover() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::discover_from(explicit, &cwd)
    }

    /// An explicit path must exist; the working-directory file is optional.
    pub fn discover_from(
        explicit: Option<PathBuf>,
        cwd: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load(&path)?;
            return Ok((config, Some(path)));
        }
        let local = cwd.join(CONFIG_FILENAME);
        if local.is_file() {
            let config = Self::load(&local)?;
            return Ok((config, Some(local)));
        }
        Ok((Self::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            log_level = "debug"

            [export]
            container_width = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.export.container_width, 1024);
        assert_eq!(
            config.export.watermark_label,
            ExportConfig::default().watermark_label
        );
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let mut config = AppConfig::default();
        config.auth.publishable_key = "pk_test_123".into();
        config.content.catalog_path = Some(PathBuf::from("/srv/atlas/content.json"));
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn discovery_order() {
        let dir = tempfile::tempdir().unwrap();

        let (config, source) = AppConfig::discover_from(None, dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(source.is_none());

        std::fs::write(dir.path().join(CONFIG_FILENAME), "log_level = \"warn\"\n").unwrap();
        let (config, source) = AppConfig::discover_from(None, dir.path()).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(source, Some(dir.path().join(CONFIG_FILENAME)));

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "log_level = \"trace\"\n").unwrap();
        let (config, _) = AppConfig::discover_from(Some(explicit), dir.path()).unwrap();
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::discover_from(Some(dir.path().join("nope.toml")), dir.path());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "export = 3\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILENAME));
    }
}
