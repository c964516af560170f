use super::app_config::AppConfig;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";
const HEADER: &str = "# sketch image pipeline settings.\n\
                      # [policy] seeds the hub's loading flags at startup; command-line\n\
                      # options override any value here.\n\n";

/// Errors raised while reading or writing the settings file.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Reads and writes `config.toml`.
#[derive(Debug)]
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Creates a manager rooted at the platform config dir.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        AppConfig::default_config_dir()
            .map(Self::with_dir)
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Creates a manager rooted at `path`.
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// File used for `path_override`, or `config.toml` in the config dir.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf)
    }

    /// Loads the settings and normalizes them.
    ///
    /// A missing file is created with the defaults. A file that does not
    /// parse yields the defaults and is left untouched so it can be fixed
    /// by hand.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or created.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = self.config_path(path_override);
        let mut config = match Self::read(&path) {
            Ok(Some(config)) => {
                debug!(path = %path.display(), "Loaded settings");
                config
            }
            Ok(None) => {
                info!(path = %path.display(), "Settings file not found, writing defaults");
                let config = AppConfig::default();
                self.save_config(&config, Some(&path))?;
                config
            }
            Err(ConfigError::TomlDe(e)) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Settings file does not parse, using defaults"
                );
                AppConfig::default()
            }
            Err(e) => return Err(e),
        };
        config.normalize();
        Ok(config)
    }

    /// Writes `config` atomically, creating the parent directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be serialized or written.
    pub fn save_config(
        &self,
        config: &AppConfig,
        path_override: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = self.config_path(path_override);
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::other("settings path has no parent"))?;
        fs::create_dir_all(parent)?;

        let body = toml::to_string_pretty(config)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(HEADER.as_bytes())?;
        temp_file.write_all(body.as_bytes())?;
        temp_file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(toml::from_str(&content)?))
    }
}
