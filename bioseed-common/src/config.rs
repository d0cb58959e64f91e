//! Configuration loading and root folder resolution
//!
//! Missing configuration never stops startup: a warning is logged and
//! compiled defaults apply. A config file that exists but fails to parse
//! is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "BIOSEED_ROOT";

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "BIOSEED_CONFIG";

/// Database file name used when the config does not name one
pub const DEFAULT_DATABASE_FILE: &str = "bioseed.db";

/// Raw contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub database_file: Option<String>,
    pub logging: LoggingConfig,
    pub effort: EffortConfig,
    pub seeds: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Accumulation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EffortConfig {
    /// Visits fetched per page while accumulating efforts
    pub page_size: i64,
    /// Specimens fetched per page while rebuilding visits
    pub specimen_page_size: i64,
    /// Kingdom implied for every specimen in this survey domain
    pub kingdom: String,
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            specimen_page_size: 500,
            kingdom: "Animalia".to_string(),
        }
    }
}

/// Seed selection defaults, overridable per run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub page_size: i64,
    pub min_species: i64,
    pub max_species: i64,
    pub max_clusters: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            min_species: 1,
            max_species: 1_000_000,
            max_clusters: 10,
        }
    }
}

/// Where a loaded [`TomlConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text and validate it
    pub fn parse(text: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Load the first config file found, or defaults if there is none
    ///
    /// Lookup order: explicit path, `BIOSEED_CONFIG`, platform config dir.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load_with_source(explicit)?;
        source.log();
        Ok(config)
    }

    /// Like [`TomlConfig::load_or_default`], but returns where the config
    /// came from instead of logging it, for callers that install their
    /// tracing subscriber only after the log level is known.
    pub fn load_with_source(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match locate_config_file(explicit) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.effort.page_size <= 0 {
            return Err(Error::Config("effort.page_size must be positive".to_string()));
        }
        if self.effort.specimen_page_size <= 0 {
            return Err(Error::Config(
                "effort.specimen_page_size must be positive".to_string(),
            ));
        }
        if self.seeds.page_size <= 0 {
            return Err(Error::Config("seeds.page_size must be positive".to_string()));
        }
        if self.effort.kingdom.trim().is_empty() {
            return Err(Error::Config("effort.kingdom must not be empty".to_string()));
        }
        if self.effort.kingdom.contains('|') {
            return Err(Error::Config("effort.kingdom must not contain '|'".to_string()));
        }
        Ok(())
    }

    /// Resolve the root folder and database path for this config
    pub fn database_path(&self, cli_root: Option<&Path>) -> PathBuf {
        let root = resolve_root_folder(cli_root, self.root_folder.as_deref());
        root.join(
            self.database_file
                .as_deref()
                .unwrap_or(DEFAULT_DATABASE_FILE),
        )
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `BIOSEED_ROOT` environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("bioseed").join("config.toml"))
        .filter(|p| p.exists())
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/bioseed (or /var/lib/bioseed for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("bioseed"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/bioseed"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("bioseed"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/bioseed"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("bioseed"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bioseed"))
    } else {
        PathBuf::from("./bioseed_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.effort.page_size, 500);
        assert_eq!(config.effort.kingdom, "Animalia");
        assert_eq!(config.seeds.max_clusters, 10);
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = TomlConfig::parse(
            r#"
            database_file = "survey.db"

            [seeds]
            max_clusters = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.database_file.as_deref(), Some("survey.db"));
        assert_eq!(config.seeds.max_clusters, 4);
        assert_eq!(config.seeds.page_size, 100);
        assert_eq!(config.effort.specimen_page_size, 500);
    }

    #[test]
    fn test_rejects_non_positive_page_size() {
        let err = TomlConfig::parse("[effort]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = TomlConfig::parse("[effort\npage_size = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_root_wins() {
        let root = resolve_root_folder(
            Some(Path::new("/tmp/cli-root")),
            Some(Path::new("/tmp/config-root")),
        );
        assert_eq!(root, PathBuf::from("/tmp/cli-root"));
    }

    #[test]
    fn test_database_path_joins_file_name() {
        let config = TomlConfig::parse("database_file = \"x.db\"").unwrap();
        let path = config.database_path(Some(Path::new("/data")));
        assert_eq!(path, PathBuf::from("/data/x.db"));
    }
}
