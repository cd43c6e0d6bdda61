//! Configuration loading and root folder resolution
//!
//! Bootstrap settings live in a small TOML file. Resolution order for the
//! root folder (which holds the database and the default config file):
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `VENUE_CANON_ROOT`
//! 3. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: built-in defaults are used and a
//! warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VENUE_CANON_ROOT";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VENUE_CANON_CONFIG";

/// Config file name looked up inside the root folder
pub const CONFIG_FILE_NAME: &str = "venue-canon.toml";

/// Database file name used when `database_path` is not configured
pub const DATABASE_FILE_NAME: &str = "venues.db";

/// Resolve the root folder: CLI argument, then environment, then OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    default_root_folder()
}

/// Resolve the config file path: CLI argument, then environment, then
/// `<root>/venue-canon.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>, root_folder: &Path) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    root_folder.join(CONFIG_FILE_NAME)
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/venue-canon (or /var/lib/venue-canon for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("venue-canon"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/venue-canon"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/venue-canon
        dirs::data_dir()
            .map(|d| d.join("venue-canon"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/venue-canon"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\venue-canon
        dirs::data_local_dir()
            .map(|d| d.join("venue-canon"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\venue-canon"))
    } else {
        PathBuf::from("./venue_canon_data")
    }
}

/// What the fuzzy stage does with a candidate identical to the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfMatchPolicy {
    /// Identical candidates are scored like any other (rating 1.0)
    #[default]
    Accept,
    /// Identical candidates are skipped before scoring
    Exclude,
}

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The service must restart to
/// pick up changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to SQLite database file (defaults to `<root>/venues.db`)
    pub database_path: Option<PathBuf>,

    /// HTTP bind address
    pub bind: String,

    /// HTTP server port
    pub port: u16,

    /// Matching thresholds and policies
    pub matching: MatchingConfig,

    /// Provider (source table) restrictions
    pub providers: ProvidersConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Matching configuration
///
/// Lower thresholds merge more aggressively and risk collapsing distinct
/// venues. Higher thresholds keep spelling variants apart and grow the
/// unmatched queue. Ratings equal to the threshold do not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Fuzzy threshold for single-name resolution against canonical venues
    pub threshold: f64,

    /// Fuzzy threshold for batch near-duplicate clustering
    pub batch_threshold: f64,

    /// Handling of candidates identical to the input during resolution
    pub self_match: SelfMatchPolicy,

    /// Persist fuzzy decisions as learned aliases
    pub learn_fuzzy_aliases: bool,
}

/// Provider restrictions for single-item resolution requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Accepted provider names; empty accepts any well-formed name
    pub allowed: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind: "127.0.0.1".to_string(),
            port: 5790,
            matching: MatchingConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            batch_threshold: 0.8,
            self_match: SelfMatchPolicy::Accept,
            learn_fuzzy_aliases: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields defaults. A file that exists but cannot be read
    /// or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside [0, 1] and malformed provider names
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("matching.threshold", self.matching.threshold),
            ("matching.batch_threshold", self.matching.batch_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if let Some(bad) = self
            .providers
            .allowed
            .iter()
            .find(|p| !is_well_formed_provider(p))
        {
            return Err(Error::Config(format!("Invalid provider name: {:?}", bad)));
        }

        Ok(())
    }

    /// Database file location for the given root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        match &self.database_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root_folder.join(path),
            None => root_folder.join(DATABASE_FILE_NAME),
        }
    }

    /// Whether `provider` may be used as a source table name
    pub fn is_allowed_provider(&self, provider: &str) -> bool {
        if !is_well_formed_provider(provider) {
            return false;
        }
        self.providers.allowed.is_empty() || self.providers.allowed.iter().any(|p| p == provider)
    }
}

/// Provider names are lowercase identifiers (`[a-z0-9_]+`)
pub fn is_well_formed_provider(provider: &str) -> bool {
    !provider.is_empty()
        && provider
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5790);
        assert_eq!(config.matching.threshold, 0.75);
        assert_eq!(config.matching.batch_threshold, 0.8);
        assert_eq!(config.matching.self_match, SelfMatchPolicy::Accept);
        assert!(!config.matching.learn_fuzzy_aliases);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TomlConfig::parse(
            r#"
            port = 6000

            [matching]
            threshold = 0.8
            self_match = "exclude"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.matching.threshold, 0.8);
        assert_eq!(config.matching.batch_threshold, 0.8);
        assert_eq!(config.matching.self_match, SelfMatchPolicy::Exclude);
        assert_eq!(config.bind, "127.0.0.1");
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let result = TomlConfig::parse("[matching]\nthreshold = 1.5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_provider_allow_list() {
        let mut config = TomlConfig::default();
        assert!(config.is_allowed_provider("biletix_events"));
        assert!(!config.is_allowed_provider("events; DROP TABLE x"));
        assert!(!config.is_allowed_provider(""));

        config.providers.allowed = vec!["passo_events".to_string()];
        assert!(config.is_allowed_provider("passo_events"));
        assert!(!config.is_allowed_provider("biletix_events"));
    }

    #[test]
    fn test_database_path_resolution() {
        let root = Path::new("/srv/venues");
        let mut config = TomlConfig::default();
        assert_eq!(config.database_path(root), root.join("venues.db"));

        config.database_path = Some(PathBuf::from("data/v.db"));
        assert_eq!(config.database_path(root), root.join("data/v.db"));

        config.database_path = Some(PathBuf::from("/tmp/other.db"));
        assert_eq!(config.database_path(root), PathBuf::from("/tmp/other.db"));
    }
}
