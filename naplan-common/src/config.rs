//! Bootstrap configuration loading and path resolution
//!
//! Input and output locations are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file never aborts a run: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming the input directory
pub const INPUT_DIR_ENV: &str = "NAPLAN_INPUT_DIR";

/// Environment variable naming the output directory
pub const OUTPUT_DIR_ENV: &str = "NAPLAN_OUTPUT_DIR";

/// Compiled default input directory (relative to the working directory)
pub const DEFAULT_INPUT_DIR: &str = "raw_data";

/// Compiled default output directory (relative to the working directory)
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Compiled default database file name, created inside the output directory
pub const DEFAULT_DATABASE_FILE: &str = "naplan.db";

/// Where flattened tables are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// SQLite database only
    Database,
    /// CSV exports only
    Csv,
    /// SQLite database and CSV exports
    #[default]
    Both,
}

impl OutputMode {
    pub fn writes_database(self) -> bool {
        matches!(self, OutputMode::Database | OutputMode::Both)
    }

    pub fn writes_csv(self) -> bool {
        matches!(self, OutputMode::Csv | OutputMode::Both)
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "database" | "db" => Ok(OutputMode::Database),
            "csv" => Ok(OutputMode::Csv),
            "both" => Ok(OutputMode::Both),
            other => Err(format!(
                "unknown output mode '{}' (expected database, csv or both)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputMode::Database => "database",
            OutputMode::Csv => "csv",
            OutputMode::Both => "both",
        };
        f.write_str(name)
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent values fall through to environment
/// variables and compiled defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Directory holding the yearly JSON exports
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving the database file and CSV exports
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Database file name (relative to the output directory) or absolute path
    #[serde(default)]
    pub database_file: Option<PathBuf>,

    /// Output mode (database, csv, both)
    #[serde(default)]
    pub mode: Option<OutputMode>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Question projection settings (optional)
    #[serde(default)]
    pub questions: QuestionsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Question column whitelist
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QuestionsConfig {
    /// Columns kept on flattened questions; all columns when absent
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot drive a run
    pub fn validate(&self) -> Result<()> {
        if let Some(columns) = &self.questions.columns {
            if columns.is_empty() {
                return Err(Error::InvalidInput(
                    "[questions] columns must list at least one column".to_string(),
                ));
            }
            if let Some(blank) = columns.iter().find(|c| c.trim().is_empty()) {
                return Err(Error::InvalidInput(format!(
                    "[questions] columns contains a blank name: '{}'",
                    blank
                )));
            }
        }
        Ok(())
    }

    /// Resolve the database file location for a given output directory
    pub fn database_path(&self, output_dir: &Path) -> PathBuf {
        match &self.database_file {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => output_dir.join(file),
            None => output_dir.join(DEFAULT_DATABASE_FILE),
        }
    }
}

/// Load bootstrap configuration
///
/// An explicitly requested file must exist and parse. Without an explicit
/// path the platform default location is tried; if nothing is found the
/// compiled defaults are returned.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        return TomlConfig::from_toml_str(&content);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            info!("Loaded configuration from {}", path.display());
            TomlConfig::from_toml_str(&content)
        }
        Some(path) => {
            warn!(
                "No config file at {}, using defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Platform config file location (`<config_dir>/naplan-etl/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("naplan-etl").join("config.toml"))
}

/// Resolve a path following the four-tier priority order
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &str,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: Compiled default
    PathBuf::from(default)
}

/// Resolve the input directory
pub fn resolve_input_dir(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    resolve_path(
        cli_arg,
        INPUT_DIR_ENV,
        config.input_dir.as_deref(),
        DEFAULT_INPUT_DIR,
    )
}

/// Resolve the output directory
pub fn resolve_output_dir(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    resolve_path(
        cli_arg,
        OUTPUT_DIR_ENV,
        config.output_dir.as_deref(),
        DEFAULT_OUTPUT_DIR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!("database".parse::<OutputMode>().unwrap(), OutputMode::Database);
        assert_eq!("DB".parse::<OutputMode>().unwrap(), OutputMode::Database);
        assert_eq!(" csv ".parse::<OutputMode>().unwrap(), OutputMode::Csv);
        assert_eq!("both".parse::<OutputMode>().unwrap(), OutputMode::Both);
        assert!("parquet".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_output_mode_targets() {
        assert!(OutputMode::Both.writes_database());
        assert!(OutputMode::Both.writes_csv());
        assert!(!OutputMode::Csv.writes_database());
        assert!(!OutputMode::Database.writes_csv());
    }

    #[test]
    fn test_empty_question_whitelist_rejected() {
        let err = TomlConfig::from_toml_str("[questions]\ncolumns = []\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = TomlConfig::from_toml_str("[questions]\ncolumns = [\"questionId\", \" \"]\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_database_path_resolution() {
        let output = Path::new("/data/out");

        let config = TomlConfig::default();
        assert_eq!(config.database_path(output), PathBuf::from("/data/out/naplan.db"));

        let config = TomlConfig {
            database_file: Some(PathBuf::from("results.sqlite")),
            ..Default::default()
        };
        assert_eq!(config.database_path(output), PathBuf::from("/data/out/results.sqlite"));

        let config = TomlConfig {
            database_file: Some(PathBuf::from("/var/lib/naplan.db")),
            ..Default::default()
        };
        assert_eq!(config.database_path(output), PathBuf::from("/var/lib/naplan.db"));
    }
}
