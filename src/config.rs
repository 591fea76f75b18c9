//! Process configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. the TOML file named by `RUSTY_JNI_CONFIG`
//! 3. `RUSTY_JNI_DIR` and the `RUSTY_JNI_LOG_*` environment variables
//!
//! The loaded configuration is installed once per process and read through
//! [`global`].

use crate::errors::{BridgeError, BridgeResult};
use crate::logging::LogFormat;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

pub const CONFIG_VAR: &str = "RUSTY_JNI_CONFIG";
pub const DIR_VAR: &str = "RUSTY_JNI_DIR";
pub const LOG_LEVEL_VAR: &str = "RUSTY_JNI_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "RUSTY_JNI_LOG_FORMAT";
pub const LOG_FILE_VAR: &str = "RUSTY_JNI_LOG_FILE";
pub const LOG_SPANS_VAR: &str = "RUSTY_JNI_LOG_SPANS";

static CONFIG: OnceCell<BridgeConfig> = OnceCell::new();

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub dir_reader: DirReaderConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirReaderConfig {
    /// Directory listed by `dirReaderWithResult`
    #[serde(default = "default_dir")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Daily rolling log file; stderr when unset
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub span_events: bool,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for DirReaderConfig {
    fn default() -> Self {
        Self { path: default_dir() }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
            span_events: false,
        }
    }
}

impl LoggingSection {
    pub fn level(&self) -> BridgeResult<Level> {
        Level::from_str(self.level.trim())
            .map_err(|_| BridgeError::Config(format!("unknown log level `{}`", self.level)))
    }

    /// Apply `RUSTY_JNI_LOG_*` overrides found through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<()> {
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            self.level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_VAR) {
            self.format = format.parse()?;
        }
        if let Some(file) = lookup(LOG_FILE_VAR) {
            self.file = if file.is_empty() { None } else { Some(PathBuf::from(file)) };
        }
        if let Some(spans) = lookup(LOG_SPANS_VAR) {
            self.span_events = parse_flag(LOG_SPANS_VAR, &spans)?;
        }
        self.level().map(|_| ())
    }
}

fn parse_flag(var: &str, raw: &str) -> BridgeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BridgeError::Config(format!("{} must be a boolean, got `{}`", var, raw))),
    }
}

impl BridgeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> BridgeResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("failed to parse config: {}", e)))?;
        config.logging.level()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read config `{}`: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, then the config file, then environment overrides
    pub fn load() -> BridgeResult<Self> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// [`load`](Self::load) against an arbitrary variable source
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        let mut config = match lookup(CONFIG_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<()> {
        if let Some(dir) = lookup(DIR_VAR) {
            self.dir_reader.path = PathBuf::from(dir);
        }
        self.logging.apply_overrides(lookup)
    }

    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BridgeError::Config(format!("failed to serialize config: {}", e)))
    }
}

/// Install the process configuration; later calls are ignored.
///
/// Returns whether this call installed it.
pub fn install(config: BridgeConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// Process configuration, defaults if nothing was installed
pub fn global() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::default)
}
