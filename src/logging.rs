//! Logging for the bridge
//!
//! Built on `tracing`: an `EnvFilter` over a single `fmt` layer writing to
//! stderr or a daily rolling file. Stdout is never used; it belongs to the
//! host program.
//!
//! Installation happens at most once per process. A subscriber the host
//! already installed wins and ours is discarded.

use crate::config::LoggingSection;
use crate::errors::{BridgeError, BridgeResult};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt as stdfmt;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Keeps the file writer's worker alive for the life of the process
static LOGGING: OnceCell<Option<WorkerGuard>> = OnceCell::new();

const DEFAULT_PREFIX: &str = "rusty-jni.log";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(BridgeError::Config(format!("unknown log format `{}`", other))),
        }
    }
}

impl stdfmt::Display for LogFormat {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Daily rolling file `<directory>/<prefix>.<date>`
    File { directory: String, prefix: String },
}

impl LogOutput {
    /// Rolling file output for a configured log path
    pub fn file(path: &Path) -> Self {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        };
        let prefix = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        Self::File { directory, prefix }
    }
}

/// Resolved `[logging]` section, ready to install
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: bool,
    /// Comma-separated directives layered over `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn from_section(section: &LoggingSection) -> BridgeResult<Self> {
        Ok(Self {
            level: section.level()?,
            format: section.format,
            output: section.file.as_deref().map_or(LogOutput::Stderr, LogOutput::file),
            span_events: section.span_events,
            filter: None,
        })
    }

    /// `[logging]` defaults under the `RUSTY_JNI_LOG_*` variables
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        let mut section = LoggingSection::default();
        section.apply_overrides(lookup)?;
        Self::from_section(&section)
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process does anything. Returns whether this call
/// installed a subscriber; `false` also covers a host that already had one.
/// A log directory that cannot be used degrades to stderr instead of failing.
pub fn init_logging(config: LogConfig) -> bool {
    let mut installed = false;

    LOGGING.get_or_init(|| {
        let (filter, rejected) = build_filter(&config);
        let (layer, guard, fallback) = output_layer(&config);

        installed = tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_ok();

        if let Some(err) = fallback {
            tracing::warn!(error = %err, "Log file unavailable, writing to stderr");
        }
        for directive in rejected {
            tracing::warn!(directive = %directive, "Invalid filter directive");
        }
        tracing::debug!(format = %config.format, installed, "Logging initialized");
        guard
    });

    installed
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Layer for the configured output, plus the reason a file output fell back
/// to stderr
fn output_layer(config: &LogConfig) -> (BoxedLayer, Option<WorkerGuard>, Option<InitError>) {
    let stderr = || format_layer(config.format, std::io::stderr, config.span_events);

    let LogOutput::File { directory, prefix } = &config.output else {
        return (stderr(), None, None);
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix.as_str())
        .build(directory);

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (format_layer(config.format, writer, config.span_events), Some(guard), None)
        }
        Err(err) => (stderr(), None, Some(err)),
    }
}

fn format_layer<W>(format: LogFormat, writer: W, span_events: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let spans = if span_events { FmtSpan::NEW | FmtSpan::CLOSE } else { FmtSpan::NONE };
    let layer = fmt::layer().with_writer(writer).with_ansi(false).with_span_events(spans);

    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Filter plus any directives that failed to parse
fn build_filter(config: &LogConfig) -> (EnvFilter, Vec<String>) {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    let mut rejected = Vec::new();

    if let Some(directives) = &config.filter {
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => rejected.push(directive.to_string()),
            }
        }
    }

    (filter, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_builder() {
        let config = LogConfig::default()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("rusty_jni=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.span_events);
        assert_eq!(config.filter, Some("rusty_jni=trace".to_string()));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_file_output_splits_path() {
        let output = LogOutput::file(Path::new("/var/log/bridge.log"));
        assert_eq!(
            output,
            LogOutput::File {
                directory: "/var/log".to_string(),
                prefix: "bridge.log".to_string(),
            }
        );

        let bare = LogOutput::file(Path::new("bridge.log"));
        assert!(matches!(bare, LogOutput::File { ref directory, .. } if directory == "."));
    }

    #[test]
    fn test_from_section() {
        let section = LoggingSection {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            file: Some(PathBuf::from("logs/out.log")),
            span_events: true,
        };
        let config = LogConfig::from_section(&section).unwrap();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(matches!(config.output, LogOutput::File { .. }));
        assert!(config.span_events);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = LogConfig::from_lookup(|var| match var {
            "RUSTY_JNI_LOG_LEVEL" => Some("warn".to_string()),
            "RUSTY_JNI_LOG_FILE" => Some("/tmp/bridge/out.log".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::file(Path::new("/tmp/bridge/out.log")));
    }

    #[test]
    fn test_bad_directives_are_reported() {
        let config = LogConfig::default().with_filter("rusty_jni=debug,rusty_jni=loud");
        let (_, rejected) = build_filter(&config);
        assert_eq!(rejected, vec!["rusty_jni=loud".to_string()]);
    }

    #[test]
    fn test_file_output_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::default().with_output(LogOutput::file(&dir.path().join("bridge.log")));

        let (_, guard, fallback) = output_layer(&config);
        assert!(fallback.is_none());
        assert!(guard.is_some());
    }

    #[test]
    fn test_unwritable_log_dir_falls_back_to_stderr() {
        // Nothing can be created under /proc, even as root
        let config = LogConfig::default().with_output(LogOutput::File {
            directory: "/proc/rusty_jni_logs/nested".to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        });

        let outcome = std::panic::catch_unwind(|| output_layer(&config));
        let (_, guard, fallback) = outcome.expect("building the log output panicked");
        assert!(guard.is_none());
        assert!(fallback.is_some());
    }

    #[test]
    fn test_second_init_is_a_noop() {
        init_logging(LogConfig::default());
        assert!(!init_logging(LogConfig::default().with_level(Level::TRACE)));
    }
}
