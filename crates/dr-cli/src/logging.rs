//! Structured logging setup.
//!
//! stdout is reserved for command payloads; all log output goes to stderr,
//! either human-readable or as JSON lines.
//!
//! Supports configuration via:
//! - Environment variables (DASHREPORT_LOG, DASHREPORT_LOG_FORMAT, RUST_LOG)
//! - CLI flags (-v, -q, --log-format)

use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "DASHREPORT_LOG";
pub const ENV_LOG_FORMAT: &str = "DASHREPORT_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// Machine-parseable JSON lines.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Completely silent.
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        f.write_str(name)
    }
}

impl LogLevel {
    /// Level for `-v` count and `-q`.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Whether to include timestamps in human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment and CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_values(
            std::env::var(ENV_LOG_LEVEL).ok().as_deref(),
            std::env::var(ENV_LOG_FORMAT).ok().as_deref(),
            cli_level,
            cli_format,
        )
    }

    /// Environment values first, CLI overrides last. Unparseable values are
    /// ignored.
    pub fn from_values(
        env_level: Option<&str>,
        env_format: Option<&str>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let mut config = LogConfig::default();
        if let Some(level) = env_level.and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = env_format.and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Some(level) = cli_level {
            config.level = level;
        }
        if let Some(format) = cli_format {
            config.format = format;
        }
        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Default filter directives when RUST_LOG is unset.
    pub fn directives(&self) -> String {
        format!(
            "dr_report={level},dr_cli={level},dashreport={level}",
            level = self.level
        )
    }
}

/// Initialize the logging subsystem. RUST_LOG, when set, replaces the
/// level-derived filter.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directives()));

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}
