//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variable → XDG path → defaults.

use dr_report::{ReportConfig, ReportError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file.
pub const ENV_CONFIG_PATH: &str = "DASHREPORT_CONFIG";

const CONFIG_FILENAME: &str = "report.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "dashreport";

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// A loaded, validated configuration and its origin.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
    pub config: ReportConfig,
}

/// Pick the config file. An explicitly named file (CLI or environment) must
/// exist; the XDG file is used only when present.
pub fn resolve_config_path(
    cli_path: Option<&Path>,
    env_path: Option<&str>,
    xdg_dir: Option<&Path>,
) -> Result<(Option<PathBuf>, ConfigSource)> {
    if let Some(path) = cli_path {
        return require_file(path).map(|p| (Some(p), ConfigSource::CliArgument));
    }
    if let Some(path) = env_path.filter(|p| !p.trim().is_empty()) {
        return require_file(Path::new(path)).map(|p| (Some(p), ConfigSource::Environment));
    }
    if let Some(dir) = xdg_dir {
        let path = dir.join(APP_NAME).join(CONFIG_FILENAME);
        if path.is_file() {
            return Ok((Some(path), ConfigSource::XdgConfig));
        }
    }
    Ok((None, ConfigSource::BuiltinDefault))
}

fn require_file(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ReportError::InvalidConfig(format!(
            "config file not found: {}",
            path.display()
        )))
    }
}

/// Parse a config file; `.json` files are JSON, everything else TOML.
pub fn parse_config_file(path: &Path) -> Result<ReportConfig> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        ReportConfig::from_json(&text)
    } else {
        ReportConfig::from_toml(&text)
    };
    parsed.map_err(|e| ReportError::InvalidConfig(format!("{}: {}", path.display(), e)))
}

/// Resolve, load and validate the configuration.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig> {
    let env_path = std::env::var(ENV_CONFIG_PATH).ok();
    let xdg_dir = dirs::config_dir();
    let (path, source) = resolve_config_path(cli_path, env_path.as_deref(), xdg_dir.as_deref())?;

    let config = match &path {
        Some(path) => parse_config_file(path)?,
        None => ReportConfig::default(),
    };
    config.validate()?;
    debug!(source = %source, path = ?path, "Configuration resolved");
    Ok(ResolvedConfig {
        source,
        path,
        config,
    })
}
