//! CLI configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, the TOML
//! config file, then command-line flags (and their environment variables).
//!
//! ```toml
//! system_identity = "SYSTEM"
//! manifest = "/etc/hookprobe/jobs.toml"
//! log_level = "info"
//! json_logs = false
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dispatch::SystemIdentity;
use serde::Deserialize;

/// Contents of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub system_identity: Option<String>,
    pub manifest: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        // Relative manifest paths are resolved against the config file's directory.
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Ok(Self {
            manifest: config.manifest.map(|m| resolve_path(base_dir, &m)),
            ..config
        })
    }
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Overrides supplied on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub manifest: Option<PathBuf>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub system_identity: SystemIdentity,
    pub manifest: PathBuf,
    pub log_level: tracing::Level,
    pub json_logs: bool,
}

impl Config {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let system_identity = match file.system_identity {
            Some(identity) => SystemIdentity::new(identity)
                .context("config: `system_identity` must not be empty")?,
            None => SystemIdentity::default(),
        };

        let Some(manifest) = overrides.manifest.or(file.manifest) else {
            bail!("no job manifest configured: pass --manifest or set `manifest` in the config file");
        };

        let level = overrides
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());
        let log_level = level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("config: unknown log level '{level}'"))?;

        Ok(Self {
            system_identity,
            manifest,
            log_level,
            json_logs: overrides.json_logs || file.json_logs.unwrap_or(false),
        })
    }
}
