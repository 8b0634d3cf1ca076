use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_debug, engine_info};
use serde::{Deserialize, Serialize};
use tubesweep_core::Pacing;
use tubesweep_engine::{ActionSettings, DevtoolsSettings};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/tubesweep.json";

/// User settings read from the JSON config file. Every field is optional
/// in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "DevtoolsHost")]
    pub devtools_host: String,
    #[serde(alias = "DevtoolsPort")]
    pub devtools_port: u16,
    /// Include patterns always applied by the history command.
    #[serde(alias = "HistoryFilter")]
    pub history_filter: Vec<String>,
    pub history_exclude: Vec<String>,
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    pub max_restarts: u32,
}

impl Default for Config {
    fn default() -> Self {
        let pacing = Pacing::default();
        Self {
            devtools_host: "localhost".to_string(),
            devtools_port: 9222,
            history_filter: Vec::new(),
            history_exclude: Vec::new(),
            pacing_min_ms: pacing.min_ms,
            pacing_max_ms: pacing.max_ms,
            max_restarts: ActionSettings::default().max_restarts,
        }
    }
}

impl Config {
    /// Reads the config at `path`, or at [`DEFAULT_CONFIG_PATH`] when none
    /// is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => expand_path(&path.to_string_lossy()),
            None => expand_path(DEFAULT_CONFIG_PATH),
        };

        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Command-line values replace the configured endpoint when given.
    pub fn apply_overrides(&mut self, host: Option<&str>, port: Option<u16>) {
        if let Some(host) = host.filter(|host| !host.trim().is_empty()) {
            self.devtools_host = host.trim().to_string();
        }
        if let Some(port) = port.filter(|port| *port != 0) {
            self.devtools_port = port;
        }
    }

    pub fn devtools(&self) -> DevtoolsSettings {
        DevtoolsSettings {
            host: self.devtools_host.clone(),
            port: self.devtools_port,
            ..DevtoolsSettings::default()
        }
    }

    pub fn action(&self) -> ActionSettings {
        ActionSettings {
            pacing: Pacing {
                min_ms: self.pacing_min_ms,
                max_ms: self.pacing_max_ms.max(self.pacing_min_ms),
            },
            max_restarts: self.max_restarts,
            ..ActionSettings::default()
        }
    }
}

/// Expands a leading `~` or `$HOME` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    let rest = if raw == "~" || raw == "$HOME" {
        Some("")
    } else {
        raw.strip_prefix("~/")
            .or_else(|| raw.strip_prefix("$HOME/"))
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}
