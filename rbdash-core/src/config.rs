//! Dashboard configuration
//!
//! The application registry (which package ids are tracked, and where their
//! log documents live) plus log-store tuning. Loadable from a YAML file; the
//! defaults describe the tracked Threema applications.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One tracked application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Android package id, e.g. "ch.threema.app.libre"
    pub appid: String,

    /// Human-readable name shown by the dashboard
    pub display_name: String,

    /// URL of the application's JSON log document
    pub log_url: String,
}

/// Log store and upload tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Lifetime of a cached log snapshot, in seconds
    pub cache_ttl_secs: u64,

    /// Timeout for one log document fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Upper bound on an uploaded package, in bytes
    pub max_upload_bytes: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            cache_ttl_secs: 24 * 60 * 60,
            fetch_timeout_secs: 30,
            max_upload_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_apps")]
    pub apps: Vec<AppConfig>,

    #[serde(default)]
    pub log: LogSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            apps: default_apps(),
            log: LogSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Load from a path when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn app(&self, appid: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|app| app.appid == appid)
    }
}

fn default_apps() -> Vec<AppConfig> {
    const LOG_BASE: &str = "https://valentine14th.github.io/rbtlog/logs";

    [
        ("ch.threema.app.libre", "Threema Libre"),
        ("ch.threema.app.work", "Threema Work"),
        ("ch.threema.app.onprem", "Threema OnPrem"),
    ]
    .into_iter()
    .map(|(appid, display_name)| AppConfig {
        appid: appid.to_string(),
        display_name: display_name.to_string(),
        log_url: format!("{LOG_BASE}/{appid}.json"),
    })
    .collect()
}
