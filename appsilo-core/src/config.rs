//! Catalog configuration
//!
//! Read from `config.yaml` in the platform config directory unless a path
//! is given explicitly. A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::Locales;
use crate::query::{QueryContext, DEFAULT_CHECK_INTERVAL};

/// Default window for recently updated applications (30 days)
pub const DEFAULT_RECENT_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Preferred locales, most preferred first (e.g. `de_DE.UTF-8`)
    pub locales: Vec<String>,

    /// Nodes scanned between cancellation checks
    pub check_interval: usize,

    /// Maximum release age for the recent selection
    pub recent_age_secs: u64,

    /// Compiled silo to open when none is given on the command line
    pub silo_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            locales: Vec::new(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            recent_age_secs: DEFAULT_RECENT_AGE_SECS,
            silo_path: None,
        }
    }
}

impl CatalogConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        let dir = Self::config_dir().context("Could not determine config directory")?;
        Self::load_from_path(&dir.join(CONFIG_FILE_NAME))
    }

    /// Load from a specific path, defaulting when it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog config: {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse catalog config: {}", path.display()))?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.check_interval = self.check_interval.max(1);
        self
    }

    fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "appsilo", "appsilo")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("appsilo")))
    }

    pub fn locales(&self) -> Locales {
        Locales::new(&self.locales)
    }

    pub fn recent_age(&self) -> Duration {
        Duration::from_secs(self.recent_age_secs)
    }

    /// Query settings derived from this configuration
    pub fn to_query_context(&self) -> QueryContext {
        QueryContext::new(self.locales()).with_check_interval(self.check_interval)
    }
}
