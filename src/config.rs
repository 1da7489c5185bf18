//! Configuration handling for the console

use crate::retry::RetryPolicy;
use crate::state::DEFAULT_ITEMS_PER_PAGE;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SCHOOL_NAME: &str = "Portal Guru";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_ANNOUNCEMENT_LIMIT: u32 = 20;

/// User configuration. Every field is optional; accessors supply defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PortalConfig {
    /// Backend address
    pub backend_address: Option<String>,
    /// School name printed on exported reports
    pub school_name: Option<String>,
    /// Semester used for grades, e.g. "Ganjil 2024/2025"
    pub semester: Option<String>,
    /// Rows per page in list views
    pub items_per_page: Option<usize>,
    /// Delay before validating a changed form field
    pub validation_debounce_ms: Option<u64>,
    /// Announcements shown on the dashboard and list view
    pub announcement_limit: Option<u32>,
    pub retry_max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub retry_backoff_multiplier: Option<f64>,
    /// Directory for exported reports
    pub export_dir: Option<PathBuf>,
    /// Note printed on every exported report
    pub teacher_note: Option<String>,
}

impl PortalConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("id", "portal-guru", "portal-guru")
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if let Some(path) = path {
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                let config: PortalConfig = serde_json::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    pub fn school_name(&self) -> &str {
        self.school_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SCHOOL_NAME)
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE)
            .max(1)
    }

    pub fn validation_debounce(&self) -> Duration {
        Duration::from_millis(self.validation_debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    pub fn announcement_limit(&self) -> u32 {
        self.announcement_limit.unwrap_or(DEFAULT_ANNOUNCEMENT_LIMIT)
    }

    /// Retry policy with unset fields taken from [`RetryPolicy::default`]
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.retry_max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            backoff_multiplier: self
                .retry_backoff_multiplier
                .filter(|m| m.is_finite() && *m >= 1.0)
                .unwrap_or(defaults.backoff_multiplier),
        }
    }

    /// Export directory: configured, else the platform data dir, else `./rapor`
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("rapor")))
            .unwrap_or_else(|| PathBuf::from("rapor"))
    }
}
