//! Configuration Management
//!
//! Persistent settings for vpcaudit. Every field is optional on disk; the
//! `effective_*` helpers supply defaults, and CLI flags override both.

use crate::analysis::backup::MAX_CADENCE_WINDOW_MULTIPLIER;
use crate::analysis::RiskPolicy;
use crate::vpc::auth::DEFAULT_IAM_URL;
use crate::vpc::client::{Endpoint, DEFAULT_API_VERSION, DEFAULT_ENDPOINT_TEMPLATE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BOOTSTRAP_REGION: &str = "us-south";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_CONCURRENT_REGIONS: usize = 1;
const DEFAULT_CADENCE_WINDOW_MULTIPLIER: f64 = 2.0;
const DEFAULT_RECENT_JOB_LIMIT: usize = 20;

/// Backup health settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BackupSettings {
    /// Cadence window as a multiple of a plan's schedule interval
    #[serde(default)]
    pub cadence_window_multiplier: Option<f64>,
    /// Jobs fetched per policy
    #[serde(default)]
    pub recent_job_limit: Option<usize>,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default region scope; empty means every reachable region
    #[serde(default)]
    pub regions: Vec<String>,
    /// Region used to discover the region list
    #[serde(default)]
    pub bootstrap_region: Option<String>,
    /// Regional endpoint with a `{region}` placeholder
    #[serde(default)]
    pub endpoint_template: Option<String>,
    #[serde(default)]
    pub iam_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub region_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrent_regions: Option<usize>,
    #[serde(default)]
    pub risk_policy: RiskPolicy,
    #[serde(default)]
    pub backup: BackupSettings,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vpcaudit").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn effective_bootstrap_region(&self) -> String {
        self.bootstrap_region
            .clone()
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP_REGION.to_string())
    }

    pub fn effective_endpoint(&self) -> Endpoint {
        Endpoint {
            template: self
                .endpoint_template
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT_TEMPLATE.to_string()),
            api_version: self
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        }
    }

    pub fn effective_iam_url(&self) -> String {
        self.iam_url
            .clone()
            .unwrap_or_else(|| DEFAULT_IAM_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn region_timeout(&self) -> Duration {
        Duration::from_secs(self.region_timeout_secs.unwrap_or(DEFAULT_REGION_TIMEOUT_SECS))
    }

    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent_regions
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REGIONS)
            .max(1)
    }

    pub fn cadence_window_multiplier(&self) -> f64 {
        self.backup
            .cadence_window_multiplier
            .unwrap_or(DEFAULT_CADENCE_WINDOW_MULTIPLIER)
            .max(1.0)
            .min(MAX_CADENCE_WINDOW_MULTIPLIER)
    }

    pub fn recent_job_limit(&self) -> usize {
        self.backup
            .recent_job_limit
            .unwrap_or(DEFAULT_RECENT_JOB_LIMIT)
            .max(1)
    }
}
