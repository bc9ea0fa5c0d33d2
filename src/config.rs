//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reviewlens.toml` files. CLI arguments take precedence over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Review-platform API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL.
    #[serde(default = "default_baseurl")]
    pub baseurl: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            baseurl: default_baseurl(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_baseurl() -> String {
    "https://api.openreview.net".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Settings for the fetch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of submissions to fetch in venue mode.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Bound on concurrent per-paper thread fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Invitation suffixes to try for submissions, in order.
    #[serde(default = "default_inv_suffixes")]
    pub inv_suffixes: Vec<String>,

    /// Invitation fragments identifying reviews.
    #[serde(default = "default_review_names")]
    pub review_names: Vec<String>,

    /// Invitation fragments identifying meta-reviews.
    #[serde(default = "default_meta_names")]
    pub meta_names: Vec<String>,

    /// Invitation fragments identifying decisions.
    #[serde(default = "default_decision_names")]
    pub decision_names: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            concurrency: default_concurrency(),
            inv_suffixes: default_inv_suffixes(),
            review_names: default_review_names(),
            meta_names: default_meta_names(),
            decision_names: default_decision_names(),
        }
    }
}

fn default_limit() -> usize {
    50
}

fn default_concurrency() -> usize {
    4
}

fn default_inv_suffixes() -> Vec<String> {
    vec!["Blind_Submission".to_string(), "Submission".to_string()]
}

fn default_review_names() -> Vec<String> {
    vec!["Official_Review".to_string(), "Review".to_string()]
}

fn default_meta_names() -> Vec<String> {
    vec!["Meta_Review".to_string(), "Meta-Review".to_string()]
}

fn default_decision_names() -> Vec<String> {
    vec!["Decision".to_string()]
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows in the ranked "reviews per paper" table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Output directory for written artifacts.
    #[serde(default = "default_outdir")]
    pub outdir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            outdir: default_outdir(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_outdir() -> String {
    "data/output".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".reviewlens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence; optional flags only override when
    /// explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Flags with CLI defaults always override
        self.api.baseurl = args.baseurl.clone();
        self.fetch.limit = args.limit;
        self.fetch.concurrency = args.concurrency;
        self.report.top_n = args.top;
        self.report.outdir = args.outdir.display().to_string();

        // Optional settings - only override if provided
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(ref suffixes) = args.inv_suffix {
            self.fetch.inv_suffixes = suffixes.clone();
        }
        if let Some(ref names) = args.review_names {
            self.fetch.review_names = names.clone();
        }
        if let Some(ref names) = args.meta_names {
            self.fetch.meta_names = names.clone();
        }
        if let Some(ref names) = args.decision_names {
            self.fetch.decision_names = names.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
