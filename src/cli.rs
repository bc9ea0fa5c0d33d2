//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::error::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// reviewlens - OpenReview crawler and review-metadata analyzer
///
/// Fetch submissions, reviews, meta-reviews and decisions for a venue or
/// a single paper, and write a Markdown/CSV analysis report.
///
/// Examples:
///   reviewlens --venue ICLR.cc/2024/Conference --limit 100
///   reviewlens --venue ICLR.cc/2024/Conference --summary-csv --with-pdfs
///   reviewlens --paper-id aBcD1234 --outdir data/paper
///   reviewlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// OpenReview venue/group id, e.g. 'ICLR.cc/2024/Conference'
    ///
    /// Mutually exclusive with --paper-id; one of the two is required.
    #[arg(long, value_name = "ID", conflicts_with = "paper_id")]
    pub venue: Option<String>,

    /// Fetch a single paper by its forum/id
    #[arg(long, value_name = "ID")]
    pub paper_id: Option<String>,

    /// Maximum number of submissions to fetch (venue mode)
    #[arg(long, default_value = "50", value_name = "COUNT")]
    pub limit: usize,

    /// Directory to write outputs (report, JSONL snapshots, PDFs)
    #[arg(long, default_value = "data/output", value_name = "DIR")]
    pub outdir: PathBuf,

    /// Also download submission PDFs into <outdir>/pdfs
    #[arg(long)]
    pub with_pdfs: bool,

    /// Write the full per-paper table as <outdir>/summary.csv
    #[arg(long)]
    pub summary_csv: bool,

    /// OpenReview API base URL
    #[arg(
        long,
        default_value = "https://api.openreview.net",
        env = "OPENREVIEW_BASEURL",
        value_name = "URL"
    )]
    pub baseurl: String,

    /// API token for venues requiring authentication
    #[arg(long, env = "OPENREVIEW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Rows in the ranked "reviews per paper" table
    #[arg(long, default_value = "10", value_name = "N")]
    pub top: usize,

    /// Number of concurrent per-paper thread fetches
    #[arg(long, default_value = "4", value_name = "NUM")]
    pub concurrency: usize,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Invitation suffixes to try for submissions, in order (comma-separated)
    ///
    /// Example: --inv-suffix Blind_Submission,Submission
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub inv_suffix: Option<Vec<String>>,

    /// Invitation fragments that identify reviews (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub review_names: Option<Vec<String>>,

    /// Invitation fragments that identify meta-reviews (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub meta_names: Option<Vec<String>>,

    /// Invitation fragments that identify decisions (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub decision_names: Option<Vec<String>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reviewlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate a default .reviewlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<()> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match (&self.venue, &self.paper_id) {
            (None, None) => {
                return Err(Error::Config("Provide either --venue <id> or --paper-id <id>".to_string()))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Config("--venue and --paper-id are mutually exclusive".to_string()))
            }
            _ => {}
        }

        if !self.baseurl.starts_with("http://") && !self.baseurl.starts_with("https://") {
            return Err(Error::Config("Base URL must start with 'http://' or 'https://'".to_string()));
        }

        if self.limit == 0 {
            return Err(Error::Config("Limit must be at least 1".to_string()));
        }

        if self.concurrency == 0 {
            return Err(Error::Config("Concurrency must be at least 1".to_string()));
        }

        if self.top == 0 {
            return Err(Error::Config("Top must be at least 1".to_string()));
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err(Error::Config("Timeout must be at least 1 second".to_string()));
            }
        }

        if self.verbose && self.quiet {
            return Err(Error::Config("Cannot use both --verbose and --quiet".to_string()));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The venue or paper id labeling this run's report.
    #[allow(dead_code)] // Utility for downstream labeling
    pub fn source_label(&self) -> &str {
        self.venue
            .as_deref()
            .or(self.paper_id.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            venue: Some("ICLR.cc/2024/Conference".to_string()),
            paper_id: None,
            limit: 50,
            outdir: PathBuf::from("data/output"),
            with_pdfs: false,
            summary_csv: false,
            baseurl: "https://api.openreview.net".to_string(),
            token: None,
            top: 10,
            concurrency: 4,
            timeout: None,
            inv_suffix: None,
            review_names: None,
            meta_names: None,
            decision_names: None,
            config: None,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_requires_venue_or_paper() {
        let mut args = make_args();
        args.venue = None;
        assert!(args.validate().is_err());

        args.paper_id = Some("abc".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_failures_are_config_errors() {
        let mut args = make_args();
        args.venue = None;
        assert!(matches!(args.validate(), Err(Error::Config(_))));

        args = make_args();
        args.limit = 0;
        assert!(matches!(args.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_both_modes() {
        let mut args = make_args();
        args.paper_id = Some("abc".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_baseurl() {
        let mut args = make_args();
        args.baseurl = "ftp://example.com".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_limit() {
        let mut args = make_args();
        args.limit = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.venue = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_source_label() {
        let mut args = make_args();
        assert_eq!(args.source_label(), "ICLR.cc/2024/Conference");

        args.venue = None;
        args.paper_id = Some("abc".to_string());
        assert_eq!(args.source_label(), "abc");
    }
}
