//! reviewlens - OpenReview crawler and review-metadata analyzer
//!
//! A CLI tool that fetches submissions, reviews, meta-reviews and
//! decisions for a venue or a single paper, aggregates per-paper counts,
//! and writes a Markdown/CSV analysis report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (fetch, aggregation, or output failure)
//!   2 - Invalid usage (neither/both of --venue and --paper-id, bad flags)

mod analysis;
mod cli;
mod config;
mod error;
mod export;
mod fetch;
mod models;
mod openreview;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use export::RunManifest;
use fetch::{FetchOptions, NoteClassifier};
use indicatif::{ProgressBar, ProgressStyle};
use openreview::{ClientOptions, OpenReviewClient};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("reviewlens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the crawl + analysis
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .reviewlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".reviewlens.toml");

    if path.exists() {
        eprintln!("⚠️  .reviewlens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .reviewlens.toml")?;

    println!("✅ Created .reviewlens.toml with default settings.");
    println!("   Edit it to customize the API endpoint, invitation names, and report shape.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete fetch -> aggregate -> report workflow.
async fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let outdir = Path::new(&config.report.outdir).to_path_buf();
    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir.display()))?;

    let client = OpenReviewClient::new(ClientOptions {
        baseurl: config.api.baseurl.clone(),
        token: args.token.clone(),
        timeout_seconds: config.api.timeout_seconds,
    })?;

    let fetch_options = FetchOptions {
        inv_suffixes: config.fetch.inv_suffixes.clone(),
        classifier: NoteClassifier::new(
            config.fetch.review_names.clone(),
            config.fetch.meta_names.clone(),
            config.fetch.decision_names.clone(),
        ),
        limit: config.fetch.limit,
        concurrency: config.fetch.concurrency,
        show_progress: !args.quiet,
    };

    // Step 1: Fetch submissions and their reply threads
    let batch = if let Some(ref paper_id) = args.paper_id {
        println!("📥 Fetching single paper: {}", paper_id);
        fetch::fetch_paper(&client, paper_id, &fetch_options).await?
    } else {
        let venue = args.venue.as_deref().unwrap_or_default();
        println!(
            "📥 Fetching submissions for venue: {} (limit {})",
            venue, config.fetch.limit
        );
        fetch::fetch_venue(&client, venue, &fetch_options).await?
    };
    println!("   Found {} submissions", batch.submissions.len());

    // Step 2: Write raw JSONL snapshots
    export::export_batch(&outdir, &batch)?;

    // Step 3: Optional PDF download
    if args.with_pdfs {
        download_pdfs(&client, &batch, &outdir, !args.quiet).await?;
    }

    // Step 4: Aggregate
    println!("🧮 Aggregating per-paper counts...");
    let summary = analysis::aggregate(&batch)?;

    // Step 5: Render and save the report
    let markdown = report::generate_markdown_summary(&summary, config.report.top_n);
    let report_path = outdir.join("summary.md");
    std::fs::write(&report_path, &markdown)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    if args.summary_csv {
        let csv = report::generate_summary_csv(&summary);
        let csv_path = outdir.join("summary.csv");
        std::fs::write(&csv_path, &csv)
            .with_context(|| format!("Failed to write CSV to {}", csv_path.display()))?;
        info!("wrote {}", csv_path.display());
    }

    // Record what was asked of this run
    RunManifest::new(
        args.venue.clone(),
        args.paper_id.clone(),
        config.fetch.limit,
        &outdir,
        args.with_pdfs,
        args.summary_csv,
    )
    .write(&outdir)?;

    // Print summary
    println!("\n📊 Summary for {}:", summary.source);
    println!("   Submissions: {}", summary.total_submissions);
    println!("   Reviews: {}", summary.total_reviews);
    println!("   Meta-reviews: {}", summary.total_meta_reviews);
    println!("   Decisions: {}", summary.total_decisions);
    if summary.orphan_records > 0 {
        println!(
            "   ⚠️ Orphan records excluded from counts: {}",
            summary.orphan_records
        );
    }
    if summary.duplicate_submissions > 0 {
        println!(
            "   ⚠️ Duplicate submissions dropped: {}",
            summary.duplicate_submissions
        );
    }
    println!("\n✅ Done! Report saved to: {}", report_path.display());

    Ok(())
}

/// Download PDFs for every submission in the batch into `<outdir>/pdfs`.
///
/// Individual failures are warnings, not fatal: the platform has no PDF
/// for some notes.
async fn download_pdfs(
    client: &OpenReviewClient,
    batch: &models::VenueBatch,
    outdir: &Path,
    show_progress: bool,
) -> Result<()> {
    let pdf_dir = outdir.join("pdfs");
    std::fs::create_dir_all(&pdf_dir)
        .with_context(|| format!("Failed to create {}", pdf_dir.display()))?;

    println!("📄 Downloading PDFs...");
    let progress = if show_progress {
        let pb = ProgressBar::new(batch.submissions.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut saved = 0usize;
    for submission in &batch.submissions {
        match client.download_pdf(&submission.id, &pdf_dir).await {
            Ok(Some(_)) => saved += 1,
            Ok(None) => {}
            Err(e) => warn!("PDF download failed for {}: {}", submission.id, e),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();
    println!("   Saved {} PDFs", saved);

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .reviewlens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
