use anyhow::{Context, Result};
use clap::Parser;
use gutters::discovery;
use gutters::{process_documents_parallel, BatchOptions, MarginPolicy, PipelineConfig, Rasterizer, SourceRasterizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gutters")]
#[command(about = "Split scanned newspaper pages into column images")]
#[command(version)]
struct Args {
    /// Root directory to scan for *.pdf files and page-image directories
    root_dir: PathBuf,

    /// Directory receiving one sub-directory per document
    #[arg(long)]
    out_dir: PathBuf,

    /// TOML configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Expected number of columns per page
    #[arg(long)]
    columns: Option<u32>,

    /// Target raw page size in megabytes used to pick the DPI
    #[arg(long)]
    target_mb: Option<f64>,

    /// Lowest rasterization DPI
    #[arg(long)]
    min_dpi: Option<u32>,

    /// Highest rasterization DPI
    #[arg(long)]
    max_dpi: Option<u32>,

    /// Native resolution of page-image directories
    #[arg(long)]
    scan_dpi: Option<u32>,

    /// Pixels added on both sides of every column
    #[arg(long, conflicts_with_all = ["left_margin", "right_margin"])]
    margin: Option<i32>,

    /// Pixels added on the left of every column
    #[arg(long, requires = "right_margin")]
    left_margin: Option<i32>,

    /// Pixels added on the right of every column
    #[arg(long, requires = "left_margin")]
    right_margin: Option<i32>,

    /// Pages processed concurrently
    #[arg(long)]
    workers: Option<usize>,

    /// Write a four-panel diagnostic image per page
    #[arg(long)]
    debug: bool,

    /// Re-segment documents that already have metadata
    #[arg(long)]
    overwrite_all: bool,

    /// Abort on first failed document
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(columns) = self.columns {
            config.detector.expected_columns = columns;
        }
        if let Some(target_mb) = self.target_mb {
            config.resolution.target_mb = target_mb;
        }
        if let Some(min_dpi) = self.min_dpi {
            config.resolution.min_dpi = min_dpi;
        }
        if let Some(max_dpi) = self.max_dpi {
            config.resolution.max_dpi = max_dpi;
        }
        if let Some(scan_dpi) = self.scan_dpi {
            config.scan_dpi = scan_dpi;
        }
        if let Some(margin) = self.margin {
            config.margins = MarginPolicy::Symmetric(margin);
        }
        if let (Some(left), Some(right)) = (self.left_margin, self.right_margin) {
            config.margins = MarginPolicy::Asymmetric { left, right };
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.debug |= self.debug;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: structured JSON logging enables observability and debugging in production
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let args = Args::parse();

    info!("Starting gutters");
    info!(?args, "Parsed CLI arguments");

    // WHY: validate root directory exists early to fail fast with clear error
    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }

    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    // WHY: configuration errors (empty ROI, negative margins) must stop the run before any page
    let config = args.pipeline_config()?;
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e).context("invalid configuration");
    }
    info!(?config, "Configuration validated");

    let discovery_config = discovery::DiscoveryConfig {
        fail_fast: args.fail_fast,
    };

    info!("Starting source discovery in: {}", args.root_dir.display());
    let discovered = discovery::collect_discovered_sources(&args.root_dir, discovery_config).await?;

    let (valid, invalid): (Vec<_>, Vec<_>) = discovered.into_iter().partition(|s| s.error.is_none());
    for source in &invalid {
        if let Some(ref error) = source.error {
            info!("Issue with {}: {}", source.source.path.display(), error);
        }
    }

    println!("gutters v{} - Source discovery complete", env!("CARGO_PKG_VERSION"));
    println!("Found {} documents, {} with issues", valid.len() + invalid.len(), invalid.len());

    // WHY: column images written by earlier runs would otherwise be rediscovered as image sets
    tokio::fs::create_dir_all(&args.out_dir).await
        .with_context(|| format!("failed to create output directory {}", args.out_dir.display()))?;
    let sources = discovery::exclude_output_dir(valid.into_iter().map(|v| v.source).collect(), &args.out_dir).await;
    let rasterizer: Arc<dyn Rasterizer> = Arc::new(SourceRasterizer::new(config.scan_dpi));
    let options = BatchOptions {
        out_dir: args.out_dir.clone(),
        overwrite_all: args.overwrite_all,
        fail_fast: args.fail_fast,
        show_progress: !args.no_progress,
    };

    let stats = process_documents_parallel(&sources, rasterizer, &config, &options).await?;
    stats.write(&args.stats_out).await
        .with_context(|| format!("failed to write stats to {}", args.stats_out.display()))?;

    println!("Segmentation complete:");
    println!("  Documents processed: {}", stats.documents_processed);
    println!("  Documents skipped: {}", stats.documents_skipped);
    if stats.documents_partial > 0 {
        println!("  Documents incomplete: {}", stats.documents_partial);
    }
    if stats.documents_failed > 0 {
        println!("  Documents failed: {}", stats.documents_failed);
    }
    println!("  Pages: {} ({} divided evenly)", stats.pages_processed, stats.fallback_pages);
    println!("  Columns extracted: {}", stats.columns_extracted);

    info!("Stats written to {}", args.stats_out.display());
    Ok(())
}
