//! listing-harvest
//!
//! Runs one reconciliation pass over the used-vehicle catalog, then re-checks
//! every listing that was still open when the run started.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use listing_harvest::utils::DEFAULT_DATABASE_FILE;
use listing_harvest::{
    BrowserBackend, ChromiumLauncher, HarvestConfig, LivenessPool, SharedStore,
    SqliteListingStore, harvest_catalog,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Browser backend: auto, system or managed
    backend: Option<BrowserBackend>,

    /// SQLite database holding the listings
    #[arg(short, long, default_value = DEFAULT_DATABASE_FILE)]
    database: PathBuf,

    /// JSON file overriding selectors, timeouts and worker count
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show the browser windows
    #[arg(long)]
    headed: bool,

    /// Stop after the harvest pass
    #[arg(long)]
    skip_liveness: bool,

    /// Number of liveness workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Also write a plain-text log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter())
            .with(fmt::layer())
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(format!(
        "harvest_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .init();
    Ok(Some(path))
}

fn load_config(args: &Args) -> Result<HarvestConfig> {
    let base = match &args.config {
        Some(path) => HarvestConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HarvestConfig::default(),
    };

    let mut builder = base.into_builder();
    if let Some(backend) = args.backend {
        builder = builder.backend(backend);
    }
    if let Some(workers) = args.workers {
        builder = builder.liveness_workers(workers);
    }
    if args.headed {
        builder = builder.headless(false);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = init_logging(args.log_dir.as_deref())? {
        info!(path = %path.display(), "Writing log file");
    }

    let config = Arc::new(load_config(&args)?);
    info!(
        base_url = config.base_url(),
        backend = %config.backend(),
        workers = config.liveness_workers(),
        "Starting listing harvest"
    );

    let sqlite = SqliteListingStore::open(&args.database)
        .await
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;
    let store = SharedStore::new(Arc::new(sqlite.clone()));

    // Taken before the harvest so listings it closes are skipped cheaply
    let open_urls = match store.list_unexited_urls().await {
        Ok(urls) => urls,
        Err(e) => {
            warn!(error = %e, "Could not read open listings; liveness pass will be empty");
            Vec::new()
        }
    };

    let launcher = Arc::new(ChromiumLauncher::new(&config));

    match harvest_catalog(launcher.as_ref(), store.clone(), Arc::clone(&config)).await {
        Ok(report) => {
            for scan in report.scans() {
                info!(
                    direction = %scan.direction,
                    termination = ?scan.termination,
                    pages = scan.stats.pages.len(),
                    inserted = scan.stats.inserted,
                    marked_exited = scan.stats.marked_exited,
                    extraction_failures = scan.stats.extraction_failures,
                    store_failures = scan.stats.store_failures,
                    "Scanner summary"
                );
            }
            if let Some(reason) = &report.cancel_reason {
                info!(%reason, "Harvest stopped");
            }
        }
        Err(e) => warn!(error = %e, "Harvest pass did not run"),
    }

    if args.skip_liveness {
        info!("Skipping liveness pass");
    } else {
        let report = LivenessPool::new(Arc::clone(&config))
            .run(launcher, store, open_urls)
            .await;
        info!(
            checked = report.checked,
            live = report.live,
            marked_exited = report.marked_exited,
            store_failures = report.store_failures,
            workers = report.workers_started,
            "Liveness summary"
        );
    }

    sqlite.close().await;
    info!("Done");
    Ok(())
}
