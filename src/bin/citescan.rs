//! CLI binary for citescan.
//!
//! A thin shim over the library crate that maps CLI flags onto
//! `ServiceConfig` and runs the HTTP service until Ctrl-C.

use anyhow::{Context, Result};
use citescan::{api, Service, ServiceConfig};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  Serve on the default port with in-memory stores:
    citescan

  Persist results and the queue across restarts:
    citescan --cache-dir /var/lib/citescan/cache --queue-journal /var/lib/citescan/queue.json

  Submit and poll:
    curl -F "document=@decree.pdf;type=application/pdf" http://localhost:2510/submit
    curl http://localhost:2510/query/<documentId>

REQUIREMENTS:
  Ghostscript (gs) and Tesseract with the requested language model must be on
  PATH, or be named with --gs / --tesseract.
"#;

/// Extract legal citations from scanned PDFs over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "citescan",
    version,
    about = "Extract legal citations from scanned PDFs over HTTP",
    long_about = "Accepts PDF uploads, rasterises them with Ghostscript, OCRs the pages with \
Tesseract and returns the legal citation fragments found in the text. Results are memoised \
by document content, so identical uploads are never processed twice.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "CITESCAN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "CITESCAN_PORT", default_value_t = citescan::config::DEFAULT_PORT)]
    port: u16,

    /// Number of pipeline workers (default: CPU count).
    #[arg(short, long, env = "CITESCAN_WORKERS")]
    workers: Option<usize>,

    /// Rasterisation resolution.
    #[arg(long, env = "CITESCAN_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language model(s), e.g. `vie` or `vie+eng`.
    #[arg(short, long, env = "CITESCAN_LANGUAGE", default_value = "vie")]
    language: String,

    /// Ghostscript executable.
    #[arg(long = "gs", env = "CITESCAN_GS", default_value = "gs")]
    gs_program: String,

    /// Tesseract executable.
    #[arg(long = "tesseract", env = "CITESCAN_TESSERACT", default_value = "tesseract")]
    tesseract_program: String,

    /// Rasterisation watchdog in seconds.
    #[arg(long, env = "CITESCAN_RASTERIZE_TIMEOUT", default_value_t = 300)]
    rasterize_timeout: u64,

    /// OCR watchdog in seconds.
    #[arg(long, env = "CITESCAN_OCR_TIMEOUT", default_value_t = 600)]
    ocr_timeout: u64,

    /// Parent directory for per-job workspaces (default: system temp dir).
    #[arg(long, env = "CITESCAN_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Store results on disk under this directory instead of in memory.
    #[arg(long, env = "CITESCAN_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Journal the job queue to this file so jobs survive restarts.
    #[arg(long, env = "CITESCAN_QUEUE_JOURNAL")]
    queue_journal: Option<PathBuf>,

    /// Maximum upload size in MiB.
    #[arg(long, env = "CITESCAN_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CITESCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, env = "CITESCAN_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    tracing::debug!("Configuration: {:?}", config);

    let service = Service::open(config)
        .await
        .context("Failed to open result cache or job queue")?;

    api::serve(service, shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .host(&cli.host)
        .port(cli.port)
        .dpi(cli.dpi)
        .ocr_language(&cli.language)
        .rasterizer_program(&cli.gs_program)
        .ocr_program(&cli.tesseract_program)
        .rasterize_timeout_secs(cli.rasterize_timeout)
        .ocr_timeout_secs(cli.ocr_timeout)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(n) = cli.workers {
        builder = builder.workers(n);
    }
    if let Some(ref dir) = cli.workspace_root {
        builder = builder.workspace_root(dir);
    }
    if let Some(ref dir) = cli.cache_dir {
        builder = builder.cache_dir(dir);
    }
    if let Some(ref path) = cli.queue_journal {
        builder = builder.queue_journal(path);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
