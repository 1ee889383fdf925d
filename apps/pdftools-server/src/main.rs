//! pdftools server
//!
//! Small HTTP service for everyday document chores:
//!
//! - `POST /image/compress` - re-encode an image at a chosen quality
//! - `POST /image/convert` - convert between JPEG, PNG and WebP
//! - `POST /pdf/imgtopdf` - one fitted page per uploaded image
//! - `POST /pdf/split-pdf` - keep selected pages
//! - `POST /pdf/merge-pdfs` - concatenate PDFs onto A4 pages
//!
//! PDF endpoints keep their uploads and output in a scratch directory for
//! the lifetime of the request only.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cors;
mod download;
mod error;
mod form;
mod routes;
mod scratch;

use scratch::ScratchSpace;

/// Command-line arguments for the pdftools server
#[derive(Parser, Debug)]
#[command(name = "pdftools-server")]
#[command(about = "Image compression/conversion and PDF assembly over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PDFTOOLS_PORT", default_value = "5000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFTOOLS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory for per-request scratch files (default: system temp dir)
    #[arg(long, env = "PDFTOOLS_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Comma-separated origins allowed by CORS; empty mirrors the caller
    #[arg(
        long,
        env = "PDFTOOLS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = ""
    )]
    allowed_origins: Vec<String>,

    /// Largest accepted request body in megabytes
    #[arg(long, env = "PDFTOOLS_MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scratch: ScratchSpace,
    pub max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdftools server on {}:{}", args.host, args.port);

    let scratch_dir = args
        .scratch_dir
        .unwrap_or_else(|| std::env::temp_dir().join("pdftools"));
    let scratch = ScratchSpace::new(scratch_dir)?;
    info!("Scratch directory: {}", scratch.root().display());

    let origins: Vec<String> = args
        .allowed_origins
        .into_iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();
    let cors = cors::cors_layer(&origins)?;

    let state = AppState {
        scratch,
        max_upload_bytes: args.max_upload_mb * 1024 * 1024,
    };
    let app = routes::router(state, cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    if origins.is_empty() {
        info!("CORS: mirroring request origin");
    } else {
        info!("CORS origins: {}", origins.join(", "));
    }
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
