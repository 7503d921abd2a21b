//! Checklist PDF Web - HTTP service that turns checklist submissions into PDFs.

mod document_store;
mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use checklist_pdf_core::AppConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Photos plus two signature pads comfortably fit in this.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "checklist-pdf-web")]
#[command(author, version, about = "Checklist PDF Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Template PDF (default: template_path from config)
    #[arg(short, long, env = "CHECKLIST_TEMPLATE")]
    template: Option<PathBuf>,

    /// Config file path
    #[arg(short, long, env = "CHECKLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Minutes a generated document stays downloadable
    #[arg(long, env = "CHECKLIST_RETENTION_MINUTES", default_value = "60")]
    retention_minutes: u64,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = AppConfig::load_from(args.config.as_deref()).context("Failed to load config file")?;
    let template_path = args
        .template
        .clone()
        .or_else(|| config.template_path.clone())
        .context("No template given (use --template or set template_path in config)")?;

    // Reads the template and loads fonts - fails fast on a bad setup
    let state = Arc::new(
        AppState::new(
            config,
            &template_path,
            Duration::from_secs(args.retention_minutes * 60),
        )
        .context("Failed to initialize application state")?,
    );
    info!("Serving template {}", template_path.display());

    // Spawn background task for document expiry (runs every 5 minutes)
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let cleanup_interval = Duration::from_secs(5 * 60);
        loop {
            tokio::time::sleep(cleanup_interval).await;
            let removed = cleanup_state.cleanup_expired().await;
            tracing::debug!("Completed document cleanup ({} removed)", removed);
        }
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/submit", post(routes::submit_checklist))
        .route("/api/download/{id}", get(routes::download_pdf))
        .route("/api/audit/{id}", get(routes::download_audit))
        // Middleware
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
