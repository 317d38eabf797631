mod config;
mod errors;
mod latex;
mod layout;
mod models;
mod render;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::latex::{ArtifactStore, CompilerSettings, LatexCompiler, TemplateStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quire API v{}", env!("CARGO_PKG_VERSION"));

    // Parse every template up front; a malformed one aborts startup
    let templates = TemplateStore::load(config.templates_dir.as_deref())
        .context("failed to load LaTeX templates")?;
    info!("Templates loaded: {}", templates.names().join(", "));

    let artifacts = ArtifactStore::new(&config.output_dir).with_context(|| {
        format!(
            "failed to open artifact directory {}",
            config.output_dir.display()
        )
    })?;

    let compiler = LatexCompiler::new(
        CompilerSettings {
            work_root: config.work_dir.clone(),
            program_override: config.latex_program.clone(),
            max_concurrent: config.max_concurrent_compiles,
        },
        artifacts.clone(),
    );
    info!(
        "LaTeX compiler: {} x{} passes, timeout {:?}, {} concurrent jobs",
        config.latex_engine,
        config.latex_passes,
        config.compile_timeout,
        config.max_concurrent_compiles
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        templates: Arc::new(templates),
        compiler: Arc::new(compiler),
        artifacts,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
