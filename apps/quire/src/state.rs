use std::sync::Arc;

use crate::config::Config;
use crate::latex::{ArtifactStore, DocumentCompiler, TemplateStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// LaTeX templates parsed at startup; read-only afterwards.
    pub templates: Arc<TemplateStore>,
    /// Pluggable compiler. Default: LatexCompiler (spawns the configured engine).
    pub compiler: Arc<dyn DocumentCompiler>,
    /// Durable output directory, shared with the compiler.
    pub artifacts: ArtifactStore,
}
