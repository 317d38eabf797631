//! Axum route handlers for LaTeX documents and stored artifacts.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::latex::artifacts::ArtifactStore;
use crate::latex::compiler::{CompileOptions, Engine, MAX_PASSES};
use crate::latex::render_template;
use crate::render::html::ResumeLayout;
use crate::state::AppState;

/// Upper bound for a caller-requested per-pass timeout.
const MAX_TIMEOUT_MS: u64 = 120_000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LatexDocumentRequest {
    #[serde(default)]
    pub template_name: String,
    /// Inline template source, parsed per request instead of looking up `template_name`.
    pub template_source: Option<String>,
    pub data: Value,
    pub engine: Option<Engine>,
    pub passes: Option<u8>,
    pub timeout_ms: Option<u64>,
    pub output_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LatexDocumentResponse {
    pub artifact_name: String,
    pub size_bytes: u64,
    pub passes_run: u8,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub latex_templates: Vec<String>,
    pub html_layouts: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/templates
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    Json(TemplateListResponse {
        latex_templates: state.templates.names(),
        html_layouts: ResumeLayout::ALL.iter().map(|l| l.name()).collect(),
    })
}

/// POST /api/v1/documents/latex
///
/// Renders the named template with the request data, compiles it and persists the PDF.
/// The compile job runs on its own task: if the client disconnects, the job still
/// finishes its timeout-bounded passes and cleans up its workspace.
pub async fn handle_latex_document(
    State(state): State<AppState>,
    Json(request): Json<LatexDocumentRequest>,
) -> Result<Json<LatexDocumentResponse>, AppError> {
    let options = compile_options(&state, &request)?;

    let (template_name, source) = match &request.template_source {
        Some(src) => ("inline", render_template(src, &request.data)?),
        None => {
            let template = state.templates.get(&request.template_name).ok_or_else(|| {
                AppError::NotFound(format!("Template '{}' not found", request.template_name))
            })?;
            (template.name(), template.render(&request.data))
        }
    };

    info!(
        template = template_name,
        engine = %options.engine,
        passes = options.passes,
        source_bytes = source.len(),
        "Compiling LaTeX document"
    );

    let compiler = state.compiler.clone();
    let artifact = tokio::spawn(async move { compiler.compile(source, options).await })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("compile task failed: {e}")))??;

    Ok(Json(LatexDocumentResponse {
        artifact_name: artifact.name,
        size_bytes: artifact.size_bytes,
        passes_run: artifact.passes_run,
    }))
}

/// GET /api/v1/artifacts/:name
pub async fn handle_get_artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let not_found = || AppError::NotFound(format!("Artifact '{name}' not found"));
    if !ArtifactStore::is_valid_name(&name) {
        return Err(not_found());
    }
    let pdf = match state.artifacts.read(&name).await {
        Ok(pdf) => pdf,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{name}.pdf\""),
            ),
        ],
        Bytes::from(pdf),
    ))
}

/// Merges request overrides with configured defaults, validating ranges.
fn compile_options(
    state: &AppState,
    request: &LatexDocumentRequest,
) -> Result<CompileOptions, AppError> {
    if request.template_source.is_none() && request.template_name.trim().is_empty() {
        return Err(AppError::Validation(
            "either template_name or template_source is required".to_string(),
        ));
    }

    let passes = request.passes.unwrap_or(state.config.latex_passes);
    if !(1..=MAX_PASSES).contains(&passes) {
        return Err(AppError::Validation(format!(
            "passes must be between 1 and {MAX_PASSES}"
        )));
    }

    let timeout = match request.timeout_ms {
        Some(ms) if ms == 0 || ms > MAX_TIMEOUT_MS => {
            return Err(AppError::Validation(format!(
                "timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        Some(ms) => Duration::from_millis(ms),
        None => state.config.compile_timeout,
    };

    if let Some(name) = &request.output_name {
        if !ArtifactStore::is_valid_name(name) {
            return Err(AppError::Validation(
                "output_name may only contain letters, digits, '-' and '_' (max 64)".to_string(),
            ));
        }
    }

    Ok(CompileOptions {
        engine: request.engine.unwrap_or(state.config.latex_engine),
        passes,
        timeout,
        output_name: request.output_name.clone(),
    })
}
