//! Axum route handlers for HTML resume rendering.

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::ResumeData;
use crate::render::html::{render_resume, RenderMode, ResumeLayout};
use crate::state::AppState;

pub const PAGE_COUNT_HEADER: HeaderName = HeaderName::from_static("x-page-count");

#[derive(Debug, Deserialize)]
pub struct HtmlDocumentRequest {
    pub layout: ResumeLayout,
    pub resume: ResumeData,
    #[serde(default = "default_paginate")]
    pub paginate: bool,
}

fn default_paginate() -> bool {
    true
}

/// POST /api/v1/documents/html
///
/// Returns a print-ready HTML document. The page count travels in `X-Page-Count`.
pub async fn handle_html_document(
    State(state): State<AppState>,
    Json(request): Json<HtmlDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.resume.contact.name.trim().is_empty() {
        return Err(AppError::Validation("resume.contact.name cannot be empty".to_string()));
    }

    let mode = if request.paginate {
        RenderMode::Paginated
    } else {
        RenderMode::Flow
    };
    let page_height = state.config.page_height_px;

    // Measurement and layout are CPU-bound; keep them off the async executor.
    let document = tokio::task::spawn_blocking(move || {
        render_resume(request.layout, &request.resume, mode, page_height)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in render: {e}")))?
    .map_err(|e| AppError::Internal(anyhow::anyhow!("resume template rendering failed: {e}")))?;

    info!(pages = document.page_count, mode = ?mode, "Rendered HTML resume");

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (PAGE_COUNT_HEADER, document.page_count.to_string()),
        ],
        document.html,
    ))
}
