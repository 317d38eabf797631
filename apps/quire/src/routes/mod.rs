pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::latex::handlers as latex;
use crate::layout::handlers as layout;
use crate::render::handlers as render;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/templates", get(latex::handle_list_templates))
        // LaTeX pipeline: template -> engine -> artifact store
        .route("/api/v1/documents/latex", post(latex::handle_latex_document))
        .route("/api/v1/artifacts/:name", get(latex::handle_get_artifact))
        // HTML pipeline: blocks -> measure -> paginate -> layout
        .route("/api/v1/documents/html", post(render::handle_html_document))
        .route("/api/v1/layout/paginate", post(layout::handle_paginate))
        .with_state(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
