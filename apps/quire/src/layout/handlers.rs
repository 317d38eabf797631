//! Axum route handler exposing the paginator directly, for callers that measure
//! blocks themselves (for example in a browser) and only need the page grouping.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::layout::paginator::{paginate, ContentBlock};
use crate::state::AppState;

const MAX_BLOCKS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct BlockHeight {
    pub id: String,
    pub height_px: u32,
}

#[derive(Debug, Deserialize)]
pub struct PaginateRequest {
    pub blocks: Vec<BlockHeight>,
    pub max_page_height_px: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub block_ids: Vec<String>,
    pub height_px: u64,
}

#[derive(Debug, Serialize)]
pub struct PaginateResponse {
    pub max_page_height_px: u32,
    pub pages: Vec<PageSummary>,
}

/// POST /api/v1/layout/paginate
pub async fn handle_paginate(
    State(state): State<AppState>,
    Json(request): Json<PaginateRequest>,
) -> Result<Json<PaginateResponse>, AppError> {
    let max = request
        .max_page_height_px
        .unwrap_or(state.config.page_height_px);
    if max == 0 {
        return Err(AppError::Validation(
            "max_page_height_px must be greater than zero".to_string(),
        ));
    }
    if request.blocks.len() > MAX_BLOCKS {
        return Err(AppError::Validation(format!(
            "at most {MAX_BLOCKS} blocks may be paginated at once"
        )));
    }

    let blocks: Vec<ContentBlock<()>> = request
        .blocks
        .into_iter()
        .map(|b| ContentBlock {
            id: b.id,
            rendered_height_px: b.height_px,
            content: (),
        })
        .collect();

    let pages = paginate(blocks, max)
        .into_iter()
        .map(|page| PageSummary {
            number: page.number,
            height_px: page.height_px(),
            block_ids: page.blocks.into_iter().map(|b| b.id).collect(),
        })
        .collect();

    Ok(Json(PaginateResponse {
        max_page_height_px: max,
        pages,
    }))
}
