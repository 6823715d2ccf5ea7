//! Work search handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use litgraph_common::errors::{AppError, Result};
use litgraph_graph::CatalogId;

/// Search query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 1000))]
    pub q: String,

    /// Maximum results to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResultItem>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub id: CatalogId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub citation_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

/// Search the catalog by relevance
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let papers = state.service.search_works(&params.q, params.limit).await?;
    let results: Vec<SearchResultItem> = papers
        .into_iter()
        .map(|paper| SearchResultItem {
            year: (paper.year != 0).then_some(paper.year),
            id: paper.id,
            title: paper.title,
            citation_count: paper.citation_count,
            doi: paper.doi,
        })
        .collect();

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %params.q,
        results = results.len(),
        latency_ms = processing_time_ms,
        "search completed"
    );

    Ok(Json(SearchResponse {
        query: params.q,
        total_results: results.len(),
        results,
        processing_time_ms,
    }))
}
