//! Graph build handlers
//!
//! The build endpoints sit behind a snapshot cache: a hit rebuilds the
//! response from the stored structure plus fresh metadata, a miss runs the
//! full pipeline and stores the slim snapshot for next time.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use litgraph_common::{
    cache::{author_graph_key, graph_key},
    errors::{AppError, Result},
    metrics, MAX_FILTER_IDS,
};
use litgraph_graph::{
    parse_doi, progress_channel, AuthorBuildOptions, BuildMetadata, BuildOptions, CatalogId,
    GraphEdge, GraphNode, Paper, ProgressSender, SlimSnapshot,
};

/// Graph build request
#[derive(Debug, Deserialize, Validate)]
pub struct BuildGraphRequest {
    /// Bare key, catalog URL, or DOI of the source work
    #[validate(length(min = 1, max = 512))]
    pub identifier: String,

    #[serde(default)]
    #[validate(nested)]
    pub options: GraphOptions,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GraphOptions {
    /// Root papers to select (default from config)
    #[validate(range(min = 1, max = 100))]
    pub n_roots: Option<usize>,

    /// Branch papers to select (default from config)
    #[validate(range(min = 1, max = 100))]
    pub n_branches: Option<usize>,

    /// Skip the cache read and rebuild from the catalog
    #[serde(default)]
    pub fresh: bool,
}

/// Author graph build request
#[derive(Debug, Deserialize, Validate)]
pub struct BuildAuthorGraphRequest {
    /// Bare key or catalog URL of the author
    #[validate(length(min = 1, max = 512))]
    pub identifier: String,

    #[serde(default)]
    #[validate(nested)]
    pub options: AuthorGraphOptions,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AuthorGraphOptions {
    /// Most-cited works to include (default from config)
    #[validate(range(min = 1, max = 500))]
    pub max_works: Option<usize>,

    /// Skip the cache read and rebuild from the catalog
    #[serde(default)]
    pub fresh: bool,
}

/// Graph build response
#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Paper>,
    pub root_seeds: Vec<CatalogId>,
    pub branch_seeds: Vec<CatalogId>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: BuildMetadata,
    pub processing_time_ms: u64,
}

/// Metadata hydration request
#[derive(Debug, Deserialize, Validate)]
pub struct HydrateRequest {
    #[validate(length(min = 1, max = 5000))]
    pub ids: Vec<String>,
}

/// Metadata hydration response
#[derive(Debug, Serialize)]
pub struct HydrateResponse {
    pub requested: usize,
    pub found: usize,
    pub papers: HashMap<String, Paper>,
    pub processing_time_ms: u64,
}

/// Build a source-centered citation graph
pub async fn build_graph(
    State(state): State<AppState>,
    Json(request): Json<BuildGraphRequest>,
) -> Result<Json<GraphResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let n_roots = request.options.n_roots.unwrap_or(state.config.graph.n_roots);
    let n_branches = request
        .options
        .n_branches
        .unwrap_or(state.config.graph.n_branches);
    let key = graph_key(&cache_identity(&request.identifier), n_roots, n_branches);

    if !request.options.fresh {
        if let Some(snapshot) = read_snapshot(&state, &key, "graph").await {
            let response = restore_response(&state, snapshot, start).await;
            return Ok(Json(response));
        }
    }

    let options = BuildOptions {
        n_roots: Some(n_roots),
        n_branches: Some(n_branches),
        current_year: None,
        progress: Some(spawn_progress_log("graph")),
    };
    let graph = state
        .service
        .build_graph(&request.identifier, options)
        .await?;
    write_snapshot(&state, &key, &graph).await;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        identifier = %request.identifier,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        catalog_calls = graph.metadata.catalog_calls,
        latency_ms = processing_time_ms,
        "graph request served"
    );

    Ok(Json(GraphResponse {
        cached: false,
        source: graph.source,
        root_seeds: graph.root_seeds,
        branch_seeds: graph.branch_seeds,
        nodes: graph.nodes,
        edges: graph.edges,
        metadata: graph.metadata,
        processing_time_ms,
    }))
}

/// Build a graph of an author's most-cited works
pub async fn build_author_graph(
    State(state): State<AppState>,
    Json(request): Json<BuildAuthorGraphRequest>,
) -> Result<Json<GraphResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let max_works = request
        .options
        .max_works
        .unwrap_or(state.config.graph.max_author_works);
    let key = author_graph_key(&cache_identity(&request.identifier), max_works);

    if !request.options.fresh {
        if let Some(snapshot) = read_snapshot(&state, &key, "author_graph").await {
            let response = restore_response(&state, snapshot, start).await;
            return Ok(Json(response));
        }
    }

    let options = AuthorBuildOptions {
        max_works: Some(max_works),
        progress: Some(spawn_progress_log("author_graph")),
    };
    let graph = state
        .service
        .build_author_graph(&request.identifier, options)
        .await?;
    write_snapshot(&state, &key, &graph).await;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        identifier = %request.identifier,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        catalog_calls = graph.metadata.catalog_calls,
        latency_ms = processing_time_ms,
        "author graph request served"
    );

    Ok(Json(GraphResponse {
        cached: false,
        source: graph.source,
        root_seeds: graph.root_seeds,
        branch_seeds: graph.branch_seeds,
        nodes: graph.nodes,
        edges: graph.edges,
        metadata: graph.metadata,
        processing_time_ms,
    }))
}

/// Fetch display metadata for a list of works
pub async fn hydrate_metadata(
    State(state): State<AppState>,
    Json(request): Json<HydrateRequest>,
) -> Result<Json<HydrateResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let ids: Vec<CatalogId> = request
        .ids
        .iter()
        .map(|raw| CatalogId::normalize(raw))
        .collect();
    let papers = state.service.hydrate_metadata(&ids, None).await;
    let papers: HashMap<String, Paper> = papers
        .into_iter()
        .map(|(id, paper)| (id.to_string(), paper))
        .collect();
    let found = papers.len();

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        requested = request.ids.len(),
        found,
        latency_ms = processing_time_ms,
        "metadata hydrated"
    );

    Ok(Json(HydrateResponse {
        requested: request.ids.len(),
        found,
        papers,
        processing_time_ms,
    }))
}

/// Collapse the accepted identifier forms into one cache identity so URL,
/// bare, and DOI spellings of the same work share a snapshot.
fn cache_identity(identifier: &str) -> String {
    match parse_doi(identifier) {
        Some(doi) => doi,
        None => CatalogId::normalize(identifier).to_string(),
    }
}

/// Forward build progress to the logs. The channel drops events when the
/// drain falls behind, so the build never waits on logging.
fn spawn_progress_log(kind: &'static str) -> ProgressSender {
    let (tx, mut rx) = progress_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::debug!(
                kind,
                percent = event.percent,
                completed = event.completed,
                total = event.total,
                "{}",
                event.message
            );
        }
    });
    tx
}

async fn read_snapshot(state: &AppState, key: &str, cache_name: &'static str) -> Option<SlimSnapshot> {
    let cache = state.cache.as_ref()?;
    match cache.get::<SlimSnapshot>(key).await {
        Ok(Some(snapshot)) => {
            metrics::record_cache(true, cache_name);
            Some(snapshot)
        }
        Ok(None) => {
            metrics::record_cache(false, cache_name);
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "snapshot cache read failed");
            None
        }
    }
}

/// Store the slim form of a built graph. Failures are logged and swallowed;
/// the response is already in hand.
async fn write_snapshot(state: &AppState, key: &str, graph: &litgraph_graph::BuiltGraph) {
    let Some(cache) = &state.cache else {
        return;
    };
    match SlimSnapshot::from_graph(graph) {
        Ok(snapshot) => {
            if let Err(e) = cache.set(key, &snapshot).await {
                tracing::warn!(error = %e, "snapshot cache write failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "graph not representable as a snapshot"),
    }
}

/// Rebuild a response from a cached snapshot: re-fetch metadata for every
/// node, then restore the stored structure around it. Seed lists and roles
/// are build artifacts the slim schema does not keep.
async fn restore_response(state: &AppState, snapshot: SlimSnapshot, start: Instant) -> GraphResponse {
    let ids = snapshot.ids();
    let papers = state.service.hydrate_metadata(&ids, None).await;
    let (nodes, edges) = snapshot.restore(&papers);
    let source_id = snapshot.source();
    let source = source_id.as_ref().and_then(|id| papers.get(id).cloned());

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let metadata = BuildMetadata {
        build_id: Uuid::new_v4(),
        source_id,
        root_seeds: 0,
        root_candidates: 0,
        selected_roots: 0,
        branch_seeds: 0,
        branch_candidates: 0,
        selected_branches: 0,
        papers_in_graph: nodes.len(),
        edges_in_graph: edges.len(),
        catalog_calls: ids.len().div_ceil(MAX_FILTER_IDS) as u64,
        elapsed_ms: processing_time_ms,
    };

    tracing::info!(
        nodes = nodes.len(),
        edges = edges.len(),
        latency_ms = processing_time_ms,
        "graph request served from cache"
    );

    GraphResponse {
        cached: true,
        source,
        root_seeds: Vec::new(),
        branch_seeds: Vec::new(),
        nodes,
        edges,
        metadata,
        processing_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litgraph_common::config::{AppConfig, GraphConfig};
    use litgraph_graph::{catalog::mock, GraphService, MockCatalog};
    use std::sync::Arc;

    fn test_state(catalog: MockCatalog) -> AppState {
        AppState {
            config: Arc::new(AppConfig::default()),
            service: Arc::new(GraphService::new(
                Arc::new(catalog),
                GraphConfig::default(),
            )),
            cache: None,
        }
    }

    fn small_catalog() -> MockCatalog {
        MockCatalog::new()
            .with_work(mock::work("W1", 2015, 10, &["W2", "W3"]))
            .with_work(mock::work("W2", 2012, 5, &[]))
            .with_work(mock::work("W3", 2013, 2, &[]))
            .with_citing("W1", &[])
    }

    #[test]
    fn rejects_empty_identifier() {
        let request = BuildGraphRequest {
            identifier: String::new(),
            options: GraphOptions::default(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_options() {
        let request = BuildGraphRequest {
            identifier: "W1".to_string(),
            options: GraphOptions {
                n_roots: Some(0),
                n_branches: None,
                fresh: false,
            },
        };
        assert!(request.validate().is_err());

        let request = BuildAuthorGraphRequest {
            identifier: "A1".to_string(),
            options: AuthorGraphOptions {
                max_works: Some(1000),
                fresh: false,
            },
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn options_default_from_empty_body() {
        let request: BuildGraphRequest =
            serde_json::from_str(r#"{"identifier": "W1"}"#).unwrap();
        assert!(request.options.n_roots.is_none());
        assert!(!request.options.fresh);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn identifier_forms_share_a_cache_identity() {
        let bare = cache_identity("W123");
        assert_eq!(bare, "W123");
        assert_eq!(cache_identity("https://openalex.org/w123"), bare);

        let doi = cache_identity("10.1234/abc");
        assert_eq!(cache_identity("https://doi.org/10.1234/abc"), doi);
        assert_ne!(doi, bare);
    }

    #[tokio::test]
    async fn build_graph_handler_serves_a_fresh_build() {
        let state = test_state(small_catalog());
        let request = BuildGraphRequest {
            identifier: "W1".to_string(),
            options: GraphOptions {
                n_roots: Some(2),
                n_branches: Some(2),
                fresh: false,
            },
        };

        let response = build_graph(State(state), Json(request)).await.unwrap();
        let body = response.0;
        assert!(!body.cached);
        assert_eq!(body.source.as_ref().unwrap().id.as_str(), "W1");
        assert_eq!(body.root_seeds.len(), 2);
        assert_eq!(body.nodes.len(), 3);
        assert_eq!(body.metadata.papers_in_graph, 3);
    }

    #[tokio::test]
    async fn build_graph_handler_surfaces_source_failure() {
        let state = test_state(MockCatalog::new());
        let request = BuildGraphRequest {
            identifier: "W404".to_string(),
            options: GraphOptions::default(),
        };

        let err = build_graph(State(state), Json(request)).await.unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound { .. }));
        assert_eq!(err.to_string(), "could not fetch source W404");
    }

    #[tokio::test]
    async fn hydrate_handler_reports_found_count() {
        let state = test_state(small_catalog());
        let request = HydrateRequest {
            ids: vec![
                "W1".to_string(),
                "https://openalex.org/W2".to_string(),
                "W999".to_string(),
            ],
        };

        let response = hydrate_metadata(State(state), Json(request)).await.unwrap();
        let body = response.0;
        assert_eq!(body.requested, 3);
        assert_eq!(body.found, 2);
        assert!(body.papers.contains_key("W1"));
        assert!(body.papers.contains_key("W2"));
    }

    #[tokio::test]
    async fn author_graph_handler_serves_a_build() {
        let catalog = MockCatalog::new()
            .with_works([
                mock::work("W1", 2015, 10, &["W2"]),
                mock::work("W2", 2012, 5, &[]),
            ])
            .with_author(mock::author("A1", "Ada Lovelace"))
            .with_author_works("A1", &["W1", "W2"]);
        let state = test_state(catalog);
        let request = BuildAuthorGraphRequest {
            identifier: "A1".to_string(),
            options: AuthorGraphOptions {
                max_works: Some(10),
                fresh: false,
            },
        };

        let response = build_author_graph(State(state), Json(request))
            .await
            .unwrap();
        let body = response.0;
        assert!(!body.cached);
        assert!(body.source.is_none());
        assert_eq!(body.nodes.len(), 2);
        assert_eq!(body.edges.len(), 1);
    }
}
