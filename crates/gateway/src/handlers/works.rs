//! Single-work lookup

use axum::{
    extract::{Path, State},
    Json,
};

use crate::AppState;
use litgraph_common::errors::{AppError, Result};
use litgraph_graph::Paper;

/// Fetch one work by bare key, catalog URL, or DOI
pub async fn get_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Paper>> {
    match state.service.fetch_work(&id).await {
        Some(paper) => Ok(Json(paper)),
        None => Err(AppError::WorkNotFound { id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litgraph_common::config::{AppConfig, GraphConfig};
    use litgraph_graph::{catalog::mock, GraphService, MockCatalog};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let catalog = MockCatalog::new().with_work(mock::work("W5", 2019, 3, &[]));
        AppState {
            config: Arc::new(AppConfig::default()),
            service: Arc::new(GraphService::new(
                Arc::new(catalog),
                GraphConfig::default(),
            )),
            cache: None,
        }
    }

    #[tokio::test]
    async fn returns_the_work_when_found() {
        let response = get_work(State(test_state()), Path("W5".to_string()))
            .await
            .unwrap();
        assert_eq!(response.0.id.as_str(), "W5");
        assert_eq!(response.0.year, 2019);
    }

    #[tokio::test]
    async fn missing_work_is_not_found() {
        let err = get_work(State(test_state()), Path("W404".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WorkNotFound { .. }));
    }
}
