//! Health and readiness endpoints.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyChecks {
    pub cache: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: litgraph_common::VERSION.to_string(),
    })
}

/// Readiness probe. Reports the snapshot cache state; a missing cache
/// degrades the service but does not take it down.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let cache = match &state.cache {
        Some(cache) => {
            let start = Instant::now();
            match cache.ping().await {
                Ok(()) => CheckResult {
                    status: "up".to_string(),
                    latency_ms: Some(start.elapsed().as_millis() as u64),
                    error: None,
                },
                Err(e) => CheckResult {
                    status: "down".to_string(),
                    latency_ms: None,
                    error: Some(e.to_string()),
                },
            }
        }
        None => CheckResult {
            status: "disabled".to_string(),
            latency_ms: None,
            error: None,
        },
    };

    let status = if cache.status == "down" {
        "degraded".to_string()
    } else {
        "ready".to_string()
    };

    Json(ReadyResponse {
        status,
        checks: ReadyChecks { cache },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health().await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.version, litgraph_common::VERSION);
    }

    #[test]
    fn check_result_omits_empty_fields() {
        let check = CheckResult {
            status: "disabled".to_string(),
            latency_ms: None,
            error: None,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json, serde_json::json!({"status": "disabled"}));
    }
}
