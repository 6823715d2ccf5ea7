//! OpenAlex-backed catalog implementation.
//!
//! All requests flow through one politeness gate: a process-wide rate
//! limiter sized from configuration, plus a `mailto` query parameter and a
//! descriptive user agent when an address is configured. Transient failures
//! (timeouts, connection resets, 429s, 5xx) retry with exponential backoff;
//! everything else surfaces immediately.

use super::records::{AuthorRecord, WorkRecord, WorksPage};
use super::{CatalogApi, Projection};
use crate::ids::CatalogId;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use litgraph_common::{
    config::CatalogConfig,
    metrics::CatalogTimer,
    AppError, Result, MAX_FILTER_IDS, VERSION,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

pub struct OpenAlexCatalog {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    max_retries: u32,
    limiter: DefaultDirectRateLimiter,
}

impl OpenAlexCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let user_agent = match (&config.user_agent, &config.mailto) {
            (Some(agent), _) => agent.clone(),
            (None, Some(mailto)) => format!("litgraph/{VERSION} (mailto:{mailto})"),
            (None, None) => format!("litgraph/{VERSION}"),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()?;
        let per_second =
            NonZeroU32::new(config.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
            max_retries: config.max_retries,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// One rate-limited, retried GET. `Ok(None)` means the resource does not
    /// exist; errors are transport, protocol, or decode failures.
    async fn request<T: DeserializeOwned>(
        &self,
        url: String,
        params: Vec<(&'static str, String)>,
        endpoint: &'static str,
    ) -> Result<Option<T>> {
        let params = self.with_mailto(params);
        let timer = CatalogTimer::start(endpoint);
        let mut attempt = 0;
        let outcome = loop {
            self.limiter.until_ready().await;
            match self.send_once::<T>(&url, &params).await {
                Ok(value) => break Ok(value),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                    warn!(
                        error = %e,
                        attempt,
                        endpoint,
                        delay_ms = delay.as_millis() as u64,
                        "catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };
        timer.finish(outcome.is_ok());
        outcome
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Option<T>> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url, "catalog resource not found");
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AppError::ServiceUnavailable {
                message: format!("catalog returned {status} for {url}"),
            });
        }
        if !status.is_success() {
            return Err(AppError::Catalog {
                message: format!("catalog returned {status} for {url}"),
            });
        }
        Ok(Some(response.json::<T>().await?))
    }

    fn with_mailto(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }
        params
    }
}

#[async_trait]
impl CatalogApi for OpenAlexCatalog {
    async fn get_work(&self, id: &CatalogId) -> Result<Option<WorkRecord>> {
        self.request(
            format!("{}/works/{id}", self.base_url),
            vec![("select", Projection::Full.select().to_string())],
            "work",
        )
        .await
    }

    async fn get_work_by_doi(&self, doi: &str) -> Result<Option<WorkRecord>> {
        self.request(
            format!("{}/works/https://doi.org/{doi}", self.base_url),
            vec![("select", Projection::Full.select().to_string())],
            "work_by_doi",
        )
        .await
    }

    async fn get_works_batch(
        &self,
        ids: &[CatalogId],
        projection: Projection,
    ) -> Result<Vec<WorkRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug_assert!(ids.len() <= MAX_FILTER_IDS);
        let filter = ids
            .iter()
            .map(CatalogId::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let page: Option<WorksPage> = self
            .request(
                format!("{}/works", self.base_url),
                vec![
                    ("filter", format!("openalex:{filter}")),
                    ("per-page", ids.len().to_string()),
                    ("select", projection.select().to_string()),
                ],
                "works_batch",
            )
            .await?;
        Ok(page.map(|p| p.results).unwrap_or_default())
    }

    async fn citing_page(
        &self,
        id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        let response: Option<WorksPage> = self
            .request(
                format!("{}/works", self.base_url),
                vec![
                    ("filter", format!("cites:{id}")),
                    ("per-page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("select", "id".to_string()),
                ],
                "citing",
            )
            .await?;
        Ok(response.map(|p| p.results).unwrap_or_default())
    }

    async fn get_author(&self, id: &CatalogId) -> Result<Option<AuthorRecord>> {
        self.request(
            format!("{}/authors/{id}", self.base_url),
            Vec::new(),
            "author",
        )
        .await
    }

    async fn author_works_page(
        &self,
        author_id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        let response: Option<WorksPage> = self
            .request(
                format!("{}/works", self.base_url),
                vec![
                    ("filter", format!("author.id:{author_id}")),
                    ("per-page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("sort", "cited_by_count:desc".to_string()),
                    ("select", Projection::Full.select().to_string()),
                ],
                "author_works",
            )
            .await?;
        Ok(response.map(|p| p.results).unwrap_or_default())
    }

    async fn search_works(&self, query: &str, limit: usize) -> Result<Vec<WorkRecord>> {
        let response: Option<WorksPage> = self
            .request(
                format!("{}/works", self.base_url),
                vec![
                    ("search", query.to_string()),
                    ("per-page", limit.to_string()),
                    (
                        "select",
                        "id,doi,title,display_name,publication_year,cited_by_count".to_string(),
                    ),
                ],
                "search",
            )
            .await?;
        Ok(response.map(|p| p.results).unwrap_or_default())
    }
}

fn is_retryable(error: &AppError) -> bool {
    match error {
        AppError::ServiceUnavailable { .. } => true,
        AppError::HttpClient(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}
