//! Works-catalog access layer.
//!
//! [`CatalogApi`] is the seam between the pipeline and the remote catalog.
//! The production implementation is [`OpenAlexCatalog`]; [`MockCatalog`] is an
//! in-memory stand-in used by tests. [`CountingCatalog`] wraps any
//! implementation and counts requests, which is how each build gets its own
//! call tally without shared mutable state.

pub mod batch;
pub mod mock;
pub mod openalex;
pub mod records;

pub use mock::MockCatalog;
pub use openalex::OpenAlexCatalog;

use crate::ids::CatalogId;
use async_trait::async_trait;
use litgraph_common::{config::CatalogConfig, Result};
use records::{AuthorRecord, WorkRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Field projection requested from the catalog. Slim is the ranking slice,
/// full is everything the display form needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Slim,
    Full,
}

impl Projection {
    /// The `select` clause sent to the provider.
    pub fn select(&self) -> &'static str {
        match self {
            Projection::Slim => "id,publication_year,cited_by_count,referenced_works",
            Projection::Full => {
                "id,doi,title,display_name,publication_year,language,type,\
                 abstract_inverted_index,authorships,cited_by_count,referenced_works,\
                 primary_location,open_access,fwci,citation_normalized_percentile,\
                 primary_topic,sustainable_development_goals,keywords,is_retracted"
            }
        }
    }
}

/// Remote works catalog.
///
/// Single-record lookups resolve missing records as `Ok(None)`; transport
/// and decode failures surface as errors so callers can decide between
/// fatal (seed resolution) and degraded (everything else) handling.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one work by canonical id, full projection.
    async fn get_work(&self, id: &CatalogId) -> Result<Option<WorkRecord>>;

    /// Fetch one work by bare DOI, full projection.
    async fn get_work_by_doi(&self, doi: &str) -> Result<Option<WorkRecord>>;

    /// Fetch up to [`litgraph_common::MAX_FILTER_IDS`] works in one request.
    /// Records come back in provider order; absent ids are silently missing.
    async fn get_works_batch(
        &self,
        ids: &[CatalogId],
        projection: Projection,
    ) -> Result<Vec<WorkRecord>>;

    /// One page of works citing `id`, id-only projection. `page` is 1-based.
    async fn citing_page(
        &self,
        id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>>;

    /// Fetch one author profile by canonical id.
    async fn get_author(&self, id: &CatalogId) -> Result<Option<AuthorRecord>>;

    /// One page of an author's works, full projection, most cited first.
    async fn author_works_page(
        &self,
        author_id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>>;

    /// Relevance search over works.
    async fn search_works(&self, query: &str, limit: usize) -> Result<Vec<WorkRecord>>;
}

/// Shared request tally, cloned into [`CountingCatalog`] wrappers.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU64>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Decorator that counts every request made through it. Each build wraps
/// the shared catalog in a fresh one, so concurrent builds never mix their
/// tallies.
pub struct CountingCatalog<'a> {
    inner: &'a dyn CatalogApi,
    counter: CallCounter,
}

impl<'a> CountingCatalog<'a> {
    pub fn new(inner: &'a dyn CatalogApi, counter: CallCounter) -> Self {
        Self { inner, counter }
    }
}

#[async_trait]
impl CatalogApi for CountingCatalog<'_> {
    async fn get_work(&self, id: &CatalogId) -> Result<Option<WorkRecord>> {
        self.counter.increment();
        self.inner.get_work(id).await
    }

    async fn get_work_by_doi(&self, doi: &str) -> Result<Option<WorkRecord>> {
        self.counter.increment();
        self.inner.get_work_by_doi(doi).await
    }

    async fn get_works_batch(
        &self,
        ids: &[CatalogId],
        projection: Projection,
    ) -> Result<Vec<WorkRecord>> {
        self.counter.increment();
        self.inner.get_works_batch(ids, projection).await
    }

    async fn citing_page(
        &self,
        id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        self.counter.increment();
        self.inner.citing_page(id, page, per_page).await
    }

    async fn get_author(&self, id: &CatalogId) -> Result<Option<AuthorRecord>> {
        self.counter.increment();
        self.inner.get_author(id).await
    }

    async fn author_works_page(
        &self,
        author_id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        self.counter.increment();
        self.inner.author_works_page(author_id, page, per_page).await
    }

    async fn search_works(&self, query: &str, limit: usize) -> Result<Vec<WorkRecord>> {
        self.counter.increment();
        self.inner.search_works(query, limit).await
    }
}

/// Build the configured catalog implementation.
pub fn create_catalog(config: &CatalogConfig) -> Result<Arc<dyn CatalogApi>> {
    match config.provider.as_str() {
        "openalex" => Ok(Arc::new(OpenAlexCatalog::new(config)?)),
        "mock" => Ok(Arc::new(MockCatalog::new())),
        other => {
            warn!(provider = %other, "unknown catalog provider, falling back to mock");
            Ok(Arc::new(MockCatalog::new()))
        }
    }
}
