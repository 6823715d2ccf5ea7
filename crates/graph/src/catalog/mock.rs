//! In-memory catalog for tests and offline development.
//!
//! Fixtures are loaded through the builder-style `with_*` methods. The mock
//! also records request counts, batch sizes, and peak request overlap so
//! tests can assert on batching and concurrency behavior, and individual
//! ids can be poisoned to simulate chunk-level failures.

use super::records::{AuthorRecord, WorkRecord};
use super::{CatalogApi, Projection};
use crate::ids::CatalogId;
use async_trait::async_trait;
use litgraph_common::{AppError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockCatalog {
    works: HashMap<CatalogId, WorkRecord>,
    citing: HashMap<CatalogId, Vec<CatalogId>>,
    authors: HashMap<CatalogId, AuthorRecord>,
    author_works: HashMap<CatalogId, Vec<CatalogId>>,
    fail_batch_ids: HashSet<CatalogId>,
    fail_work_ids: HashSet<CatalogId>,
    fail_citing_ids: HashSet<CatalogId>,
    requests: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work(mut self, record: WorkRecord) -> Self {
        let id = record.canonical_id();
        if !id.is_empty() {
            self.works.insert(id, record);
        }
        self
    }

    pub fn with_works(mut self, records: impl IntoIterator<Item = WorkRecord>) -> Self {
        for record in records {
            self = self.with_work(record);
        }
        self
    }

    /// Register the list of works citing `id`, in page order.
    pub fn with_citing(mut self, id: &str, citing: &[&str]) -> Self {
        self.citing.insert(
            CatalogId::normalize(id),
            citing.iter().map(|c| CatalogId::normalize(c)).collect(),
        );
        self
    }

    pub fn with_author(mut self, record: AuthorRecord) -> Self {
        let id = record.canonical_id();
        if !id.is_empty() {
            self.authors.insert(id, record);
        }
        self
    }

    /// Register an author's works, most cited first. The works themselves
    /// must also be loaded via [`Self::with_work`].
    pub fn with_author_works(mut self, author_id: &str, works: &[&str]) -> Self {
        self.author_works.insert(
            CatalogId::normalize(author_id),
            works.iter().map(|w| CatalogId::normalize(w)).collect(),
        );
        self
    }

    /// Any batch request whose id list contains `id` fails.
    pub fn fail_chunk_containing(mut self, id: CatalogId) -> Self {
        self.fail_batch_ids.insert(id);
        self
    }

    /// Single-work lookups for `id` fail with a transport-style error.
    pub fn fail_work(mut self, id: &str) -> Self {
        self.fail_work_ids.insert(CatalogId::normalize(id));
        self
    }

    /// Citing-page requests for `id` fail.
    pub fn fail_citing_for(mut self, id: &str) -> Self {
        self.fail_citing_ids.insert(CatalogId::normalize(id));
        self
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn page_of(list: &[CatalogId], page: usize, per_page: usize) -> &[CatalogId] {
        let start = page.saturating_sub(1) * per_page;
        let end = (start + per_page).min(list.len());
        if start >= list.len() {
            &[]
        } else {
            &list[start..end]
        }
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn get_work(&self, id: &CatalogId) -> Result<Option<WorkRecord>> {
        self.record_request();
        if self.fail_work_ids.contains(id) {
            return Err(AppError::Catalog {
                message: format!("mock failure for {id}"),
            });
        }
        Ok(self.works.get(id).cloned())
    }

    async fn get_work_by_doi(&self, doi: &str) -> Result<Option<WorkRecord>> {
        self.record_request();
        Ok(self
            .works
            .values()
            .find(|record| record.doi.as_deref() == Some(doi))
            .cloned())
    }

    async fn get_works_batch(
        &self,
        ids: &[CatalogId],
        _projection: Projection,
    ) -> Result<Vec<WorkRecord>> {
        self.record_request();
        self.batch_sizes.lock().unwrap().push(ids.len());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        // jittered delay so chunks in the same group genuinely overlap
        let millis = {
            use rand::Rng;
            rand::thread_rng().gen_range(1..4)
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if ids.iter().any(|id| self.fail_batch_ids.contains(id)) {
            return Err(AppError::Catalog {
                message: "mock chunk failure".to_string(),
            });
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.works.get(id).cloned())
            .collect())
    }

    async fn citing_page(
        &self,
        id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        self.record_request();
        if self.fail_citing_ids.contains(id) {
            return Err(AppError::Catalog {
                message: format!("mock citing failure for {id}"),
            });
        }
        let citing = self.citing.get(id).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::page_of(citing, page, per_page)
            .iter()
            .map(|citing_id| WorkRecord {
                id: Some(format!("https://openalex.org/{citing_id}")),
                ..Default::default()
            })
            .collect())
    }

    async fn get_author(&self, id: &CatalogId) -> Result<Option<AuthorRecord>> {
        self.record_request();
        Ok(self.authors.get(id).cloned())
    }

    async fn author_works_page(
        &self,
        author_id: &CatalogId,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkRecord>> {
        self.record_request();
        let works = self
            .author_works
            .get(author_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(Self::page_of(works, page, per_page)
            .iter()
            .filter_map(|work_id| self.works.get(work_id).cloned())
            .collect())
    }

    async fn search_works(&self, query: &str, limit: usize) -> Result<Vec<WorkRecord>> {
        self.record_request();
        let needle = query.to_lowercase();
        let mut matches: Vec<WorkRecord> = self
            .works
            .values()
            .filter(|record| {
                record
                    .title
                    .as_deref()
                    .or(record.display_name.as_deref())
                    .map(|title| title.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.canonical_id().cmp(&b.canonical_id()));
        matches.truncate(limit);
        Ok(matches)
    }
}

/// Work fixture with normalized URL-form ids, the shape the provider sends.
pub fn work(id: &str, year: i32, cited_by: i64, references: &[&str]) -> WorkRecord {
    let canonical = CatalogId::normalize(id);
    WorkRecord {
        id: Some(format!("https://openalex.org/{canonical}")),
        title: Some(format!("Work {canonical}")),
        display_name: Some(format!("Work {canonical}")),
        publication_year: Some(year),
        cited_by_count: Some(cited_by),
        referenced_works: Some(
            references
                .iter()
                .map(|r| format!("https://openalex.org/{}", CatalogId::normalize(r)))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Author fixture in provider shape.
pub fn author(id: &str, name: &str) -> AuthorRecord {
    AuthorRecord {
        id: Some(format!("https://openalex.org/{}", CatalogId::normalize(id))),
        display_name: Some(name.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_citing_pages_slice_in_order() {
        let catalog = MockCatalog::new().with_citing("W1", &["W10", "W11", "W12", "W13", "W14"]);
        let id = CatalogId::normalize("W1");

        let page_1 = catalog.citing_page(&id, 1, 2).await.unwrap();
        let page_3 = catalog.citing_page(&id, 3, 2).await.unwrap();
        let page_4 = catalog.citing_page(&id, 4, 2).await.unwrap();

        assert_eq!(page_1.len(), 2);
        assert_eq!(page_1[0].canonical_id().as_str(), "W10");
        assert_eq!(page_3.len(), 1);
        assert_eq!(page_3[0].canonical_id().as_str(), "W14");
        assert!(page_4.is_empty());
    }

    #[tokio::test]
    async fn test_doi_lookup_matches_stored_doi() {
        let mut record = work("W1", 2020, 5, &[]);
        record.doi = Some("10.1038/nature12373".to_string());
        let catalog = MockCatalog::new().with_work(record);

        let found = catalog.get_work_by_doi("10.1038/nature12373").await.unwrap();
        assert_eq!(found.unwrap().canonical_id().as_str(), "W1");
        assert!(catalog.get_work_by_doi("10.1/none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_work_lookup_is_an_error_not_none() {
        let catalog = MockCatalog::new()
            .with_work(work("W1", 2020, 5, &[]))
            .fail_work("W1");
        assert!(catalog
            .get_work(&CatalogId::normalize("W1"))
            .await
            .is_err());
    }
}
