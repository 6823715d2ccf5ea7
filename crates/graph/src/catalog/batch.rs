//! Bulk fetch across id chunks with bounded parallelism.
//!
//! Ids are split into chunks of at most [`MAX_FILTER_IDS`], chunks run in
//! groups of at most [`MAX_PARALLEL_REQUESTS`] fully parallel requests, and
//! groups run sequentially. A failed chunk degrades the result instead of
//! failing it: its records are simply absent from the merged map.

use super::records::WorkRecord;
use super::{CatalogApi, Projection};
use crate::ids::CatalogId;
use futures::future;
use litgraph_common::{metrics, MAX_FILTER_IDS, MAX_PARALLEL_REQUESTS};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fetch `ids` in chunked, bounded-parallel batches and merge the results
/// keyed by canonical id. `on_chunk(index, len)` fires once per settled
/// chunk, failed or not, which is what drives progress accounting.
pub async fn fetch_bulk<F>(
    catalog: &dyn CatalogApi,
    ids: &[CatalogId],
    projection: Projection,
    mut on_chunk: F,
) -> HashMap<CatalogId, WorkRecord>
where
    F: FnMut(usize, usize),
{
    let mut merged = HashMap::with_capacity(ids.len());
    if ids.is_empty() {
        return merged;
    }

    let chunks: Vec<&[CatalogId]> = ids.chunks(MAX_FILTER_IDS).collect();
    let total_chunks = chunks.len();
    let mut settled = 0;

    for group in chunks.chunks(MAX_PARALLEL_REQUESTS) {
        let requests: Vec<_> = group
            .iter()
            .map(|chunk| catalog.get_works_batch(chunk, projection))
            .collect();
        let results = future::join_all(requests).await;

        for (offset, result) in results.into_iter().enumerate() {
            let chunk_index = settled + offset;
            match result {
                Ok(records) => {
                    for record in records {
                        let id = record.canonical_id();
                        if !id.is_empty() {
                            merged.insert(id, record);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        chunk = chunk_index,
                        chunk_len = group[offset].len(),
                        "batch chunk failed, continuing without it"
                    );
                    metrics::record_degraded_chunk("works_batch");
                }
            }
            on_chunk(chunk_index, group[offset].len());
        }
        settled += group.len();
    }

    debug!(
        requested = ids.len(),
        fetched = merged.len(),
        chunks = total_chunks,
        "bulk fetch complete"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::mock::{work, MockCatalog};

    fn ids(n: usize) -> Vec<CatalogId> {
        (1..=n).map(|i| CatalogId::from_numeric(i as u64)).collect()
    }

    fn catalog_with_works(n: usize) -> MockCatalog {
        let mut catalog = MockCatalog::new();
        for i in 1..=n {
            catalog = catalog.with_work(work(&format!("W{i}"), 2020, 1, &[]));
        }
        catalog
    }

    #[tokio::test]
    async fn test_chunk_count_and_sizes() {
        let catalog = catalog_with_works(250);
        let merged = fetch_bulk(&catalog, &ids(250), Projection::Slim, |_, _| {}).await;

        assert_eq!(merged.len(), 250);
        let sizes = catalog.batch_sizes();
        assert_eq!(sizes.len(), 3);
        assert!(sizes.iter().all(|&s| s <= MAX_FILTER_IDS));
        assert_eq!(sizes.iter().sum::<usize>(), 250);
    }

    #[tokio::test]
    async fn test_parallelism_never_exceeds_group_bound() {
        // 1500 ids -> 15 chunks -> groups of 10 and 5
        let catalog = catalog_with_works(1500);
        let merged = fetch_bulk(&catalog, &ids(1500), Projection::Slim, |_, _| {}).await;

        assert_eq!(merged.len(), 1500);
        let peak = catalog.peak_in_flight();
        assert!(peak <= MAX_PARALLEL_REQUESTS, "peak in flight was {peak}");
        assert!(peak > 1, "chunks within a group should overlap");
    }

    #[tokio::test]
    async fn test_failed_chunk_degrades_instead_of_failing() {
        // 450 ids -> 5 chunks; poison the chunk holding W150 (chunk 1)
        let catalog =
            catalog_with_works(450).fail_chunk_containing(CatalogId::normalize("W150"));
        let mut settled_chunks = Vec::new();
        let merged = fetch_bulk(&catalog, &ids(450), Projection::Slim, |index, len| {
            settled_chunks.push((index, len));
        })
        .await;

        // chunk 1 covers W101..=W200
        assert_eq!(merged.len(), 350);
        assert!(merged.contains_key(&CatalogId::normalize("W100")));
        assert!(!merged.contains_key(&CatalogId::normalize("W150")));
        assert!(merged.contains_key(&CatalogId::normalize("W201")));
        // every chunk settles exactly once, failures included
        assert_eq!(settled_chunks.len(), 5);
        assert_eq!(settled_chunks.iter().map(|(_, len)| len).sum::<usize>(), 450);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_requests() {
        let catalog = MockCatalog::new();
        let merged = fetch_bulk(&catalog, &[], Projection::Full, |_, _| {}).await;
        assert!(merged.is_empty());
        assert_eq!(catalog.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_ids_are_absent_not_errors() {
        let catalog = catalog_with_works(3);
        let mut requested = ids(3);
        requested.push(CatalogId::normalize("W999"));
        let merged = fetch_bulk(&catalog, &requested, Projection::Slim, |_, _| {}).await;
        assert_eq!(merged.len(), 3);
        assert!(!merged.contains_key(&CatalogId::normalize("W999")));
    }
}
