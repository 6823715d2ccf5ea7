//! Graph build orchestration.
//!
//! A build runs eight stages: resolve the source, fetch its references as
//! root seeds, expand and rank the reference neighborhood, discover citing
//! works as branch seeds, expand and rank the citing neighborhood, hydrate
//! everything that made the cut, and assemble the final graph. Only source
//! resolution is fatal; every later stage degrades to whatever data
//! arrived. Each build wraps the shared catalog in its own counting
//! decorator, so concurrent builds report independent call tallies.

use crate::assemble::{assemble, assemble_works, GraphEdge, GraphNode};
use crate::catalog::batch::fetch_bulk;
use crate::catalog::{CallCounter, CatalogApi, CountingCatalog, Projection};
use crate::ids::{parse_doi, CatalogId};
use crate::paper::{NodeRole, Paper, SlimPaper};
use crate::progress::{ProgressReporter, ProgressSender};
use crate::rank::{compute_branch_ranks, compute_root_ranks, top_ranked};
use chrono::{Datelike, Utc};
use litgraph_common::{
    config::GraphConfig, metrics, AppError, Result, CITING_PAGE_SIZE, MAX_FILTER_IDS,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Minimum number of branch seeds that must share a reference before it
/// becomes a branch candidate.
const MIN_SHARED_CITATIONS: usize = 2;

/// Assumed references per work when estimating progress before the real
/// neighborhood size is known.
const EST_REFS_PER_WORK: usize = 25;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub n_roots: Option<usize>,
    pub n_branches: Option<usize>,
    /// Fixed reference year for recency weights. Defaults to the current
    /// calendar year.
    pub current_year: Option<i32>,
    pub progress: Option<ProgressSender>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorBuildOptions {
    pub max_works: Option<usize>,
    pub progress: Option<ProgressSender>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildMetadata {
    pub build_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<CatalogId>,
    pub root_seeds: usize,
    pub root_candidates: usize,
    pub selected_roots: usize,
    pub branch_seeds: usize,
    pub branch_candidates: usize,
    pub selected_branches: usize,
    pub papers_in_graph: usize,
    pub edges_in_graph: usize,
    pub catalog_calls: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Paper>,
    pub root_seeds: Vec<CatalogId>,
    pub branch_seeds: Vec<CatalogId>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: BuildMetadata,
}

/// Citation graph pipeline over a shared catalog.
pub struct GraphService {
    catalog: Arc<dyn CatalogApi>,
    limits: GraphConfig,
}

impl GraphService {
    pub fn new(catalog: Arc<dyn CatalogApi>, limits: GraphConfig) -> Self {
        Self { catalog, limits }
    }

    /// Build a source-centered citation graph.
    ///
    /// `identifier` may be a bare key, a catalog URL, or a DOI in raw or
    /// URL form. Fails only when the source itself cannot be resolved.
    #[instrument(skip(self, options), fields(identifier = %identifier))]
    pub async fn build_graph(&self, identifier: &str, options: BuildOptions) -> Result<BuiltGraph> {
        let started = Instant::now();
        let result = self.build_graph_inner(identifier, options, &started).await;
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(graph) => {
                metrics::record_build("work", true, elapsed, graph.nodes.len(), graph.edges.len());
            }
            Err(_) => metrics::record_build("work", false, elapsed, 0, 0),
        }
        result
    }

    async fn build_graph_inner(
        &self,
        identifier: &str,
        options: BuildOptions,
        started: &Instant,
    ) -> Result<BuiltGraph> {
        let build_id = Uuid::new_v4();
        let counter = CallCounter::new();
        let counting = CountingCatalog::new(self.catalog.as_ref(), counter.clone());
        let catalog: &dyn CatalogApi = &counting;
        let mut progress = ProgressReporter::new(options.progress.clone());

        let n_roots = options.n_roots.unwrap_or(self.limits.n_roots);
        let n_branches = options.n_branches.unwrap_or(self.limits.n_branches);
        let seeds_limit = self.limits.branch_seeds_limit;
        let current_year = options.current_year.unwrap_or_else(|| Utc::now().year());

        // Stage 1: resolve the source. The only fatal stage.
        progress.stage("resolving source");
        let source = resolve_source(catalog, identifier).await?;
        let source_slim = SlimPaper::from_paper(&source);

        let reference_count = source.references.len();
        let hydrate_estimate = reference_count + seeds_limit + n_roots + n_branches;
        progress.revise_remaining(
            1 + est_chunks(reference_count)
                + est_chunks(reference_count * EST_REFS_PER_WORK)
                + est_pages(seeds_limit)
                + est_chunks(seeds_limit) * 2
                + est_chunks(hydrate_estimate),
        );
        progress.record(1, "resolved source");

        // Stage 2: root seeds are the source's own references.
        let root_seed_ids = source.references.clone();
        let root_seeds =
            fetch_slim_map(catalog, &root_seed_ids, &mut progress, "fetching references").await;

        // Stage 3: expand one hop beyond the seeds.
        let root_seed_set: HashSet<&CatalogId> = root_seed_ids.iter().collect();
        let mut expansion: HashSet<CatalogId> = HashSet::new();
        for seed in root_seeds.values() {
            for reference in &seed.references {
                if !root_seed_set.contains(reference) && *reference != source.id {
                    expansion.insert(reference.clone());
                }
            }
        }
        let mut expansion_ids: Vec<CatalogId> = expansion.into_iter().collect();
        expansion_ids.sort();

        progress.revise_remaining(
            est_chunks(expansion_ids.len())
                + est_pages(seeds_limit)
                + est_chunks(seeds_limit) * 2
                + est_chunks(hydrate_estimate),
        );
        let root_candidates =
            fetch_slim_map(catalog, &expansion_ids, &mut progress, "expanding references").await;

        // Stage 4: rank the reference side.
        let root_ranks = compute_root_ranks(&root_seeds, &root_candidates);
        let selected_roots = top_ranked(&root_ranks, n_roots);

        // Stage 5: branch seeds are recent works citing the source.
        progress.stage("discovering citing works");
        let citing_ids = fetch_citing(catalog, &source.id, seeds_limit, &mut progress).await;

        progress.revise_remaining(
            est_chunks(citing_ids.len()) * 2
                + est_chunks(reference_count + citing_ids.len() + n_roots + n_branches),
        );
        let citing_papers =
            fetch_slim_map(catalog, &citing_ids, &mut progress, "fetching citing works").await;
        let branch_seeds: HashMap<CatalogId, SlimPaper> = citing_papers
            .into_iter()
            .filter(|(_, paper)| paper.year > source.year && paper.citation_count > 0)
            .collect();
        let branch_seed_ids: Vec<CatalogId> = citing_ids
            .iter()
            .filter(|id| branch_seeds.contains_key(*id))
            .cloned()
            .collect();

        // Stage 6: branch candidates are works co-cited by several seeds.
        let mut tally: HashMap<&CatalogId, usize> = HashMap::new();
        for seed in branch_seeds.values() {
            for reference in &seed.references {
                *tally.entry(reference).or_insert(0) += 1;
            }
        }
        let mut candidate_ids: Vec<CatalogId> = tally
            .into_iter()
            .filter(|(id, shared)| {
                *shared >= MIN_SHARED_CITATIONS
                    && !branch_seeds.contains_key(*id)
                    && **id != source.id
            })
            .map(|(id, _)| id.clone())
            .collect();
        candidate_ids.sort();

        progress.revise_remaining(
            est_chunks(candidate_ids.len())
                + est_chunks(reference_count + branch_seed_ids.len() + n_roots + n_branches),
        );
        let branch_candidates: HashMap<CatalogId, SlimPaper> =
            fetch_slim_map(catalog, &candidate_ids, &mut progress, "fetching branch candidates")
                .await
                .into_iter()
                .filter(|(_, paper)| paper.year > source.year && paper.citation_count > 0)
                .collect();

        // Stage 7: rank the citing side.
        let branch_ranks =
            compute_branch_ranks(&source_slim, &branch_seeds, &branch_candidates, current_year);
        let selected_branches = top_ranked(&branch_ranks, n_branches);

        // Stage 8: hydrate every graph member and assemble.
        let mut hydrate_ids: Vec<CatalogId> = Vec::new();
        let mut seen: HashSet<CatalogId> = HashSet::new();
        seen.insert(source.id.clone());
        for id in root_seed_ids
            .iter()
            .chain(&branch_seed_ids)
            .chain(&selected_roots)
            .chain(&selected_branches)
        {
            if seen.insert(id.clone()) {
                hydrate_ids.push(id.clone());
            }
        }

        progress.revise_remaining(est_chunks(hydrate_ids.len()));
        let full_records = fetch_bulk(catalog, &hydrate_ids, Projection::Full, |_, _| {
            progress.record(1, "hydrating metadata")
        })
        .await;

        let root_side: HashSet<&CatalogId> =
            root_seed_ids.iter().chain(&selected_roots).collect();
        let mut papers: HashMap<CatalogId, Paper> = HashMap::with_capacity(full_records.len());
        for (id, record) in &full_records {
            let mut paper = Paper::from_record(record);
            paper.role = if root_side.contains(id) {
                Some(NodeRole::Root)
            } else {
                Some(NodeRole::Branch)
            };
            papers.insert(id.clone(), paper);
        }

        let seed_papers: Vec<Paper> = root_seed_ids
            .iter()
            .chain(&branch_seed_ids)
            .filter_map(|id| papers.get(id).cloned())
            .collect();
        let selected_papers: Vec<Paper> = selected_roots
            .iter()
            .chain(&selected_branches)
            .filter_map(|id| papers.get(id).cloned())
            .collect();

        let (nodes, edges) = assemble(&source, &seed_papers, &selected_papers);
        progress.finish("graph complete");

        let metadata = BuildMetadata {
            build_id,
            source_id: Some(source.id.clone()),
            root_seeds: root_seed_ids.len(),
            root_candidates: root_candidates.len(),
            selected_roots: selected_roots.len(),
            branch_seeds: branch_seeds.len(),
            branch_candidates: branch_candidates.len(),
            selected_branches: selected_branches.len(),
            papers_in_graph: nodes.len(),
            edges_in_graph: edges.len(),
            catalog_calls: counter.get(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            build_id = %build_id,
            source = %source.id,
            nodes = metadata.papers_in_graph,
            edges = metadata.edges_in_graph,
            catalog_calls = metadata.catalog_calls,
            elapsed_ms = metadata.elapsed_ms,
            "graph build complete"
        );

        Ok(BuiltGraph {
            source: Some(source),
            root_seeds: root_seed_ids,
            branch_seeds: branch_seed_ids,
            nodes,
            edges,
            metadata,
        })
    }

    /// Build a graph of one author's works, citation edges restricted to
    /// the fetched set.
    #[instrument(skip(self, options), fields(identifier = %identifier))]
    pub async fn build_author_graph(
        &self,
        identifier: &str,
        options: AuthorBuildOptions,
    ) -> Result<BuiltGraph> {
        let started = Instant::now();
        let result = self
            .build_author_graph_inner(identifier, options, &started)
            .await;
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(graph) => {
                metrics::record_build("author", true, elapsed, graph.nodes.len(), graph.edges.len());
            }
            Err(_) => metrics::record_build("author", false, elapsed, 0, 0),
        }
        result
    }

    async fn build_author_graph_inner(
        &self,
        identifier: &str,
        options: AuthorBuildOptions,
        started: &Instant,
    ) -> Result<BuiltGraph> {
        let build_id = Uuid::new_v4();
        let counter = CallCounter::new();
        let counting = CountingCatalog::new(self.catalog.as_ref(), counter.clone());
        let catalog: &dyn CatalogApi = &counting;
        let mut progress = ProgressReporter::new(options.progress.clone());
        let max_works = options.max_works.unwrap_or(self.limits.max_author_works);

        progress.revise_remaining(1 + est_pages(max_works));
        progress.stage("resolving author");
        let author_id = CatalogId::normalize(identifier);
        if author_id.is_empty() {
            return Err(AppError::AuthorNotFound {
                id: identifier.to_string(),
            });
        }
        let author = match catalog.get_author(&author_id).await {
            Ok(Some(author)) => author,
            Ok(None) => {
                return Err(AppError::AuthorNotFound {
                    id: identifier.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, identifier, "author resolution failed");
                return Err(AppError::AuthorNotFound {
                    id: identifier.to_string(),
                });
            }
        };
        progress.record(1, "resolved author");

        let pages = max_works.div_ceil(CITING_PAGE_SIZE);
        let mut records = Vec::with_capacity(max_works);
        for page in 1..=pages {
            let per_page = CITING_PAGE_SIZE.min(max_works);
            match catalog.author_works_page(&author_id, page, per_page).await {
                Ok(page_records) => {
                    let fetched = page_records.len();
                    records.extend(page_records);
                    progress.record(1, "fetching author works");
                    if fetched < per_page {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, page, "author works page failed, stopping early");
                    break;
                }
            }
        }

        let mut seen = HashSet::new();
        let mut papers: Vec<Paper> = Vec::with_capacity(records.len());
        for record in &records {
            let paper = Paper::from_record(record);
            if !paper.id.is_empty() && seen.insert(paper.id.clone()) {
                papers.push(paper);
            }
        }
        papers.truncate(max_works);

        let (nodes, edges) = assemble_works(&papers);
        progress.finish("author graph complete");

        let metadata = BuildMetadata {
            build_id,
            source_id: Some(author_id.clone()),
            root_seeds: 0,
            root_candidates: 0,
            selected_roots: 0,
            branch_seeds: 0,
            branch_candidates: 0,
            selected_branches: 0,
            papers_in_graph: nodes.len(),
            edges_in_graph: edges.len(),
            catalog_calls: counter.get(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            build_id = %build_id,
            author = %author_id,
            author_name = author.display_name.as_deref().unwrap_or(""),
            works = metadata.papers_in_graph,
            edges = metadata.edges_in_graph,
            catalog_calls = metadata.catalog_calls,
            "author graph build complete"
        );

        Ok(BuiltGraph {
            source: None,
            root_seeds: Vec::new(),
            branch_seeds: Vec::new(),
            nodes,
            edges,
            metadata,
        })
    }

    /// Fetch full metadata for a set of ids. Infallible: whatever could not
    /// be fetched is simply absent from the returned map.
    pub async fn hydrate_metadata(
        &self,
        ids: &[CatalogId],
        progress: Option<ProgressSender>,
    ) -> HashMap<CatalogId, Paper> {
        let counter = CallCounter::new();
        let counting = CountingCatalog::new(self.catalog.as_ref(), counter);
        let mut reporter = ProgressReporter::new(progress);

        let mut seen = HashSet::new();
        let unique: Vec<CatalogId> = ids
            .iter()
            .filter(|id| !id.is_empty() && seen.insert((*id).clone()))
            .cloned()
            .collect();

        reporter.revise_remaining(est_chunks(unique.len()));
        let records = fetch_bulk(&counting, &unique, Projection::Full, |_, _| {
            reporter.record(1, "hydrating metadata")
        })
        .await;
        reporter.finish("metadata complete");

        records
            .iter()
            .map(|(id, record)| (id.clone(), Paper::from_record(record)))
            .collect()
    }

    /// Fetch one work by id or DOI. Any failure resolves to `None`.
    pub async fn fetch_work(&self, identifier: &str) -> Option<Paper> {
        let result = match parse_doi(identifier) {
            Some(doi) => self.catalog.get_work_by_doi(&doi).await,
            None => {
                let id = CatalogId::normalize(identifier);
                if id.is_empty() {
                    return None;
                }
                self.catalog.get_work(&id).await
            }
        };
        match result {
            Ok(Some(record)) => Some(Paper::from_record(&record)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, identifier, "work fetch failed");
                None
            }
        }
    }

    /// Relevance search over the catalog.
    pub async fn search_works(&self, query: &str, limit: usize) -> Result<Vec<Paper>> {
        let records = self.catalog.search_works(query, limit).await?;
        Ok(records
            .iter()
            .map(Paper::from_record)
            .filter(|paper| !paper.id.is_empty())
            .collect())
    }
}

/// Resolve the build source from a DOI or catalog identifier. Any failure
/// here, remote or local, is the single fatal error of a build.
async fn resolve_source(catalog: &dyn CatalogApi, identifier: &str) -> Result<Paper> {
    let not_found = || AppError::SourceNotFound {
        id: identifier.to_string(),
    };
    let lookup = match parse_doi(identifier) {
        Some(doi) => catalog.get_work_by_doi(&doi).await,
        None => {
            let id = CatalogId::normalize(identifier);
            if id.is_empty() {
                return Err(not_found());
            }
            catalog.get_work(&id).await
        }
    };
    match lookup {
        Ok(Some(record)) if !record.canonical_id().is_empty() => Ok(Paper::from_record(&record)),
        Ok(_) => Err(not_found()),
        Err(e) => {
            warn!(error = %e, identifier, "source resolution failed");
            Err(not_found())
        }
    }
}

async fn fetch_slim_map(
    catalog: &dyn CatalogApi,
    ids: &[CatalogId],
    progress: &mut ProgressReporter,
    message: &'static str,
) -> HashMap<CatalogId, SlimPaper> {
    let records = fetch_bulk(catalog, ids, Projection::Slim, |_, _| {
        progress.record(1, message)
    })
    .await;
    records
        .iter()
        .map(|(id, record)| (id.clone(), SlimPaper::from_record(record)))
        .collect()
}

/// Collect up to `limit` ids of works citing `id`, paging until the limit
/// or a short page. A failed page keeps whatever was already collected.
async fn fetch_citing(
    catalog: &dyn CatalogApi,
    id: &CatalogId,
    limit: usize,
    progress: &mut ProgressReporter,
) -> Vec<CatalogId> {
    let mut collected = Vec::new();
    let pages = limit.div_ceil(CITING_PAGE_SIZE);
    for page in 1..=pages {
        match catalog.citing_page(id, page, CITING_PAGE_SIZE).await {
            Ok(records) => {
                let fetched = records.len();
                collected.extend(
                    records
                        .iter()
                        .map(|record| record.canonical_id())
                        .filter(|citing_id| !citing_id.is_empty()),
                );
                progress.record(1, "discovering citing works");
                if fetched < CITING_PAGE_SIZE {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, page, "citing page failed, stopping early");
                break;
            }
        }
    }
    collected.truncate(limit);
    collected
}

fn est_chunks(ids: usize) -> u64 {
    ids.div_ceil(MAX_FILTER_IDS) as u64
}

fn est_pages(ids: usize) -> u64 {
    ids.div_ceil(CITING_PAGE_SIZE) as u64
}
