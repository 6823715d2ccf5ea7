//! Final graph assembly: nodes, in-universe edges, and the citation index.
//!
//! The node universe is fixed before any edge work. Edges only connect
//! papers inside the universe; references leaving it are dropped here and
//! only survive in `paper.references`. Output order is deterministic:
//! nodes by year descending then id ascending, edges in node order with
//! each node's references in their stored order.

use crate::ids::CatalogId;
use crate::paper::Paper;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Cites,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: CatalogId,
    pub target: CatalogId,
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn cites(source: CatalogId, target: CatalogId) -> GraphEdge {
        GraphEdge {
            source,
            target,
            kind: EdgeKind::Cites,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: CatalogId,
    /// Display ordering key, the publication year.
    pub order: i32,
    /// References of this paper that stayed inside the universe.
    pub connections: Vec<CatalogId>,
    /// Exact inverse of `connections` across the whole graph.
    pub cited_by: Vec<CatalogId>,
    pub paper: Paper,
}

/// Assemble a source-centered graph. The universe is the source, the seed
/// papers, and the selected candidates, deduplicated by id with the first
/// occurrence winning.
pub fn assemble(source: &Paper, seeds: &[Paper], selected: &[Paper]) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut seen = HashSet::new();
    let mut papers = Vec::with_capacity(1 + seeds.len() + selected.len());
    for paper in std::iter::once(source).chain(seeds).chain(selected) {
        if !paper.id.is_empty() && seen.insert(paper.id.clone()) {
            papers.push(paper);
        }
    }
    build(papers)
}

/// Assemble a flat collection of works, deduplicated by id. Used for
/// author graphs where no paper is structurally special.
pub fn assemble_works(papers: &[Paper]) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut seen = HashSet::new();
    let mut deduped = Vec::with_capacity(papers.len());
    for paper in papers {
        if !paper.id.is_empty() && seen.insert(paper.id.clone()) {
            deduped.push(paper);
        }
    }
    build(deduped)
}

fn build(mut papers: Vec<&Paper>) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let universe: HashSet<CatalogId> = papers.iter().map(|p| p.id.clone()).collect();
    papers.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| a.id.cmp(&b.id)));

    let mut edges = Vec::new();
    let mut cited_by: HashMap<CatalogId, Vec<CatalogId>> = HashMap::new();
    let mut connections_per_node: Vec<Vec<CatalogId>> = Vec::with_capacity(papers.len());

    for paper in &papers {
        let connections: Vec<CatalogId> = paper
            .references
            .iter()
            .filter(|r| universe.contains(*r))
            .cloned()
            .collect();
        for target in &connections {
            edges.push(GraphEdge::cites(paper.id.clone(), target.clone()));
            cited_by
                .entry(target.clone())
                .or_default()
                .push(paper.id.clone());
        }
        connections_per_node.push(connections);
    }

    let nodes = papers
        .into_iter()
        .zip(connections_per_node)
        .map(|(paper, connections)| GraphNode {
            id: paper.id.clone(),
            order: paper.year,
            connections,
            cited_by: cited_by.remove(&paper.id).unwrap_or_default(),
            paper: paper.clone(),
        })
        .collect();

    (nodes, edges)
}
