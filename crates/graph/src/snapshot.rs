//! Slim cache schema for assembled graphs.
//!
//! A snapshot keeps only the graph structure: numeric work ids, the display
//! order key, and in-universe connections. Everything else is re-hydrated
//! from the catalog on read. Work ids convert losslessly between canonical
//! and numeric form; an id that cannot convert makes the graph uncacheable
//! rather than silently corrupting the snapshot.

use crate::assemble::{GraphEdge, GraphNode};
use crate::builder::BuiltGraph;
use crate::ids::CatalogId;
use crate::paper::Paper;
use litgraph_common::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimNode {
    pub id: u64,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimSnapshot {
    /// Absent for author graphs, whose source is not a work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
    pub nodes: Vec<SlimNode>,
}

impl SlimSnapshot {
    pub fn from_graph(graph: &BuiltGraph) -> Result<SlimSnapshot> {
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let id = numeric(&node.id)?;
            let mut connections = Vec::with_capacity(node.connections.len());
            for connection in &node.connections {
                connections.push(numeric(connection)?);
            }
            nodes.push(SlimNode {
                id,
                order: node.order,
                connections,
            });
        }
        Ok(SlimSnapshot {
            source_id: graph
                .metadata
                .source_id
                .as_ref()
                .and_then(CatalogId::to_numeric),
            nodes,
        })
    }

    pub fn source(&self) -> Option<CatalogId> {
        self.source_id.map(CatalogId::from_numeric)
    }

    /// Canonical ids of every node, in snapshot order.
    pub fn ids(&self) -> Vec<CatalogId> {
        self.nodes
            .iter()
            .map(|node| CatalogId::from_numeric(node.id))
            .collect()
    }

    /// Rebuild displayable nodes and edges from the snapshot structure.
    ///
    /// `papers` supplies hydrated metadata keyed by canonical id; nodes
    /// whose metadata is missing get a placeholder paper so the graph shape
    /// survives partial hydration. Connections pointing outside the
    /// snapshot are dropped, and the citation index is rebuilt as the exact
    /// inverse of the restored edges.
    pub fn restore(&self, papers: &HashMap<CatalogId, Paper>) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let in_snapshot: HashSet<u64> = self.nodes.iter().map(|node| node.id).collect();
        let mut restored: Vec<(CatalogId, i32, Vec<CatalogId>)> = self
            .nodes
            .iter()
            .map(|node| {
                let connections = node
                    .connections
                    .iter()
                    .filter(|target| in_snapshot.contains(target))
                    .map(|target| CatalogId::from_numeric(*target))
                    .collect();
                (CatalogId::from_numeric(node.id), node.order, connections)
            })
            .collect();
        restored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut edges = Vec::new();
        let mut cited_by: HashMap<CatalogId, Vec<CatalogId>> = HashMap::new();
        for (id, _, connections) in &restored {
            for target in connections {
                edges.push(GraphEdge::cites(id.clone(), target.clone()));
                cited_by.entry(target.clone()).or_default().push(id.clone());
            }
        }

        let nodes = restored
            .into_iter()
            .map(|(id, order, connections)| {
                let paper = papers.get(&id).cloned().unwrap_or_else(|| Paper {
                    id: id.clone(),
                    year: order,
                    source_url: format!("https://openalex.org/{id}"),
                    ..Default::default()
                });
                GraphNode {
                    cited_by: cited_by.remove(&id).unwrap_or_default(),
                    id,
                    order,
                    connections,
                    paper,
                }
            })
            .collect();
        (nodes, edges)
    }
}

fn numeric(id: &CatalogId) -> Result<u64> {
    id.to_numeric().ok_or_else(|| AppError::InvalidIdentifier {
        input: id.to_string(),
    })
}
