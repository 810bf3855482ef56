//! Undirected multigraph adjacency
//!
//! Vertices are record identifiers held in a petgraph [`StableUnGraph`], so
//! indices stay valid while other vertices are removed. Each link gets its
//! own [`LinkId`], so two records may be linked more than once and a single
//! link can be removed without disturbing parallel ones.

use crate::graph::error::{GraphError, Result};
use crate::models::RecordId;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Handle of one undirected link, valid until the link is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(EdgeIndex);

/// Links carry their creation sequence so walks are deterministic
#[derive(Debug, Default, Clone)]
pub struct Adjacency {
    graph: StableUnGraph<RecordId, u64>,
    vertices: HashMap<RecordId, NodeIndex>,
    next_link: u64,
}

impl Adjacency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an isolated vertex; adding an existing vertex is a no-op
    pub fn add_vertex(&mut self, id: RecordId) {
        if !self.vertices.contains_key(&id) {
            let index = self.graph.add_node(id.clone());
            self.vertices.insert(id, index);
        }
    }

    pub fn has_vertex(&self, id: &RecordId) -> bool {
        self.vertices.contains_key(id)
    }

    /// Remove a vertex together with every link touching it
    pub fn remove_vertex(&mut self, id: &RecordId) -> Vec<LinkId> {
        let removed = self.links_of(id);
        if let Some(index) = self.vertices.remove(id) {
            self.graph.remove_node(index);
        }
        removed
    }

    /// Link two distinct existing vertices
    pub fn link(&mut self, a: &RecordId, b: &RecordId) -> Result<LinkId> {
        if a == b {
            return Err(GraphError::self_loop(a));
        }
        let index_of = |vertex: &RecordId| {
            self.vertices
                .get(vertex)
                .copied()
                .ok_or_else(|| GraphError::record_not_found(vertex))
        };
        let (source, target) = (index_of(a)?, index_of(b)?);

        let edge = self.graph.add_edge(source, target, self.next_link);
        self.next_link += 1;
        Ok(LinkId(edge))
    }

    /// Remove one link; returns its endpoints if it existed
    pub fn unlink(&mut self, link: LinkId) -> Option<(RecordId, RecordId)> {
        let (a, b) = self.graph.edge_endpoints(link.0)?;
        let endpoints = (self.graph[a].clone(), self.graph[b].clone());
        self.graph.remove_edge(link.0);
        Some(endpoints)
    }

    /// Links touching `id`, in creation order
    pub fn links_of(&self, id: &RecordId) -> Vec<LinkId> {
        let Some(index) = self.vertices.get(id) else {
            return Vec::new();
        };
        let mut links: Vec<(u64, LinkId)> = self
            .graph
            .edges(*index)
            .map(|edge| (*edge.weight(), LinkId(edge.id())))
            .collect();
        links.sort_unstable_by_key(|(sequence, _)| *sequence);
        links.into_iter().map(|(_, link)| link).collect()
    }

    /// The other end of `link` seen from `id`
    pub fn opposite(&self, id: &RecordId, link: LinkId) -> Option<&RecordId> {
        let (a, b) = self.graph.edge_endpoints(link.0)?;
        let (a, b) = (&self.graph[a], &self.graph[b]);
        if a == id {
            Some(b)
        } else if b == id {
            Some(a)
        } else {
            None
        }
    }

    /// Neighbors of `id`, one entry per link, in link creation order
    pub fn neighbors(&self, id: &RecordId) -> Vec<RecordId> {
        self.links_of(id)
            .into_iter()
            .filter_map(|link| self.opposite(id, link).cloned())
            .collect()
    }

    pub fn degree(&self, id: &RecordId) -> usize {
        self.vertices
            .get(id)
            .map_or(0, |index| self.graph.edges(*index).count())
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }
}
