use std::collections::HashMap;

use crate::graph::Graph;
use crate::types::{Edge, Overlap, VInt, Vertex};

/// Read-only aggregate of a partition: meta-vertex i stands for block i.
///
/// Sizes of meta-vertices are block sizes, sizes of meta-edges the number of
/// source edges crossing between two blocks (loops count the internal edges of
/// one block), and overlaps the shared vertices of block pairs.
#[derive(Debug, Clone)]
pub struct Join<G> {
    graph: G,
    vertex_sizes: Vec<usize>,
    edge_sizes: HashMap<Edge, usize>,
    overlaps: Vec<Overlap>,
}

impl<G: Graph> Join<G> {
    pub(crate) fn new(
        graph: G,
        vertex_sizes: Vec<usize>,
        edge_sizes: HashMap<Edge, usize>,
        overlaps: Vec<Overlap>,
    ) -> Self {
        Join {
            graph,
            vertex_sizes,
            edge_sizes,
            overlaps,
        }
    }

    /// Number of vertices in the block behind meta-vertex `v`.
    pub fn vertex_size(&self, v: Vertex) -> Option<usize> {
        self.vertex_sizes.get(v.index() as usize).copied()
    }

    /// Number of edges between two blocks, zero when they are not linked.
    pub fn edge_size(&self, e: Edge) -> usize {
        self.edge_sizes.get(&e).copied().unwrap_or(0)
    }

    /// Block pairs sharing at least one vertex, row-major over the upper triangle.
    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Number of meta-vertices, i.e. blocks in the joined partition.
    pub fn len(&self) -> usize {
        self.vertex_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_sizes.is_empty()
    }

    pub fn vertex_sizes(&self) -> &[usize] {
        &self.vertex_sizes
    }

    /// Dense symmetric matrix of meta-edge sizes.
    pub fn edge_size_matrix(&self) -> Vec<Vec<usize>> {
        let n = self.len() as VInt;
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| self.edge_size(Edge::new(Vertex::new(i), Vertex::new(j))))
                    .collect()
            })
            .collect()
    }
}
