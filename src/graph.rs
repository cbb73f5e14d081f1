use crate::community_algo::{self, DetectionReport, PprParams};
use crate::error::Result;
use crate::join::Join;
use crate::partition::{Block, Partition};
use crate::types::{Edge, VInt, Vertex};

pub mod bitset;

pub use bitset::BitSetGraph;

/// Undirected graph contract.
///
/// Adjacency is symmetric: after `add_edge(u, v)` the vertex `v` is a neighbor
/// of `u` and `u` is a neighbor of `v`. Queries on a vertex that was never
/// inserted fail with [`crate::Error::VertexNotFound`].
///
/// The diffusion based detection is provided on top of the adjacency queries,
/// so any adjacency strategy implementing them gets it for free.
pub trait Graph {
    /// Lazy, ascending, forward-only sequence of neighbors.
    type Neighbors<'a>: Iterator<Item = Vertex>
    where
        Self: 'a;

    /// All vertices, ascending.
    type Vertices<'a>: Iterator<Item = Vertex>
    where
        Self: 'a;

    fn add_edge(&mut self, source: VInt, target: VInt);

    /// Register a vertex without any incident edge.
    fn add_vertex(&mut self, vertex: VInt);

    fn contains_vertex(&self, vertex: Vertex) -> bool;

    fn degree_of(&self, vertex: Vertex) -> Result<usize>;

    fn neighbors_of(&self, vertex: Vertex) -> Result<Self::Neighbors<'_>>;

    /// Half the sum of all degrees.
    fn num_edges(&self) -> usize;

    fn num_vertices(&self) -> usize;

    /// Compact the adjacency after bulk loading. Never needed for correctness.
    fn optimize(&mut self);

    fn vertices(&self) -> Self::Vertices<'_>;

    /// Aggregate a partition into a weighted meta-graph.
    fn join(&self, partition: &Partition) -> Result<Join<Self>>
    where
        Self: Sized;

    /// Seeds such that every vertex lies within `distance` expansion rounds
    /// of one of them, in discovery order.
    fn select_seeds(&self, distance: usize) -> Result<Vec<Vertex>>;

    fn vertex(&self, index: VInt) -> Vertex {
        Vertex::new(index)
    }

    fn edge(&self, source: VInt, target: VInt) -> Edge {
        Edge::new(Vertex::new(source), Vertex::new(target))
    }

    /// Local community around `seed` with alpha 0.99 and tolerance 0.01.
    fn ppr_community(&self, seed: Vertex) -> Result<Block> {
        community_algo::ppr_nibble(self, seed, &PprParams::default())
    }

    fn ppr_community_with(&self, seed: Vertex, params: &PprParams) -> Result<Block> {
        community_algo::ppr_nibble(self, seed, params)
    }

    /// Run the detection for every seed in parallel.
    fn detect_communities(&self, seeds: &[Vertex], params: &PprParams) -> DetectionReport
    where
        Self: Sync,
    {
        community_algo::detect_communities(self, seeds, params)
    }

    /// Distinct vertices adjacent to the block but outside of it.
    fn cut(&self, block: &Block) -> Result<Block> {
        community_algo::cut(self, block)
    }

    fn conductance(&self, block: &Block) -> Result<f64> {
        community_algo::conductance(self, block)
    }
}
