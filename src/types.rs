use std::fmt;
use std::fmt::{Display, Formatter};

use crate::error::Result;
use crate::graph::Graph;

/// Raw vertex index, unique within one graph.
pub type VInt = u32;

// Define the Vertex handle (4 Bytes), an index into the adjacency of some graph.
// The graph owning the adjacency is passed alongside when degree or neighbors are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vertex(VInt);

impl Vertex {
    pub const fn new(index: VInt) -> Self {
        Vertex(index)
    }

    #[inline]
    pub const fn index(&self) -> VInt {
        self.0
    }

    /// Degree of this vertex in `graph`.
    pub fn degree<G: Graph + ?Sized>(&self, graph: &G) -> Result<usize> {
        graph.degree_of(*self)
    }

    /// Neighbors of this vertex in `graph`, ascending.
    pub fn neighbors<'g, G: Graph + ?Sized>(&self, graph: &'g G) -> Result<G::Neighbors<'g>> {
        graph.neighbors_of(*self)
    }
}

impl From<VInt> for Vertex {
    fn from(index: VInt) -> Self {
        Vertex(index)
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

// Undirected edge, the endpoint with the smaller index is always the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    source: Vertex,
    target: Vertex,
}

impl Edge {
    pub fn new(u: Vertex, v: Vertex) -> Self {
        if u <= v {
            Edge { source: u, target: v }
        } else {
            Edge { source: v, target: u }
        }
    }

    pub fn source(&self) -> Vertex {
        self.source
    }

    pub fn target(&self) -> Vertex {
        self.target
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({} - {})", self.source, self.target)
    }
}

/// Number of vertices shared by two blocks of a partition, keyed by the
/// meta-edge joining their meta-vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Overlap {
    edge: Edge,
    overlap: usize,
}

impl Overlap {
    pub(crate) fn new(source: Vertex, target: Vertex, overlap: usize) -> Self {
        Overlap {
            edge: Edge::new(source, target),
            overlap,
        }
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn source(&self) -> Vertex {
        self.edge.source()
    }

    pub fn target(&self) -> Vertex {
        self.edge.target()
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}
