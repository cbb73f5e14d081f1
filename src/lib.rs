//! Local community discovery with PageRank-nibble over a compressed-bitmap
//! adjacency store, and aggregation of the discovered communities into a
//! weighted meta-graph.

pub mod community_algo;
pub mod config;
pub mod error;
pub mod graph;
pub mod join;
pub mod logger;
pub mod metis;
pub mod partition;
pub mod types;

pub use community_algo::{DetectionReport, PprParams};
pub use error::{Error, Result};
pub use graph::{BitSetGraph, Graph};
pub use join::Join;
pub use partition::{Block, Partition};
pub use types::{Edge, Overlap, VInt, Vertex};
