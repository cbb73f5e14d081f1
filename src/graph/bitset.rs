use std::collections::btree_map::Keys;
use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use rayon::prelude::*;
use roaring::RoaringBitmap;

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::join::Join;
use crate::partition::Partition;
use crate::types::{Edge, Overlap, VInt, Vertex};

/// Adjacency store keeping the neighbor set of every vertex in a compressed
/// bitmap of vertex indices.
#[derive(Debug, Clone, Default)]
pub struct BitSetGraph {
    adjacency: BTreeMap<VInt, RoaringBitmap>,
    optimized: bool, // No insertion since the last compaction.
}

/// Ascending neighbors of one vertex.
pub struct Neighbors<'a> {
    inner: roaring::bitmap::Iter<'a>,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = Vertex;

    #[inline]
    fn next(&mut self) -> Option<Vertex> {
        self.inner.next().map(Vertex::new)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Vertices<'a> {
    inner: Keys<'a, VInt, RoaringBitmap>,
}

impl<'a> Iterator for Vertices<'a> {
    type Item = Vertex;

    fn next(&mut self) -> Option<Vertex> {
        self.inner.next().map(|v| Vertex::new(*v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// One cell (i, j) of the upper triangle computed by the join.
struct JoinCell {
    target: usize,
    overlap: usize,
    crossing: usize,
}

impl BitSetGraph {
    pub fn new() -> Self {
        BitSetGraph::default()
    }

    /// Build a graph from an edge list.
    pub fn from_edges<I: IntoIterator<Item = (VInt, VInt)>>(edges: I) -> Self {
        let mut graph = BitSetGraph::new();
        for (u, v) in edges {
            graph.add_edge(u, v);
        }
        graph
    }

    fn neighbor_set(&self, vertex: Vertex) -> Result<&RoaringBitmap> {
        self.adjacency
            .get(&vertex.index())
            .ok_or(Error::VertexNotFound(vertex.index()))
    }

    /// Row `source` of the join: every block `j >= source` paired with it.
    fn join_row(&self, partition: &Partition, source: usize) -> Result<Vec<JoinCell>> {
        let source_block = &partition[source];
        // Neighbors of the members, kept with multiplicity to count edge endpoints.
        let mut cut = Vec::new();
        for v in source_block.iter() {
            cut.extend(self.neighbors_of(v)?);
        }
        let row = (source..partition.len())
            .map(|target| {
                let target_block = &partition[target];
                let overlap = if target != source {
                    source_block.overlap(target_block)
                } else {
                    0
                };
                let crossing = cut.iter().filter(|u| target_block.contains(**u)).count();
                JoinCell {
                    target,
                    overlap,
                    crossing,
                }
            })
            .collect();
        Ok(row)
    }

    /// Grow the visitor set of `start` for up to `distance` rounds.
    ///
    /// A round walks the members in ascending order and ORs each one's
    /// neighbors into the set. Members inserted above the current position are
    /// walked in the same round, so a round may reach further than one hop.
    fn expand(&self, start: VInt, distance: usize) -> Result<RoaringBitmap> {
        let mut visitor = RoaringBitmap::new();
        visitor.insert(start);
        for _ in 0..distance {
            let before = visitor.len();
            let mut pending = visitor.clone();
            while let Some(v) = pending.min() {
                pending.remove(v);
                for u in self.neighbor_set(Vertex::new(v))? {
                    if visitor.insert(u) && u > v {
                        pending.insert(u);
                    }
                }
            }
            if visitor.len() == before {
                break;
            }
        }
        Ok(visitor)
    }
}

impl Graph for BitSetGraph {
    type Neighbors<'a> = Neighbors<'a>;
    type Vertices<'a> = Vertices<'a>;

    fn add_edge(&mut self, source: VInt, target: VInt) {
        self.adjacency.entry(source).or_default().insert(target);
        self.adjacency.entry(target).or_default().insert(source);
        self.optimized = false;
    }

    fn add_vertex(&mut self, vertex: VInt) {
        self.adjacency.entry(vertex).or_default();
    }

    fn contains_vertex(&self, vertex: Vertex) -> bool {
        self.adjacency.contains_key(&vertex.index())
    }

    fn degree_of(&self, vertex: Vertex) -> Result<usize> {
        Ok(self.neighbor_set(vertex)?.len() as usize)
    }

    fn neighbors_of(&self, vertex: Vertex) -> Result<Neighbors<'_>> {
        Ok(Neighbors {
            inner: self.neighbor_set(vertex)?.iter(),
        })
    }

    fn num_edges(&self) -> usize {
        let degree_sum: u64 = self.adjacency.values().map(RoaringBitmap::len).sum();
        (degree_sum / 2) as usize
    }

    fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    fn optimize(&mut self) {
        if self.optimized {
            return;
        }
        // Repack every set from its ascending iteration.
        self.adjacency.par_iter_mut().for_each(|(_, neighbors)| {
            *neighbors = neighbors.iter().collect();
        });
        self.optimized = true;
        debug!("Optimized {} neighbor sets", self.adjacency.len());
    }

    fn vertices(&self) -> Vertices<'_> {
        Vertices {
            inner: self.adjacency.keys(),
        }
    }

    fn join(&self, partition: &Partition) -> Result<Join<Self>> {
        let rows = (0..partition.len())
            .into_par_iter()
            .map(|i| self.join_row(partition, i))
            .collect::<Result<Vec<_>>>()?;

        let mut joined = BitSetGraph::new();
        let mut vertex_sizes = Vec::with_capacity(partition.len());
        let mut edge_sizes = HashMap::new();
        let mut overlaps = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            joined.add_vertex(i as VInt);
            vertex_sizes.push(partition[i].len());
            for cell in row {
                let j = cell.target;
                if cell.overlap > 0 {
                    overlaps.push(Overlap::new(
                        Vertex::new(i as VInt),
                        Vertex::new(j as VInt),
                        cell.overlap,
                    ));
                }
                if cell.crossing > 0 {
                    joined.add_edge(i as VInt, j as VInt);
                    // Internal edges were seen from both endpoints.
                    let weight = if i == j { cell.crossing / 2 } else { cell.crossing };
                    edge_sizes.insert(Edge::new(Vertex::new(i as VInt), Vertex::new(j as VInt)), weight);
                }
            }
        }
        joined.optimize();
        debug!(
            "Joined {} blocks into {} meta-edges, {} overlaps",
            partition.len(),
            edge_sizes.len(),
            overlaps.len()
        );
        Ok(Join::new(joined, vertex_sizes, edge_sizes, overlaps))
    }

    fn select_seeds(&self, distance: usize) -> Result<Vec<Vertex>> {
        if distance < 1 {
            return Err(Error::invalid(format!(
                "seed distance must be at least 1, got {}",
                distance
            )));
        }
        let mut seeds = Vec::new();
        let mut visited = RoaringBitmap::new();
        let total = self.adjacency.len() as u64;
        // Visited only grows, so the scan for the lowest unvisited index never restarts.
        let mut candidates = self.adjacency.keys();
        while visited.len() < total {
            let start = match candidates.find(|v| !visited.contains(**v)) {
                Some(v) => *v,
                None => break,
            };
            seeds.push(Vertex::new(start));
            visited |= self.expand(start, distance)?;
        }
        info!("Selected {} seeds at distance {}", seeds.len(), distance);
        Ok(seeds)
    }
}

#[cfg(test)]
mod test_bitset_graph {
    use std::collections::{BTreeSet, HashMap, VecDeque};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::error::Error;
    use crate::graph::{BitSetGraph, Graph};
    use crate::metis::load_graph;
    use crate::partition::{Block, Partition};
    use crate::types::{VInt, Vertex};

    fn tiny_graph() -> BitSetGraph {
        load_graph(concat!(env!("CARGO_MANIFEST_DIR"), "/data/tiny_01.graph")).unwrap()
    }

    fn block_of(ids: &[VInt]) -> Block {
        ids.iter().map(|&i| Vertex::new(i)).collect()
    }

    fn random_graph(seed: u64, vertices: VInt, edges: usize) -> BitSetGraph {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut g = BitSetGraph::new();
        for v in 0..vertices {
            g.add_vertex(v);
        }
        for _ in 0..edges {
            g.add_edge(rng.gen_range(0..vertices), rng.gen_range(0..vertices));
        }
        g
    }

    #[test]
    fn test_vertex_degree() {
        let mut g = BitSetGraph::new();
        assert_eq!(g.vertex(1), g.vertex(1));
        g.add_edge(1, 2);
        g.add_edge(2, 1);
        assert_eq!(g.vertex(1).degree(&g).unwrap(), 1);
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.num_vertices(), 2);
    }

    #[test]
    fn test_add_edge_symmetry() {
        let mut g = BitSetGraph::new();
        g.add_edge(3, 8);
        g.add_edge(3, 1);
        assert!(g.neighbors_of(Vertex::new(3)).unwrap().eq([Vertex::new(1), Vertex::new(8)]));
        assert!(g.neighbors_of(Vertex::new(8)).unwrap().eq([Vertex::new(3)]));
        assert!(g.neighbors_of(Vertex::new(1)).unwrap().eq([Vertex::new(3)]));
        assert_eq!(g.degree_of(Vertex::new(3)).unwrap(), 2);
        assert_eq!(
            g.vertices().collect::<Vec<_>>(),
            vec![Vertex::new(1), Vertex::new(3), Vertex::new(8)]
        );
    }

    #[test]
    fn test_self_loop() {
        let mut g = BitSetGraph::new();
        g.add_edge(4, 4);
        assert_eq!(g.degree_of(Vertex::new(4)).unwrap(), 1);
        assert!(g.neighbors_of(Vertex::new(4)).unwrap().eq([Vertex::new(4)]));
        g.add_edge(4, 5);
        assert_eq!(g.degree_of(Vertex::new(4)).unwrap(), 2);
    }

    #[test]
    fn test_random_symmetry_and_edge_count() {
        let g = random_graph(17, 50, 200);
        let mut degree_sum = 0;
        for v in g.vertices() {
            let degree = g.degree_of(v).unwrap();
            degree_sum += degree;
            assert_eq!(g.neighbors_of(v).unwrap().count(), degree);
            for u in g.neighbors_of(v).unwrap() {
                assert!(g.neighbors_of(u).unwrap().any(|w| w == v));
            }
        }
        assert_eq!(g.num_edges(), degree_sum / 2);
    }

    #[test]
    fn test_lookup_failure() {
        let g = BitSetGraph::from_edges(vec![(1, 2)]);
        assert!(matches!(g.degree_of(Vertex::new(9)), Err(Error::VertexNotFound(9))));
        assert!(matches!(g.neighbors_of(Vertex::new(9)), Err(Error::VertexNotFound(9))));
        assert!(!g.contains_vertex(Vertex::new(9)));
        assert!(g.contains_vertex(Vertex::new(2)));
    }

    #[test]
    fn test_optimize_keeps_adjacency() {
        let mut g = random_graph(3, 30, 80);
        let before: Vec<Vec<Vertex>> = g.vertices().map(|v| g.neighbors_of(v).unwrap().collect()).collect();
        g.optimize();
        g.optimize();
        let after: Vec<Vec<Vertex>> = g.vertices().map(|v| g.neighbors_of(v).unwrap().collect()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_read_tiny() {
        let g = tiny_graph();
        assert_eq!(g.num_vertices(), 7);
        assert_eq!(g.num_edges(), 11);
        let neighbors: Vec<Vertex> = g.vertex(1).neighbors(&g).unwrap().collect();
        for v in [5, 3, 2] {
            assert!(neighbors.contains(&g.vertex(v)));
        }
    }

    #[test]
    fn test_join_shared_vertex() {
        let mut g = BitSetGraph::new();
        g.add_edge(1, 2);
        g.add_edge(1, 3);
        let p: Partition = vec![block_of(&[1, 2]), block_of(&[1, 3])].into_iter().collect();
        let j = g.join(&p).unwrap();
        let jg = j.graph();
        assert_eq!(jg.num_vertices(), 2);
        assert_eq!(jg.num_edges(), 2);
        assert_eq!(j.vertex_size(jg.vertex(0)), Some(2));
        assert_eq!(j.vertex_size(jg.vertex(1)), Some(2));
        assert_eq!(j.overlaps().len(), 1);
        assert_eq!(j.overlaps()[0].overlap(), 1);
        assert_eq!(j.edge_size(jg.edge(0, 0)), 1);
        assert_eq!(j.edge_size(jg.edge(1, 1)), 1);
        assert_eq!(j.edge_size(jg.edge(0, 1)), 2);
    }

    #[test]
    fn test_join_disjoint_blocks() {
        // Two triangles bridged by two edges.
        let g = BitSetGraph::from_edges(vec![(1, 2), (2, 3), (1, 3), (4, 5), (5, 6), (4, 6), (3, 4), (3, 5)]);
        let p: Partition = vec![block_of(&[1, 2, 3]), block_of(&[4, 5, 6])].into_iter().collect();
        let j = g.join(&p).unwrap();
        let size_sum: usize = (0..2).map(|i| j.vertex_size(Vertex::new(i)).unwrap()).sum();
        assert_eq!(size_sum, 6);
        assert_eq!(j.edge_size(g.edge(0, 1)), 2);
        assert_eq!(j.edge_size(g.edge(1, 0)), 2);
        assert_eq!(j.edge_size(g.edge(0, 0)), 3);
        assert_eq!(j.edge_size(g.edge(1, 1)), 3);
        assert!(j.overlaps().is_empty());
        assert_eq!(j.graph().num_edges(), 2);
    }

    #[test]
    fn test_join_isolated_blocks() {
        let mut g = BitSetGraph::from_edges(vec![(1, 2)]);
        g.add_vertex(9);
        let p: Partition = vec![block_of(&[1]), block_of(&[2]), block_of(&[9])].into_iter().collect();
        let j = g.join(&p).unwrap();
        assert_eq!(j.graph().num_vertices(), 3);
        assert_eq!(j.graph().num_edges(), 1);
        assert_eq!(j.edge_size(g.edge(0, 1)), 1);
        assert_eq!(j.edge_size(g.edge(0, 0)), 0);
        assert_eq!(j.vertex_size(Vertex::new(2)), Some(1));
        assert_eq!(j.vertex_size(Vertex::new(3)), None);
    }

    #[test]
    fn test_join_unknown_vertex() {
        let g = BitSetGraph::from_edges(vec![(1, 2)]);
        let p: Partition = vec![block_of(&[1, 42])].into_iter().collect();
        assert!(matches!(g.join(&p), Err(Error::VertexNotFound(42))));
    }

    #[test]
    fn test_select_seeds() {
        let g = tiny_graph();
        for distance in 1..=3 {
            assert_eq!(g.select_seeds(distance).unwrap(), vec![g.vertex(1)]);
        }
    }

    #[test]
    fn test_select_seeds_grows_within_round() {
        // Members added above the current position are expanded in the same round.
        let path = BitSetGraph::from_edges(vec![(1, 2), (2, 3), (3, 4), (4, 5)]);
        assert_eq!(path.select_seeds(1).unwrap(), vec![path.vertex(1)]);

        // Members added below it wait for the next round.
        let chain = BitSetGraph::from_edges(vec![(1, 4), (4, 3), (3, 2)]);
        assert_eq!(chain.select_seeds(1).unwrap(), vec![chain.vertex(1), chain.vertex(2)]);
        assert_eq!(chain.select_seeds(2).unwrap(), vec![chain.vertex(1)]);
    }

    #[test]
    fn test_select_seeds_invalid_distance() {
        let g = tiny_graph();
        assert!(matches!(g.select_seeds(0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_select_seeds_empty_graph() {
        assert!(BitSetGraph::new().select_seeds(1).unwrap().is_empty());
    }

    // Hop distance from `source` to every vertex it reaches.
    fn hops_from(g: &BitSetGraph, source: Vertex) -> HashMap<Vertex, usize> {
        let mut hops = HashMap::from([(source, 0)]);
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            let next = hops[&v] + 1;
            for u in g.neighbors_of(v).unwrap() {
                hops.entry(u).or_insert_with(|| {
                    queue.push_back(u);
                    next
                });
            }
        }
        hops
    }

    #[test]
    fn test_select_seeds_coverage() {
        let g = random_graph(11, 80, 70);
        for distance in 1..=3 {
            let seeds = g.select_seeds(distance).unwrap();
            assert!(!seeds.is_empty());
            let mut reachable = BTreeSet::new();
            for (i, seed) in seeds.iter().enumerate() {
                let hops = hops_from(&g, *seed);
                // A later seed was left unvisited by every expansion before it.
                for later in &seeds[i + 1..] {
                    assert!(hops.get(later).map_or(true, |&h| h > distance));
                }
                reachable.extend(hops.into_keys());
            }
            assert_eq!(reachable.len(), g.num_vertices());
        }
    }
}
