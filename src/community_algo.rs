use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{DEFAULT_ALPHA, DEFAULT_TOLERANCE};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::partition::{Block, Partition};
use crate::types::{VInt, Vertex};

// Pops between two deadline checks.
const TIMEOUT_CHECK_INTERVAL: usize = 256;

/// Parameters of a single PageRank-nibble run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PprParams {
    alpha: f64,
    tolerance: f64,
    timeout: Option<Duration>,
}

impl Default for PprParams {
    fn default() -> Self {
        PprParams {
            alpha: DEFAULT_ALPHA,
            tolerance: DEFAULT_TOLERANCE,
            timeout: None,
        }
    }
}

impl PprParams {
    /// `alpha` must lie in (0, 1) and `tolerance` must be positive.
    pub fn new(alpha: f64, tolerance: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::invalid(format!("alpha must be in (0, 1), got {}", alpha)));
        }
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(Error::invalid(format!("tolerance must be positive, got {}", tolerance)));
        }
        Ok(PprParams {
            alpha,
            tolerance,
            timeout: None,
        })
    }

    /// Abort a single seed's run once it has been pushing for `limit`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Approximate personalized PageRank from `seed`, normalized by degree and
/// sorted by decreasing score (ties by index).
///
/// Push scheme of the lazy walk: a popped vertex settles `1 - alpha` of its
/// residual, keeps half of the rest and spreads the other half evenly over its
/// neighbors. A vertex is queued again whenever its residual crosses
/// `degree * tolerance`.
pub fn ppr_scores<G: Graph + ?Sized>(graph: &G, seed: Vertex, params: &PprParams) -> Result<Vec<(Vertex, f64)>> {
    let alpha = params.alpha;
    let tolerance = params.tolerance;
    let started = Instant::now();

    let mut x: HashMap<VInt, f64> = HashMap::new(); // Settled score.
    let mut r: HashMap<VInt, f64> = HashMap::new(); // Residual mass.
    r.insert(seed.index(), 1.0);
    let mut queue = VecDeque::from([seed]);
    let mut pops = 0usize;

    while let Some(v) = queue.pop_front() {
        if let Some(limit) = params.timeout {
            if pops % TIMEOUT_CHECK_INTERVAL == 0 && started.elapsed() >= limit {
                return Err(Error::Timeout {
                    seed: seed.index(),
                    limit,
                });
            }
        }
        pops += 1;

        let degree = graph.degree_of(v)? as f64;
        let rv = r.get(&v.index()).copied().unwrap_or(0.0);
        *x.entry(v.index()).or_insert(0.0) += (1.0 - alpha) * rv;
        let mass = alpha * rv / (2.0 * degree);
        for u in graph.neighbors_of(v)? {
            let threshold = graph.degree_of(u)? as f64 * tolerance;
            let ru = r.entry(u.index()).or_insert(0.0);
            if *ru < threshold && *ru + mass >= threshold {
                queue.push_back(u);
            }
            *ru += mass;
        }
        let retained = mass * degree;
        r.insert(v.index(), retained);
        if retained >= degree * tolerance {
            queue.push_back(v);
        }
    }

    let mut scores = Vec::with_capacity(x.len());
    for (v, score) in x {
        if score > 0.0 {
            let vertex = Vertex::new(v);
            scores.push((vertex, score / graph.degree_of(vertex)? as f64));
        }
    }
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    debug!(
        "Diffusion from {} settled {} vertices in {} pops",
        seed,
        scores.len(),
        pops
    );
    Ok(scores)
}

/// Conductance of every prefix of an ordering, with the best prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    conductances: Vec<f64>,
    best_len: usize,
}

impl Sweep {
    /// Conductance after each insertion, one entry per prefix length.
    pub fn conductances(&self) -> &[f64] {
        &self.conductances
    }

    /// Length of the first prefix reaching the minimum conductance.
    pub fn best_len(&self) -> usize {
        self.best_len
    }

    pub fn best_conductance(&self) -> Option<f64> {
        self.best_len.checked_sub(1).map(|i| self.conductances[i])
    }
}

/// Grow a set along `ordered`, keeping the volume and the number of cut edges
/// up to date, and score each prefix with `cut / (2 * volume + cut)`.
pub fn sweep<G: Graph + ?Sized>(graph: &G, ordered: &[Vertex]) -> Result<Sweep> {
    let mut members = Block::new();
    let mut volume = 0usize;
    let mut cut = 0i64;
    let mut conductances = Vec::with_capacity(ordered.len());
    let mut best_len = 0;
    let mut best = f64::INFINITY;

    for (i, &v) in ordered.iter().enumerate() {
        volume += graph.degree_of(v)?;
        for u in graph.neighbors_of(v)? {
            cut += if members.contains(u) { -1 } else { 1 };
        }
        members.insert(v);
        let denominator = 2.0 * volume as f64 + cut as f64;
        let conductance = if denominator > 0.0 {
            cut as f64 / denominator
        } else {
            0.0
        };
        conductances.push(conductance);
        if conductance < best {
            best = conductance;
            best_len = i + 1;
        }
    }
    Ok(Sweep {
        conductances,
        best_len,
    })
}

/// PageRank-nibble community of `seed`: the prefix of the score ordering with
/// minimum conductance. Always contains the top-ranked vertex.
pub fn ppr_nibble<G: Graph + ?Sized>(graph: &G, seed: Vertex, params: &PprParams) -> Result<Block> {
    if graph.degree_of(seed)? == 0 {
        return Ok(Block::singleton(seed));
    }
    let ordered: Vec<Vertex> = ppr_scores(graph, seed, params)?
        .into_iter()
        .map(|(v, _)| v)
        .collect();
    let profile = sweep(graph, &ordered)?;
    let community: Block = ordered[..profile.best_len.max(1)].iter().copied().collect();
    debug!(
        "Community of {}: {} vertices, conductance {:.4}",
        seed,
        community.len(),
        profile.best_conductance().unwrap_or(0.0)
    );
    Ok(community)
}

/// Outcome of a batch detection. The i-th block of `partition` was grown from
/// the i-th entry of `seeds`; failed seeds are reported apart.
#[derive(Debug, Default)]
pub struct DetectionReport {
    partition: Partition,
    seeds: Vec<Vertex>,
    failures: Vec<(Vertex, Error)>,
}

impl DetectionReport {
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Seeds of the blocks, in partition order.
    pub fn seeds(&self) -> &[Vertex] {
        &self.seeds
    }

    /// Seeds whose detection failed, with the reason.
    pub fn failures(&self) -> &[(Vertex, Error)] {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_partition(self) -> Partition {
        self.partition
    }
}

/// Run the nibble for each seed on the rayon pool. Seeds are independent: one
/// failing seed does not affect the others.
pub fn detect_communities<G: Graph + Sync + ?Sized>(
    graph: &G,
    seeds: &[Vertex],
    params: &PprParams,
) -> DetectionReport {
    let outcomes: Vec<(Vertex, Result<Block>)> = seeds
        .par_iter()
        .map(|&seed| (seed, ppr_nibble(graph, seed, params)))
        .collect();

    let mut report = DetectionReport::default();
    for (seed, outcome) in outcomes {
        match outcome {
            Ok(block) => {
                report.seeds.push(seed);
                report.partition.push(block);
            }
            Err(e) => {
                warn!("Detection from seed {} failed: {}", seed, e);
                report.failures.push((seed, e));
            }
        }
    }
    report
}

/// Distinct neighbors of the block's members lying outside the block.
pub fn cut<G: Graph + ?Sized>(graph: &G, block: &Block) -> Result<Block> {
    let mut outside = Block::new();
    for v in block.iter() {
        outside.extend(graph.neighbors_of(v)?.filter(|u| !block.contains(*u)));
    }
    Ok(outside)
}

/// `cut / (2 * volume + cut)` where cut counts distinct outside neighbors and
/// volume sums the member degrees.
pub fn conductance<G: Graph + ?Sized>(graph: &G, block: &Block) -> Result<f64> {
    let cut = cut(graph, block)?.len() as f64;
    let mut volume = 0usize;
    for v in block.iter() {
        volume += graph.degree_of(v)?;
    }
    let denominator = 2.0 * volume as f64 + cut;
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(cut / denominator)
}
