use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::info;
use serde::Serialize;

use ppr_community::config::DetectConfig;
use ppr_community::logger::init_logger;
use ppr_community::metis::load_graph;
use ppr_community::{BitSetGraph, Graph, Join, Vertex};

/// Personalized PageRank community detection.
#[derive(Parser, Debug)]
#[command(name = "pprcd", version, about)]
struct Args {
    /// METIS graph file.
    file: PathBuf,

    /// Comma separated seed vertices, selected by distance when omitted.
    #[arg(short, long, value_delimiter = ',')]
    seeds: Vec<u32>,

    /// Teleportation complement, in (0, 1).
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Degree scaled residual tolerance.
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Expansion rounds of the seed selection.
    #[arg(short, long)]
    distance: Option<usize>,

    /// Per seed time limit in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Worker threads, all cores by default.
    #[arg(long)]
    threads: Option<usize>,

    /// YAML file with defaults for the options above.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write block size, block matrix and overlap files next to FILE.
    #[arg(long)]
    stats: bool,

    /// Log into this directory instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct OverlapRecord {
    source: u32,
    target: u32,
    overlap: usize,
}

fn resolve_config(args: &Args) -> Result<DetectConfig> {
    let mut config = match &args.config {
        Some(path) => DetectConfig::from_yaml_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DetectConfig::default(),
    };
    // Flags take precedence over the file.
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(distance) = args.distance {
        config.distance = distance;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.timeout_ms.is_some() {
        config.timeout_ms = args.timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

fn with_suffix(file: &Path, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_stats(file: &Path, join: &Join<BitSetGraph>) -> Result<()> {
    let size_path = with_suffix(file, "-block-size.csv");
    let mut size_writer = BufWriter::new(File::create(&size_path)?);
    writeln!(size_writer, "{}", join.vertex_sizes().iter().join(","))?;
    size_writer.flush()?;

    let matrix_path = with_suffix(file, "-block-matrix.csv");
    let mut matrix_writer = BufWriter::new(File::create(&matrix_path)?);
    for row in join.edge_size_matrix() {
        writeln!(matrix_writer, "{}", row.iter().join(","))?;
    }
    matrix_writer.flush()?;

    let overlap_path = with_suffix(file, "-block-overlap.json");
    let records: Vec<OverlapRecord> = join
        .overlaps()
        .iter()
        .map(|o| OverlapRecord {
            source: o.source().index(),
            target: o.target().index(),
            overlap: o.overlap(),
        })
        .collect();
    let mut overlap_writer = BufWriter::new(File::create(&overlap_path)?);
    serde_json::to_writer_pretty(&mut overlap_writer, &records)?;
    overlap_writer.flush()?;

    info!(
        "Wrote {}, {} and {}",
        size_path.display(),
        matrix_path.display(),
        overlap_path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("initializing logger: {}", e))?;
    let config = resolve_config(&args)?;
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("building the worker pool")?;
    }

    let graph: BitSetGraph = load_graph(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let seeds: Vec<Vertex> = if args.seeds.is_empty() {
        graph.select_seeds(config.distance)?
    } else {
        args.seeds.iter().map(|&s| graph.vertex(s)).collect()
    };

    let started = Instant::now();
    let report = graph.detect_communities(&seeds, &config.ppr_params()?);
    info!(
        "Detected {} communities from {} seeds in {:?}",
        report.partition().len(),
        seeds.len(),
        started.elapsed()
    );
    for (seed, e) in report.failures() {
        eprintln!("seed {}: {}", seed.index(), e);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for block in report.partition().iter() {
        writeln!(out, "{}", block.iter().map(|v| v.index()).join(" "))?;
    }

    if args.stats {
        let join = graph.join(report.partition())?;
        write_stats(&args.file, &join)?;
    }
    Ok(())
}
