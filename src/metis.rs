use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::config::READ_BUFFER_SIZE;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::types::VInt;

/// Load a graph file, choosing the reader from its extension, then optimize it.
/// Only METIS `.graph` files are recognised.
pub fn load_graph<G, P>(path: P) -> Result<G>
where
    G: Graph + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("graph") => {
            let mut graph: G = load_metis(path)?;
            graph.optimize();
            Ok(graph)
        }
        _ => Err(Error::invalid(format!(
            "unsupported graph file: {}",
            path.display()
        ))),
    }
}

pub fn load_metis<G, P>(path: P) -> Result<G>
where
    G: Graph + Default,
    P: AsRef<Path>,
{
    let graph_file = File::open(path.as_ref())?;
    let graph: G = read_metis(BufReader::with_capacity(READ_BUFFER_SIZE, graph_file))?;
    info!(
        "Loaded {}: {} vertices, {} edges",
        path.as_ref().display(),
        graph.num_vertices(),
        graph.num_edges()
    );
    Ok(graph)
}

fn parse_fields(line: &str, line_no: usize) -> Result<Vec<usize>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<usize>().map_err(|_| Error::Parse {
                line: line_no,
                message: format!("expected a non-negative integer, found '{}'", token),
            })
        })
        .collect()
}

/// Read an unweighted METIS adjacency file.
///
/// The first non-comment line holds `n m [fmt]`; any format marker other than
/// 0 (weights) is rejected. Each of the next `n` lines lists the 1-based
/// neighbors of vertex 1, 2, ..., an empty line being an isolated vertex.
/// Lines starting with `%` are comments.
pub fn read_metis<G: Graph + Default, R: BufRead>(reader: R) -> Result<G> {
    let mut graph = G::default();
    let mut header: Option<(usize, usize)> = None;
    let mut vertex_count = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.starts_with('%') {
            continue;
        }
        match header {
            None => {
                if line.trim().is_empty() {
                    continue;
                }
                let fields = parse_fields(&line, line_no)?;
                if fields.len() < 2 {
                    return Err(Error::Parse {
                        line: line_no,
                        message: "header needs the vertex and edge counts".to_string(),
                    });
                }
                if let Some(&fmt) = fields.get(2) {
                    if fmt != 0 {
                        return Err(Error::invalid(format!(
                            "found unsupported format in file: {}",
                            fmt
                        )));
                    }
                }
                if fields[0] > VInt::MAX as usize {
                    return Err(Error::Parse {
                        line: line_no,
                        message: format!("{} vertices exceed the index range", fields[0]),
                    });
                }
                header = Some((fields[0], fields[1]));
            }
            Some((n, _)) => {
                if vertex_count == n {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Err(Error::Parse {
                        line: line_no,
                        message: format!("more adjacency lines than the {} declared vertices", n),
                    });
                }
                vertex_count += 1;
                let v = vertex_count as VInt;
                graph.add_vertex(v);
                for u in parse_fields(&line, line_no)? {
                    if u == 0 || u > n {
                        return Err(Error::Parse {
                            line: line_no,
                            message: format!("neighbor {} outside of 1..={}", u, n),
                        });
                    }
                    graph.add_edge(v, u as VInt);
                }
            }
        }
    }

    let (n, m) = header.ok_or_else(|| Error::Parse {
        line: 0,
        message: "missing header".to_string(),
    })?;
    if vertex_count < n {
        warn!(
            "Only {} of {} adjacency lines present, the rest are isolated",
            vertex_count, n
        );
        for v in vertex_count + 1..=n {
            graph.add_vertex(v as VInt);
        }
    }
    if graph.num_edges() != m {
        warn!("Header declares {} edges but {} were read", m, graph.num_edges());
    }
    Ok(graph)
}

#[cfg(test)]
mod test_metis {
    use std::io::{Cursor, Write};

    use crate::error::Error;
    use crate::graph::{BitSetGraph, Graph};
    use crate::metis::{load_graph, read_metis};
    use crate::types::Vertex;

    fn read(content: &str) -> crate::error::Result<BitSetGraph> {
        read_metis(Cursor::new(content))
    }

    #[test]
    fn test_read_with_comments() {
        let g = read("% a comment\n3 2\n% another one\n2\n1 3\n2\n").unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 2);
        assert!(g.neighbors_of(Vertex::new(2)).unwrap().eq([Vertex::new(1), Vertex::new(3)]));
    }

    #[test]
    fn test_isolated_vertices() {
        let g = read("4 1\n2\n1\n\n").unwrap();
        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.degree_of(Vertex::new(3)).unwrap(), 0);
        assert_eq!(g.degree_of(Vertex::new(4)).unwrap(), 0);
        assert_eq!(g.num_edges(), 1);
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(read("2 1 011\n2\n1\n"), Err(Error::InvalidArgument(_))));
        assert!(read("2 1 0\n2\n1\n").is_ok());
    }

    #[test]
    fn test_malformed_content() {
        assert!(matches!(read("2 1\n3\n1\n"), Err(Error::Parse { line: 2, .. })));
        assert!(matches!(read("2 1\nx\n1\n"), Err(Error::Parse { line: 2, .. })));
        assert!(matches!(read("2 1\n2\n1\n1\n"), Err(Error::Parse { line: 4, .. })));
        assert!(matches!(read("% only comments\n"), Err(Error::Parse { .. })));
        assert!(matches!(read("7\n"), Err(Error::Parse { line: 1, .. })));
        assert!(matches!(read("% big\n4294967296 0\n"), Err(Error::Parse { line: 2, .. })));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("triangle.graph");
        let mut file = std::fs::File::create(&graph_path).unwrap();
        write!(file, "3 3\n2 3\n1 3\n1 2\n").unwrap();
        let g: BitSetGraph = load_graph(&graph_path).unwrap();
        assert_eq!(g.num_edges(), 3);

        let other_path = dir.path().join("triangle.txt");
        std::fs::copy(&graph_path, &other_path).unwrap();
        assert!(matches!(load_graph::<BitSetGraph, _>(&other_path), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            load_graph::<BitSetGraph, _>(dir.path().join("missing.graph")),
            Err(Error::Io(_))
        ));
    }
}
