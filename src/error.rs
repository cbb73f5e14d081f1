use std::time::Duration;

use thiserror::Error;

use crate::types::VInt;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a graph or running detection on it.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter or input marker outside of its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The vertex is not present in the adjacency store.
    #[error("Vertex {0} not found")]
    VertexNotFound(VInt),

    /// Malformed graph file content.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the source file.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A single seed's diffusion ran past its time limit.
    #[error("Detection from seed {seed} timed out after {limit:?}")]
    Timeout {
        /// Seed vertex index.
        seed: VInt,
        /// Configured limit.
        limit: Duration,
    },

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument(message.into())
    }
}
