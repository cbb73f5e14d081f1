use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::community_algo::PprParams;
use crate::error::{Error, Result};

pub const DEFAULT_ALPHA: f64 = 0.99;

pub const DEFAULT_TOLERANCE: f64 = 0.01;

pub const DEFAULT_DISTANCE: usize = 2;

pub(crate) const READ_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Run configuration of a detection, usually read from a YAML file.
/// Missing keys fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub alpha: f64,
    pub tolerance: f64,
    pub distance: usize, // Expansion rounds of the seed selection.
    pub threads: Option<usize>, // Size of the rayon pool, all cores if unset.
    pub timeout_ms: Option<u64>, // Per seed.
}

impl Default for DetectConfig {
    fn default() -> Self {
        DetectConfig {
            alpha: DEFAULT_ALPHA,
            tolerance: DEFAULT_TOLERANCE,
            distance: DEFAULT_DISTANCE,
            threads: None,
            timeout_ms: None,
        }
    }
}

impl DetectConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn ppr_params(&self) -> Result<PprParams> {
        let params = PprParams::new(self.alpha, self.tolerance)?;
        Ok(match self.timeout_ms {
            Some(ms) => params.with_timeout(Duration::from_millis(ms)),
            None => params,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.ppr_params()?;
        if self.distance < 1 {
            return Err(Error::invalid("distance must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(Error::invalid("threads must be at least 1"));
        }
        Ok(())
    }
}
