//! Run configuration, validation, and error types.
//!
//! [`ClusterConfig`] is the topology input every worker starts from.
//! Parsing it out of files or command lines is left to the embedding
//! application; [`validate()`](ClusterConfig::validate) checks that the
//! values describe a decomposition that can actually run.

use std::error::Error;
use std::fmt;

use strata_core::{PlanError, Rank, D2Q9_DIRECTIONS};
use strata_mesh::MeshError;

use crate::partition::{plan, GlobalDomain};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`ClusterConfig`] or building a
/// worker from it.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The topology cannot be decomposed.
    Plan(PlanError),
    /// Worker storage could not be allocated with these dimensions.
    Mesh(MeshError),
    /// Cells need at least one population.
    NoDirections,
    /// The transport connects a different number of workers than configured.
    TransportMismatch {
        /// Workers in the configuration.
        configured: usize,
        /// Workers reachable through the transport.
        transport: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(e) => write!(f, "partition: {e}"),
            Self::Mesh(e) => write!(f, "mesh: {e}"),
            Self::NoDirections => write!(f, "directions must be at least 1"),
            Self::TransportMismatch {
                configured,
                transport,
            } => write!(
                f,
                "configured for {configured} workers but transport connects {transport}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Plan(e) => Some(e),
            Self::Mesh(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlanError> for ConfigError {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

impl From<MeshError> for ConfigError {
    fn from(e: MeshError) -> Self {
        Self::Mesh(e)
    }
}

// ── ClusterConfig ──────────────────────────────────────────────────

/// Topology and lattice shape for a decomposed run.
///
/// # Examples
///
/// ```
/// use strata_comm::config::ClusterConfig;
///
/// let config = ClusterConfig::new(800, 160).with_workers(4);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.directions, 9);
///
/// let oversubscribed = ClusterConfig::new(8, 2).with_workers(3);
/// assert!(oversubscribed.validate().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Global grid width in cells.
    pub width: usize,
    /// Global grid height in cells.
    pub height: usize,
    /// Number of workers. Default: 1.
    pub worker_count: usize,
    /// Populations per cell. Default: 9 (D2Q9).
    pub directions: usize,
}

impl ClusterConfig {
    /// Single-worker D2Q9 configuration for a `width x height` grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            worker_count: 1,
            directions: D2Q9_DIRECTIONS,
        }
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the populations per cell.
    pub fn with_directions(mut self, directions: usize) -> Self {
        self.directions = directions;
        self
    }

    /// The global grid.
    pub fn domain(&self) -> GlobalDomain {
        GlobalDomain::new(self.width, self.height)
    }

    /// Check that every rank can be planned and allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directions == 0 {
            return Err(ConfigError::NoDirections);
        }
        // Rank 0 is always in range when worker_count >= 1, so planning it
        // checks the worker count against the height and the width.
        plan(Rank(0), self.worker_count, self.width, self.height)?;
        Ok(())
    }
}
