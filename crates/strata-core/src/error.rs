//! Error types for the Strata decomposition and exchange layer.
//!
//! Organized by the phase that raises them: planning (startup),
//! communication and physics (every step), and gathering (every output
//! frame). All are fatal to a run; none is retried.

use std::error::Error;
use std::fmt;
use std::io;

use crate::id::{Rank, Tag};

/// Errors from partition planning.
///
/// Raised once at startup; the whole run aborts when any worker
/// cannot obtain a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// More workers than global rows: some strip would be empty.
    NoValidDecomposition {
        /// Requested number of workers.
        worker_count: usize,
        /// Global grid height in rows.
        height: usize,
    },
    /// A run needs at least one worker.
    NoWorkers,
    /// The requesting rank is not part of the run.
    RankOutOfRange {
        /// The offending rank.
        rank: Rank,
        /// Number of workers in the run.
        worker_count: usize,
    },
    /// The global domain has a zero dimension.
    EmptyDomain {
        /// Global width in columns.
        width: usize,
        /// Global height in rows.
        height: usize,
    },
    /// The padded local extent does not fit in `usize`.
    DomainTooLarge {
        /// Global width in columns.
        width: usize,
        /// Global height in rows.
        height: usize,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidDecomposition {
                worker_count,
                height,
            } => write!(
                f,
                "no valid decomposition: {worker_count} workers for {height} rows"
            ),
            Self::NoWorkers => write!(f, "worker count must be at least 1"),
            Self::RankOutOfRange { rank, worker_count } => {
                write!(f, "rank {rank} out of range for {worker_count} workers")
            }
            Self::EmptyDomain { width, height } => {
                write!(f, "global domain {width}x{height} has no cells")
            }
            Self::DomainTooLarge { width, height } => {
                write!(f, "global domain {width}x{height} overflows the padded extent")
            }
        }
    }
}

impl Error for PlanError {}

/// Errors from point-to-point transfers between workers.
///
/// Any of these means the step's ghost data (or a gathered frame) cannot
/// be trusted. The protocol has no recovery path: callers propagate the
/// error and abandon the run, which in turn disconnects the failing
/// worker from its peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A received payload does not have the agreed number of values.
    SizeMismatch {
        /// The sending worker.
        peer: Rank,
        /// Values the receiver expected.
        expected: usize,
        /// Values actually delivered.
        received: usize,
    },
    /// A received message belongs to a different protocol phase.
    TagMismatch {
        /// The sending worker.
        peer: Rank,
        /// Tag the receiver expected.
        expected: Tag,
        /// Tag actually delivered.
        received: Tag,
    },
    /// The mesh handed to an exchange does not match the descriptor extent.
    MeshShapeMismatch {
        /// Extent `(width, height)` from the descriptor.
        expected: (usize, usize),
        /// Extent `(width, height)` of the mesh.
        found: (usize, usize),
    },
    /// Two meshes taking part in one transfer disagree on populations per cell.
    DirectionMismatch {
        /// Directions of the worker's own mesh.
        expected: usize,
        /// Directions of the mesh that would receive or ship the data.
        found: usize,
    },
    /// The named peer is not part of the run.
    UnknownPeer {
        /// The offending rank.
        peer: Rank,
        /// Number of workers in the run.
        worker_count: usize,
    },
    /// The peer has left the run; its end of the link is closed.
    PeerDisconnected {
        /// The vanished worker.
        peer: Rank,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch {
                peer,
                expected,
                received,
            } => write!(
                f,
                "size mismatch from rank {peer}: expected {expected} values, received {received}"
            ),
            Self::TagMismatch {
                peer,
                expected,
                received,
            } => write!(
                f,
                "tag mismatch from rank {peer}: expected tag {expected}, received tag {received}"
            ),
            Self::MeshShapeMismatch { expected, found } => write!(
                f,
                "mesh shape {}x{} does not match descriptor extent {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Self::DirectionMismatch { expected, found } => write!(
                f,
                "mesh has {found} directions per cell, expected {expected}"
            ),
            Self::UnknownPeer { peer, worker_count } => {
                write!(f, "rank {peer} is not one of {worker_count} workers")
            }
            Self::PeerDisconnected { peer } => write!(f, "rank {peer} disconnected"),
        }
    }
}

impl Error for CommError {}

/// Errors reported by the physics update between exchanges.
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicsError {
    /// The update could not complete.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A population became NaN or infinite.
    NonFinite {
        /// Local row of the offending cell.
        row: usize,
        /// Local column of the offending cell.
        col: usize,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::NonFinite { row, col } => {
                write!(f, "non-finite population at cell ({row}, {col})")
            }
        }
    }
}

impl Error for PhysicsError {}

impl From<String> for PhysicsError {
    fn from(reason: String) -> Self {
        Self::ExecutionFailed { reason }
    }
}

impl From<&str> for PhysicsError {
    fn from(reason: &str) -> Self {
        Self::ExecutionFailed {
            reason: reason.to_owned(),
        }
    }
}

/// Errors from collecting an output frame on the coordinator.
#[derive(Debug)]
pub enum GatherError {
    /// A worker's mesh could not be transferred.
    Comm(CommError),
    /// The output sink rejected a write.
    Io(io::Error),
}

impl fmt::Display for GatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "gather transfer failed: {e}"),
            Self::Io(e) => write!(f, "frame write failed: {e}"),
        }
    }
}

impl Error for GatherError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<CommError> for GatherError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<io::Error> for GatherError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
