//! Strongly-typed identifiers for workers and message streams.

use std::fmt;

/// Identifies a worker within a decomposed run.
///
/// Ranks are dense: a run with `n` workers uses `Rank(0)..Rank(n-1)`,
/// and rank order is global top-to-bottom row order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub usize);

impl Rank {
    /// The coordinator rank that collects output frames.
    pub const COORDINATOR: Rank = Rank(0);

    /// Whether this rank is the coordinator.
    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }

    /// Index form, for addressing per-rank tables.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Rank {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Labels a message stream between two workers.
///
/// Every message carries a tag, and a receive names the tag it expects.
/// Halo rows and gathered meshes travel under different tags so that a
/// worker drifting into the wrong protocol phase is caught as a
/// [`CommError::TagMismatch`](crate::CommError::TagMismatch) instead of
/// silently consuming the wrong payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u32);

impl Tag {
    /// Ghost-row traffic between strip neighbours.
    pub const HALO: Tag = Tag(0);
    /// Whole-mesh traffic towards the coordinator during a gather.
    pub const GATHER: Tag = Tag(1);
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Tag {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
