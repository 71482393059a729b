//! Lattice-level constants and cell classification.

/// Number of discrete velocity directions in the D2Q9 scheme.
pub const D2Q9_DIRECTIONS: usize = 9;

/// Size in bytes of one population value on the wire and in frames.
pub const VALUE_BYTES: usize = std::mem::size_of::<f64>();

/// Classification of a lattice cell, fixed at setup time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Ordinary fluid cell: collides and streams.
    #[default]
    Fluid,
    /// Obstacle or wall cell enforcing a reflecting boundary.
    BounceBack,
}

impl CellType {
    /// Whether the cell reflects incoming populations.
    pub fn is_bounce_back(self) -> bool {
        matches!(self, Self::BounceBack)
    }
}
