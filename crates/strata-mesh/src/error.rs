//! Error types for mesh construction and addressing.

use std::fmt;

/// Errors arising from mesh or cell-type grid construction and lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// Attempted to build a grid with a zero dimension.
    EmptyMesh {
        /// Requested width in cells.
        width: usize,
        /// Requested height in cells.
        height: usize,
        /// Requested populations per cell.
        directions: usize,
    },
    /// A `(row, col)` address lies outside the grid.
    CellOutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Grid width in cells.
        width: usize,
        /// Grid height in cells.
        height: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMesh {
                width,
                height,
                directions,
            } => write!(
                f,
                "mesh must have at least one cell and direction, got {width}x{height}x{directions}"
            ),
            Self::CellOutOfBounds {
                row,
                col,
                width,
                height,
            } => write!(
                f,
                "cell ({row}, {col}) out of bounds for {width}x{height} grid"
            ),
        }
    }
}

impl std::error::Error for MeshError {}
