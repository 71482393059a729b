//! Per-cell classification grid parallel to a [`Mesh`](crate::Mesh).

use strata_core::CellType;

use crate::error::MeshError;

/// Cell tags for a worker's strip, same extent as its mesh.
///
/// Populated once by the boundary/obstacle setup and only read by the
/// physics afterwards. Starts out all [`CellType::Fluid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellTypeGrid {
    width: usize,
    height: usize,
    cells: Vec<CellType>,
}

impl CellTypeGrid {
    /// Allocate an all-fluid grid of `width x height` cells.
    pub fn new(width: usize, height: usize) -> Result<Self, MeshError> {
        if width == 0 || height == 0 {
            return Err(MeshError::EmptyMesh {
                width,
                height,
                directions: 1,
            });
        }
        Ok(Self {
            width,
            height,
            cells: vec![CellType::Fluid; width * height],
        })
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, MeshError> {
        if row >= self.height || col >= self.width {
            return Err(MeshError::CellOutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(row * self.width + col)
    }

    /// Tag of the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the address is outside the grid.
    pub fn cell_type(&self, row: usize, col: usize) -> CellType {
        debug_assert!(
            row < self.height && col < self.width,
            "cell ({row}, {col}) out of bounds for {}x{} grid",
            self.width,
            self.height
        );
        self.cells[row * self.width + col]
    }

    /// Tag of the cell at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<CellType> {
        self.index(row, col).ok().map(|i| self.cells[i])
    }

    /// Tag the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, ty: CellType) -> Result<(), MeshError> {
        let i = self.index(row, col)?;
        self.cells[i] = ty;
        Ok(())
    }

    /// Tag every cell of row `row`.
    pub fn fill_row(&mut self, row: usize, ty: CellType) -> Result<(), MeshError> {
        let start = self.index(row, 0)?;
        self.cells[start..start + self.width].fill(ty);
        Ok(())
    }

    /// Tags of row `row`, left to right.
    pub fn row(&self, row: usize) -> &[CellType] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    /// Number of cells carrying tag `ty`.
    pub fn count(&self, ty: CellType) -> usize {
        self.cells.iter().filter(|&&c| c == ty).count()
    }
}
