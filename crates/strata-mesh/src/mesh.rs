//! Dense row-major grid of direction vectors.

use std::ops::Range;

use crate::error::MeshError;

/// A worker's strip of lattice populations.
///
/// Cells are addressed `(row, col)` with row 0 at the top. Each cell is a
/// slice of `directions` consecutive `f64` values, and each row is
/// `width * directions` consecutive values, so [`row()`](Mesh::row) hands
/// out a whole row as one contiguous block. The halo exchange and the
/// gather both depend on this layout.
///
/// Rows `0` and `height - 1` are ghost rows when the mesh was sized from a
/// communication descriptor; the mesh itself does not distinguish them.
///
/// # Examples
///
/// ```
/// use strata_mesh::Mesh;
///
/// let mut mesh = Mesh::new(4, 3, 9).unwrap();
/// mesh.cell_mut(1, 2)[0] = 0.5;
/// assert_eq!(mesh.cell(1, 2)[0], 0.5);
/// assert_eq!(mesh.row(1).len(), 4 * 9);
/// assert!(mesh.get(3, 0).is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    width: usize,
    height: usize,
    directions: usize,
    cells: Vec<f64>,
}

impl Mesh {
    /// Allocate a zero-filled mesh of `width x height` cells with
    /// `directions` populations each.
    ///
    /// Returns `Err(MeshError::EmptyMesh)` if any dimension is zero.
    pub fn new(width: usize, height: usize, directions: usize) -> Result<Self, MeshError> {
        check_dims(width, height, directions)?;
        Ok(Self {
            width,
            height,
            directions,
            cells: vec![0.0; width * height * directions],
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

    /// Populations per cell.
    pub fn directions(&self) -> usize {
        self.directions
    }

    /// Number of values in one row (`width * directions`).
    pub fn row_len(&self) -> usize {
        self.width * self.directions
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`, since construction rejects zero dimensions.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Rows strictly between the top and bottom ghost rows.
    pub fn interior_rows(&self) -> Range<usize> {
        1..self.height.saturating_sub(1).max(1)
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            row < self.height && col < self.width,
            "cell ({row}, {col}) out of bounds for {}x{} mesh",
            self.width,
            self.height
        );
        (row * self.width + col) * self.directions
    }

    /// Direction vector of the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the address is outside the mesh. Debug builds name the
    /// offending coordinate.
    pub fn cell(&self, row: usize, col: usize) -> &[f64] {
        let start = self.offset(row, col);
        &self.cells[start..start + self.directions]
    }

    /// Mutable direction vector of the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the address is outside the mesh.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut [f64] {
        let start = self.offset(row, col);
        let d = self.directions;
        &mut self.cells[start..start + d]
    }

    /// Direction vector at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&[f64]> {
        if row < self.height && col < self.width {
            Some(self.cell(row, col))
        } else {
            None
        }
    }

    /// Mutable direction vector at `(row, col)`, or `None` when out of bounds.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut [f64]> {
        if row < self.height && col < self.width {
            Some(self.cell_mut(row, col))
        } else {
            None
        }
    }

    /// Row `row` as one contiguous block of `row_len()` values.
    ///
    /// # Panics
    ///
    /// Panics if `row >= height()`.
    pub fn row(&self, row: usize) -> &[f64] {
        debug_assert!(row < self.height, "row {row} out of bounds for height {}", self.height);
        let len = self.row_len();
        &self.cells[row * len..(row + 1) * len]
    }

    /// Mutable row `row` as one contiguous block.
    ///
    /// # Panics
    ///
    /// Panics if `row >= height()`.
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        debug_assert!(row < self.height, "row {row} out of bounds for height {}", self.height);
        let len = self.row_len();
        &mut self.cells[row * len..(row + 1) * len]
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.cells.chunks_exact(self.row_len())
    }

    /// The whole backing buffer, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.cells
    }

    /// The whole backing buffer, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.cells
    }

    /// Set every population in the mesh to `value`.
    pub fn fill(&mut self, value: f64) {
        self.cells.fill(value);
    }

    /// Re-dimension the mesh in place, keeping `directions`.
    ///
    /// Contents after a reshape are unspecified; callers overwrite the
    /// buffer before reading it. The allocation is reused and only grows.
    pub fn reshape(&mut self, width: usize, height: usize) -> Result<(), MeshError> {
        check_dims(width, height, self.directions)?;
        self.width = width;
        self.height = height;
        self.cells.resize(width * height * self.directions, 0.0);
        Ok(())
    }
}

fn check_dims(width: usize, height: usize, directions: usize) -> Result<(), MeshError> {
    if width == 0 || height == 0 || directions == 0 {
        return Err(MeshError::EmptyMesh {
            width,
            height,
            directions,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_dimension_rejected() {
        assert!(matches!(Mesh::new(0, 3, 9), Err(MeshError::EmptyMesh { .. })));
        assert!(matches!(Mesh::new(3, 0, 9), Err(MeshError::EmptyMesh { .. })));
        assert!(matches!(Mesh::new(3, 3, 0), Err(MeshError::EmptyMesh { .. })));
    }

    #[test]
    fn new_mesh_is_zeroed() {
        let m = Mesh::new(5, 4, 9).unwrap();
        assert_eq!(m.len(), 5 * 4 * 9);
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
        assert!(!m.is_empty());
        assert!(!Mesh::new(1, 1, 1).unwrap().is_empty());
    }

    #[test]
    fn cell_write_lands_in_its_row() {
        let mut m = Mesh::new(3, 4, 2).unwrap();
        m.cell_mut(2, 1).copy_from_slice(&[7.0, 8.0]);
        let row = m.row(2);
        assert_eq!(&row[2..4], &[7.0, 8.0]);
        assert!(m.row(1).iter().all(|&v| v == 0.0));
        assert!(m.row(3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rows_are_contiguous_in_buffer() {
        let mut m = Mesh::new(2, 3, 3).unwrap();
        m.row_mut(1).fill(1.0);
        let flat = m.as_slice();
        assert!(flat[..6].iter().all(|&v| v == 0.0));
        assert!(flat[6..12].iter().all(|&v| v == 1.0));
        assert!(flat[12..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let mut m = Mesh::new(3, 2, 9).unwrap();
        assert!(m.get(1, 2).is_some());
        assert!(m.get(2, 0).is_none());
        assert!(m.get(0, 3).is_none());
        assert!(m.get_mut(5, 5).is_none());
    }

    #[test]
    #[should_panic]
    fn cell_out_of_bounds_panics() {
        let m = Mesh::new(3, 2, 9).unwrap();
        let _ = m.cell(2, 0);
    }

    #[test]
    fn interior_rows_exclude_ghosts() {
        let m = Mesh::new(4, 6, 1).unwrap();
        assert_eq!(m.interior_rows(), 1..5);
        let tiny = Mesh::new(4, 1, 1).unwrap();
        assert!(tiny.interior_rows().is_empty());
    }

    #[test]
    fn reshape_keeps_directions_and_resizes() {
        let mut m = Mesh::new(4, 6, 3).unwrap();
        m.reshape(4, 3).unwrap();
        assert_eq!((m.width(), m.height(), m.directions()), (4, 3, 3));
        assert_eq!(m.len(), 4 * 3 * 3);
        m.reshape(5, 8).unwrap();
        assert_eq!(m.len(), 5 * 8 * 3);
        assert!(m.reshape(0, 8).is_err());
    }

    #[test]
    fn rows_iterator_yields_every_row() {
        let mut m = Mesh::new(2, 3, 1).unwrap();
        for r in 0..3 {
            m.row_mut(r).fill(r as f64);
        }
        let collected: Vec<f64> = m.rows().map(|row| row[0]).collect();
        assert_eq!(collected, vec![0.0, 1.0, 2.0]);
    }

    proptest! {
        #[test]
        fn cell_and_row_views_agree(
            width in 1usize..8,
            height in 1usize..8,
            directions in 1usize..10,
            r in 0usize..8,
            c in 0usize..8,
        ) {
            let r = r % height;
            let c = c % width;
            let mut m = Mesh::new(width, height, directions).unwrap();
            for (i, v) in m.cell_mut(r, c).iter_mut().enumerate() {
                *v = (i + 1) as f64;
            }
            let start = c * directions;
            prop_assert_eq!(&m.row(r)[start..start + directions], m.cell(r, c));
            let nonzero = m.as_slice().iter().filter(|&&v| v != 0.0).count();
            prop_assert_eq!(nonzero, directions);
        }
    }
}
