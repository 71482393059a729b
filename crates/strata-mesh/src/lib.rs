//! Per-worker lattice storage for Strata.
//!
//! A worker owns one [`Mesh`] (its strip of direction populations, padded
//! with ghost rows and columns) and one [`CellTypeGrid`] of the same
//! extent. Both are dense and row-major; a mesh row is a single
//! contiguous slice, which is what lets the halo exchange ship a whole
//! row as one message.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell_types;
pub mod error;
pub mod mesh;

pub use cell_types::CellTypeGrid;
pub use error::MeshError;
pub use mesh::Mesh;
