//! Core types for the Strata strip-decomposed lattice solver.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers that flow through the message-passing layer, the
//! per-cell lattice types shared by the mesh and the physics, and the
//! error taxonomy every other crate reports through.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod lattice;

pub use error::{CommError, GatherError, PhysicsError, PlanError};
pub use id::{Rank, Tag};
pub use lattice::{CellType, D2Q9_DIRECTIONS, VALUE_BYTES};
