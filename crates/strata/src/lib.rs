//! Strata: strip-decomposed ghost-row exchange for 2-D Lattice-Boltzmann solvers.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Strata sub-crates. For most users, adding `strata` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! // 3 workers sharing a 16x12 grid, one population per cell.
//! let config = ClusterConfig::new(16, 12).with_workers(3).with_directions(1);
//!
//! let summaries = run_cluster(&config, |worker| {
//!     let mut sink = FrameWriter::new(std::io::sink(), config.domain(), 1);
//!     let rank = worker.rank().index() as f64;
//!     let physics = move |_step: u64, mesh: &mut Mesh, _: &CellTypeGrid| {
//!         for r in mesh.interior_rows() {
//!             mesh.row_mut(r).fill(rank);
//!         }
//!         Ok::<(), PhysicsError>(())
//!     };
//!     worker.run(RunOptions::new(5).with_frames_every(5), physics, &mut sink)
//! })
//! .unwrap();
//!
//! assert!(summaries.iter().all(|s| s.steps == 5 && s.frames == 1));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | IDs, cell types, lattice constants, error types |
//! | [`mesh`] | `strata-mesh` | Per-worker `Mesh` and `CellTypeGrid` |
//! | [`comm`] | `strata-comm` | Partitioning, transport, halo exchange, gather, frames |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and errors (`strata-core`).
pub use strata_core as types;

/// Per-worker lattice storage (`strata-mesh`).
///
/// [`mesh::Mesh`] holds the populations, [`mesh::CellTypeGrid`] the cell tags.
pub use strata_mesh as mesh;

/// Decomposition and message passing (`strata-comm`).
///
/// Plan strips with [`comm::plan()`], refresh ghosts with
/// [`comm::HaloExchanger`], and write frames with [`comm::gather()`].
pub use strata_comm as comm;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use strata_core::{CellType, Rank, Tag, D2Q9_DIRECTIONS};

    // Errors
    pub use strata_core::{CommError, GatherError, PhysicsError, PlanError};
    pub use strata_mesh::MeshError;
    pub use strata_comm::{ConfigError, WorkerError};

    // Storage
    pub use strata_mesh::{CellTypeGrid, Mesh};

    // Decomposition and exchange
    pub use strata_comm::{
        gather, plan, ChannelTransport, CommDescriptor, GlobalDomain, HaloExchanger, Transport,
    };

    // Driving a run
    pub use strata_comm::{
        run_cluster, ClusterConfig, FrameReader, FrameWriter, Physics, RunOptions, RunSummary,
        Worker,
    };
}
