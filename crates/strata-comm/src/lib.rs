//! Domain decomposition and message passing for Strata.
//!
//! The global grid is cut into horizontal strips, one per worker
//! ([`partition`]). Each step, neighbouring workers swap their boundary
//! rows into each other's ghost rows ([`halo`]) over a point-to-point
//! [`transport`]. Periodically every strip is funnelled to the
//! coordinator, which writes the assembled grid as one raw [`frame`]
//! ([`gather`]). [`worker`] ties these together into a driver loop and
//! an in-process cluster runner configured by [`config`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod frame;
pub mod gather;
pub mod halo;
pub mod partition;
pub mod transport;
pub mod worker;

pub use config::{ClusterConfig, ConfigError};
pub use frame::{frame_bytes, write_interior, Frame, FrameReader, FrameWriter};
pub use gather::gather;
pub use halo::{HaloExchanger, PendingSends};
pub use partition::{plan, plan_all, CommDescriptor, GlobalDomain};
pub use transport::{ChannelTransport, TransferHandle, Transport};
pub use worker::{run_cluster, Physics, RunOptions, RunSummary, Worker, WorkerError};
