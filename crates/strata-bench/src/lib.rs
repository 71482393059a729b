//! Benchmark profiles and utilities for the Strata halo-exchange layer.
//!
//! - [`reference_profile`]: 800x160 D2Q9 grid over 4 workers
//! - [`stress_profile`]: 2000x400 D2Q9 grid over 16 workers
//! - [`Rig`]: a whole cluster driven from one thread

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_comm::{plan_all, ChannelTransport, ClusterConfig, CommDescriptor, HaloExchanger};
use strata_core::CommError;
use strata_mesh::Mesh;

/// Reference profile: 800x160 cells, D2Q9, 4 workers of 40 rows each.
pub fn reference_profile() -> ClusterConfig {
    ClusterConfig::new(800, 160).with_workers(4)
}

/// Stress profile: 2000x400 cells, D2Q9, 16 workers of 25 rows each.
pub fn stress_profile() -> ClusterConfig {
    ClusterConfig::new(2000, 400).with_workers(16)
}

/// Every worker of a cluster, held by a single thread.
///
/// Sends are eager, so one thread can post every worker's sends and then
/// drain every worker's receives. That measures the protocol and copy
/// cost without thread scheduling noise.
pub struct Rig {
    pub descriptors: Vec<CommDescriptor>,
    pub transports: Vec<ChannelTransport>,
    pub meshes: Vec<Mesh>,
}

impl Rig {
    /// Plan and allocate every worker of `config`.
    pub fn new(config: &ClusterConfig) -> Self {
        let descriptors = plan_all(config.worker_count, config.width, config.height)
            .unwrap_or_else(|e| panic!("benchmark profile must plan: {e}"));
        let meshes = descriptors
            .iter()
            .map(|d| {
                let mut m = Mesh::new(d.width(), d.height(), config.directions)
                    .unwrap_or_else(|e| panic!("benchmark mesh must allocate: {e}"));
                m.fill(d.rank().index() as f64);
                m
            })
            .collect();
        Self {
            descriptors,
            transports: ChannelTransport::cluster(config.worker_count),
            meshes,
        }
    }

    /// One ghost refresh across the whole cluster.
    pub fn exchange_round(&mut self) -> Result<(), CommError> {
        for ((d, t), m) in self
            .descriptors
            .iter()
            .zip(&self.transports)
            .zip(&self.meshes)
        {
            HaloExchanger::new(d).post_sends(t, m)?.wait_all()?;
        }
        for ((d, t), m) in self
            .descriptors
            .iter()
            .zip(&self.transports)
            .zip(&mut self.meshes)
        {
            HaloExchanger::new(d).post_receives(t, m)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_validates() {
        reference_profile().validate().unwrap();
    }

    #[test]
    fn stress_profile_validates() {
        stress_profile().validate().unwrap();
    }

    #[test]
    fn rig_round_fills_interior_ghosts() {
        let mut rig = Rig::new(&ClusterConfig::new(4, 6).with_workers(3).with_directions(1));
        rig.exchange_round().unwrap();
        let mid = &rig.meshes[1];
        assert!(mid.row(0).iter().all(|&v| v == 0.0));
        assert!(mid.row(mid.height() - 1).iter().all(|&v| v == 2.0));
        let top = &rig.meshes[0];
        assert!(top.row(top.height() - 1).iter().all(|&v| v == 1.0));
    }
}
