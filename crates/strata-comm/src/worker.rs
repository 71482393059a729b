//! One worker of a decomposed run, and an in-process cluster runner.
//!
//! A [`Worker`] owns everything a single strip needs: its descriptor,
//! its transport endpoint, its mesh and cell-type grid, and the scratch
//! mesh the coordinator gathers into. [`Worker::run()`] is the canonical
//! driver loop: physics, ghost exchange, and a periodic gather.
//!
//! [`run_cluster()`] starts one thread per worker over a
//! [`ChannelTransport`] cluster. Workers share nothing but their links,
//! exactly as separate processes would.
//!
//! # Failure
//!
//! Every error is fatal to the whole run. A worker that returns an error
//! (or panics) drops its transport; neighbours blocked on it observe
//! [`CommError::PeerDisconnected`] and stop in turn, so the failure
//! spreads until every worker has exited.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::thread;

use strata_core::{CommError, GatherError, PhysicsError, PlanError, Rank};
use strata_mesh::{CellTypeGrid, Mesh, MeshError};

use crate::config::{ClusterConfig, ConfigError};
use crate::frame::FrameWriter;
use crate::gather::gather;
use crate::halo::{HaloExchanger, PendingSends};
use crate::partition::{plan, CommDescriptor};
use crate::transport::{ChannelTransport, Transport};

// ── WorkerError ────────────────────────────────────────────────────

/// Errors that end a worker's run.
#[derive(Debug)]
pub enum WorkerError {
    /// The worker could not be built from its configuration.
    Config(ConfigError),
    /// A ghost exchange failed.
    Comm(CommError),
    /// An output frame could not be gathered or written.
    Gather(GatherError),
    /// The physics update reported a failure.
    Physics {
        /// The failing worker.
        rank: Rank,
        /// Step at which the update failed.
        step: u64,
        /// What the physics reported.
        source: PhysicsError,
    },
    /// The worker's thread panicked.
    Panicked {
        /// The panicking worker.
        rank: Rank,
    },
    /// The worker's thread could not be started.
    ThreadSpawnFailed {
        /// The worker that never started.
        rank: Rank,
        /// Description of the spawn failure.
        reason: String,
    },
}

impl WorkerError {
    /// Whether this error only reports that a peer went away.
    ///
    /// Such errors are consequences of a failure elsewhere in the run.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Comm(CommError::PeerDisconnected { .. })
                | Self::Gather(GatherError::Comm(CommError::PeerDisconnected { .. }))
        )
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comm(e) => write!(f, "halo exchange: {e}"),
            Self::Gather(e) => write!(f, "gather: {e}"),
            Self::Physics { rank, step, source } => {
                write!(f, "physics failed on rank {rank} at step {step}: {source}")
            }
            Self::Panicked { rank } => write!(f, "worker {rank} panicked"),
            Self::ThreadSpawnFailed { rank, reason } => {
                write!(f, "worker {rank} thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for WorkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::Gather(e) => Some(e),
            Self::Physics { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for WorkerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PlanError> for WorkerError {
    fn from(e: PlanError) -> Self {
        Self::Config(ConfigError::Plan(e))
    }
}

impl From<MeshError> for WorkerError {
    fn from(e: MeshError) -> Self {
        Self::Config(ConfigError::Mesh(e))
    }
}

impl From<CommError> for WorkerError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<GatherError> for WorkerError {
    fn from(e: GatherError) -> Self {
        Self::Gather(e)
    }
}

// ── Physics seam ───────────────────────────────────────────────────

/// The local lattice update run between exchanges.
///
/// Collision and streaming live outside this crate. Implementations may
/// write any interior cell and read the ghost rows, which hold the
/// neighbours' boundary rows from the previous exchange. Closures of the
/// right shape implement this trait.
pub trait Physics {
    /// Advance the strip by one step.
    fn step(
        &mut self,
        step: u64,
        mesh: &mut Mesh,
        cell_types: &CellTypeGrid,
    ) -> Result<(), PhysicsError>;
}

impl<F> Physics for F
where
    F: FnMut(u64, &mut Mesh, &CellTypeGrid) -> Result<(), PhysicsError>,
{
    fn step(
        &mut self,
        step: u64,
        mesh: &mut Mesh,
        cell_types: &CellTypeGrid,
    ) -> Result<(), PhysicsError> {
        self(step, mesh, cell_types)
    }
}

// ── RunOptions / RunSummary ────────────────────────────────────────

/// Loop shape for [`Worker::run()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Steps to run.
    pub steps: u64,
    /// Gather a frame after every `frame_every` steps. 0 disables output.
    pub frame_every: u64,
}

impl RunOptions {
    /// Run `steps` steps without output.
    pub fn new(steps: u64) -> Self {
        Self {
            steps,
            frame_every: 0,
        }
    }

    /// Gather a frame after every `interval` steps.
    pub fn with_frames_every(mut self, interval: u64) -> Self {
        self.frame_every = interval;
        self
    }

    fn frame_due(&self, step: u64) -> bool {
        self.frame_every > 0 && (step + 1) % self.frame_every == 0
    }
}

/// Counters accumulated by a worker over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Physics steps completed.
    pub steps: u64,
    /// Ghost exchanges completed.
    pub exchanges: u64,
    /// Gathers this worker took part in.
    pub frames: u64,
}

// ── Worker ─────────────────────────────────────────────────────────

/// Everything one strip of the decomposition owns.
#[derive(Debug)]
pub struct Worker<T: Transport> {
    descriptor: CommDescriptor,
    transport: T,
    mesh: Mesh,
    cell_types: CellTypeGrid,
    scratch: Mesh,
    summary: RunSummary,
}

impl<T: Transport> Worker<T> {
    /// Plan this worker's strip and allocate its storage.
    ///
    /// Rank and worker count come from the transport; the global extent
    /// and lattice shape from `config`. Only the coordinator of a
    /// multi-worker run gets a full-size gather scratch mesh.
    pub fn new(config: &ClusterConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        if transport.worker_count() != config.worker_count {
            return Err(ConfigError::TransportMismatch {
                configured: config.worker_count,
                transport: transport.worker_count(),
            });
        }
        let descriptor = plan(
            transport.rank(),
            config.worker_count,
            config.width,
            config.height,
        )?;
        let (w, h) = (descriptor.width(), descriptor.height());
        let mesh = Mesh::new(w, h, config.directions)?;
        let cell_types = CellTypeGrid::new(w, h)?;
        let scratch = if descriptor.rank().is_coordinator() && config.worker_count > 1 {
            Mesh::new(w, h, config.directions)?
        } else {
            Mesh::new(1, 1, config.directions)?
        };
        Ok(Self {
            descriptor,
            transport,
            mesh,
            cell_types,
            scratch,
            summary: RunSummary::default(),
        })
    }

    /// This worker's descriptor.
    pub fn descriptor(&self) -> &CommDescriptor {
        &self.descriptor
    }

    /// This worker's rank.
    pub fn rank(&self) -> Rank {
        self.descriptor.rank()
    }

    /// The transport endpoint.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The strip's populations.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The strip's populations, mutable (setup and physics).
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    /// The strip's cell tags.
    pub fn cell_types(&self) -> &CellTypeGrid {
        &self.cell_types
    }

    /// The strip's cell tags, mutable (setup only).
    pub fn cell_types_mut(&mut self) -> &mut CellTypeGrid {
        &mut self.cell_types
    }

    /// Mutable populations alongside read-only tags, as the physics sees them.
    pub fn lattice_mut(&mut self) -> (&mut Mesh, &CellTypeGrid) {
        (&mut self.mesh, &self.cell_types)
    }

    /// Counters so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Refresh both ghost rows; see [`HaloExchanger::exchange()`].
    pub fn exchange(&mut self) -> Result<(), CommError> {
        HaloExchanger::new(&self.descriptor).exchange(&self.transport, &mut self.mesh)?;
        self.summary.exchanges += 1;
        Ok(())
    }

    /// Start sending boundary rows; see [`HaloExchanger::post_sends()`].
    pub fn post_sends(&self) -> Result<PendingSends, CommError> {
        HaloExchanger::new(&self.descriptor).post_sends(&self.transport, &self.mesh)
    }

    /// Receive both ghost rows; see [`HaloExchanger::post_receives()`].
    pub fn post_receives(&mut self) -> Result<(), CommError> {
        HaloExchanger::new(&self.descriptor).post_receives(&self.transport, &mut self.mesh)
    }

    /// Take part in gathering one frame.
    ///
    /// The coordinator writes the frame to `sink` and seals it; other
    /// workers only send their strip and never touch `sink`.
    pub fn gather<W: Write>(&mut self, sink: &mut FrameWriter<W>) -> Result<(), GatherError> {
        gather(
            &self.transport,
            &self.descriptor,
            sink,
            &self.mesh,
            &mut self.scratch,
        )?;
        if self.descriptor.rank().is_coordinator() {
            sink.end_frame()?;
        }
        self.summary.frames += 1;
        Ok(())
    }

    /// Drive the strip: for each step run `physics`, exchange ghosts, and
    /// gather a frame when one is due.
    ///
    /// Returns the worker's cumulative [`RunSummary`].
    pub fn run<P, W>(
        &mut self,
        options: RunOptions,
        mut physics: P,
        sink: &mut FrameWriter<W>,
    ) -> Result<RunSummary, WorkerError>
    where
        P: Physics,
        W: Write,
    {
        let rank = self.rank();
        tracing::debug!(%rank, steps = options.steps, frame_every = options.frame_every, "run starting");
        for step in 0..options.steps {
            physics
                .step(step, &mut self.mesh, &self.cell_types)
                .map_err(|source| WorkerError::Physics { rank, step, source })?;
            self.summary.steps += 1;
            self.exchange()?;
            if options.frame_due(step) {
                self.gather(sink)?;
            }
        }
        tracing::debug!(%rank, summary = ?self.summary, "run finished");
        Ok(self.summary)
    }

    /// Reset the descriptor at shutdown.
    ///
    /// Further exchanges or gathers fail with a shape mismatch.
    pub fn release(&mut self) {
        self.descriptor.release();
    }
}

// ── Cluster runner ─────────────────────────────────────────────────

/// Run `body` on one thread per worker of `config`, connected by an
/// in-process [`ChannelTransport`] cluster.
///
/// Returns each worker's result in rank order. If any worker fails, the
/// run fails: the reported error is the first (in rank order) that is not
/// merely a disconnect caused by another worker's exit, falling back to
/// the first disconnect. Each worker's descriptor is released after
/// `body` returns.
pub fn run_cluster<F, R>(config: &ClusterConfig, body: F) -> Result<Vec<R>, WorkerError>
where
    F: Fn(&mut Worker<ChannelTransport>) -> Result<R, WorkerError> + Sync,
    R: Send,
{
    config.validate()?;
    let transports = ChannelTransport::cluster(config.worker_count);
    let body = &body;

    let outcomes: Vec<Result<R, WorkerError>> = thread::scope(|s| {
        let spawned: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let rank = transport.rank();
                let handle = thread::Builder::new()
                    .name(format!("strata-worker-{rank}"))
                    .spawn_scoped(s, move || -> Result<R, WorkerError> {
                        let mut worker = Worker::new(config, transport)?;
                        tracing::debug!(descriptor = %worker.descriptor(), "worker started");
                        let result = body(&mut worker);
                        worker.release();
                        result
                    });
                (rank, handle)
            })
            .collect();

        spawned
            .into_iter()
            .map(|(rank, handle)| match handle {
                Ok(h) => h
                    .join()
                    .unwrap_or_else(|_| Err(WorkerError::Panicked { rank })),
                Err(e) => Err(WorkerError::ThreadSpawnFailed {
                    rank,
                    reason: e.to_string(),
                }),
            })
            .collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    let mut root_cause = None;
    let mut disconnect = None;
    for outcome in outcomes {
        match outcome {
            Ok(r) => results.push(r),
            Err(e) if e.is_disconnect() => {
                if disconnect.is_none() {
                    disconnect = Some(e);
                }
            }
            Err(e) => {
                if root_cause.is_none() {
                    root_cause = Some(e);
                }
            }
        }
    }
    if let Some(error) = root_cause.or(disconnect) {
        tracing::error!(%error, "run aborted");
        return Err(error);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameReader;
    use std::io;

    #[test]
    fn worker_allocates_to_descriptor_extent() {
        let config = ClusterConfig::new(6, 9).with_workers(2).with_directions(3);
        let mut transports = ChannelTransport::cluster(2);
        let t1 = transports.pop().unwrap();
        let t0 = transports.pop().unwrap();

        let w0 = Worker::new(&config, t0).unwrap();
        // 9 rows over 2 workers: rank 0 owns 5, rank 1 owns 4.
        assert_eq!((w0.mesh().width(), w0.mesh().height()), (8, 7));
        assert_eq!(w0.cell_types().height(), 7);
        assert_eq!(w0.scratch.len(), 8 * 7 * 3);

        let w1 = Worker::new(&config, t1).unwrap();
        assert_eq!((w1.mesh().width(), w1.mesh().height()), (8, 6));
        assert_eq!(w1.scratch.len(), 3);
    }

    #[test]
    fn transport_size_must_match_config() {
        let config = ClusterConfig::new(6, 9).with_workers(3);
        let t = ChannelTransport::cluster(2).pop().unwrap();
        let err = Worker::new(&config, t).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TransportMismatch {
                configured: 3,
                transport: 2
            }
        );
    }

    #[test]
    fn single_worker_run_counts_steps_and_frames() {
        let config = ClusterConfig::new(3, 2).with_directions(1);
        let t = ChannelTransport::cluster(1).pop().unwrap();
        let mut worker = Worker::new(&config, t).unwrap();
        let mut sink = FrameWriter::new(Vec::new(), config.domain(), 1);

        let physics = |step: u64, mesh: &mut Mesh, _: &CellTypeGrid| {
            for r in mesh.interior_rows() {
                mesh.row_mut(r).fill(step as f64);
            }
            Ok::<(), PhysicsError>(())
        };
        let summary = worker
            .run(RunOptions::new(6).with_frames_every(2), physics, &mut sink)
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                steps: 6,
                exchanges: 6,
                frames: 3
            }
        );

        let bytes = sink.into_inner();
        let mut reader = FrameReader::new(bytes.as_slice(), config.domain(), 1);
        let mut firsts = Vec::new();
        while let Some(frame) = reader.next_frame().unwrap() {
            firsts.push(frame.values()[0]);
        }
        assert_eq!(firsts, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn physics_failure_names_rank_and_step() {
        let config = ClusterConfig::new(3, 2).with_directions(1);
        let t = ChannelTransport::cluster(1).pop().unwrap();
        let mut worker = Worker::new(&config, t).unwrap();
        let mut sink = FrameWriter::new(io::sink(), config.domain(), 1);
        let physics = |step: u64, _: &mut Mesh, _: &CellTypeGrid| {
            if step == 2 {
                Err(PhysicsError::NonFinite { row: 1, col: 2 })
            } else {
                Ok(())
            }
        };
        let err = worker.run(RunOptions::new(5), physics, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Physics {
                rank: Rank(0),
                step: 2,
                source: PhysicsError::NonFinite { row: 1, col: 2 },
            }
        ));
        let source = err.source().map(|e| e.to_string());
        assert_eq!(
            source.as_deref(),
            Some("non-finite population at cell (1, 2)")
        );
        assert_eq!(worker.summary().steps, 2);
    }

    #[test]
    fn released_worker_refuses_to_exchange() {
        let config = ClusterConfig::new(3, 2).with_directions(1);
        let t = ChannelTransport::cluster(1).pop().unwrap();
        let mut worker = Worker::new(&config, t).unwrap();
        worker.release();
        assert!(worker.descriptor().is_released());
        assert!(matches!(
            worker.exchange(),
            Err(CommError::MeshShapeMismatch { .. })
        ));
    }

    #[test]
    fn cluster_reports_root_cause_over_disconnects() {
        let config = ClusterConfig::new(4, 6).with_workers(3).with_directions(1);
        let err = run_cluster(&config, |worker| {
            if worker.rank() == Rank(1) {
                return Err(WorkerError::Physics {
                    rank: Rank(1),
                    step: 0,
                    source: "boom".into(),
                });
            }
            worker.exchange()?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, WorkerError::Physics { rank: Rank(1), .. }));
    }

    #[test]
    fn cluster_rejects_invalid_config_before_spawning() {
        let config = ClusterConfig::new(4, 2).with_workers(3);
        let err = run_cluster(&config, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Config(ConfigError::Plan(PlanError::NoValidDecomposition { .. }))
        ));
    }

    #[test]
    fn disconnect_errors_are_recognised() {
        let e = WorkerError::from(CommError::PeerDisconnected { peer: Rank(2) });
        assert!(e.is_disconnect());
        let g = WorkerError::from(GatherError::Comm(CommError::PeerDisconnected {
            peer: Rank(0),
        }));
        assert!(g.is_disconnect());
        assert!(!WorkerError::Panicked { rank: Rank(0) }.is_disconnect());
    }
}
