//! Ghost-row exchange between strip neighbours.
//!
//! Each worker sends its last interior row (`height - 2`) down and its
//! first interior row (`1`) up, then receives the neighbour below's
//! boundary row into ghost row `height - 1` and the neighbour above's
//! into ghost row `0`. Sends are eager, so every worker can issue both
//! sends before blocking on either receive; a ring of workers all
//! receiving first would deadlock.
//!
//! A missing neighbour (top or bottom of the domain) leaves the matching
//! ghost row alone. Whatever a boundary-condition routine wrote there
//! stays put.

use smallvec::SmallVec;
use strata_core::{CommError, Rank, Tag};
use strata_mesh::Mesh;

use crate::partition::CommDescriptor;
use crate::transport::{TransferHandle, Transport};

/// Sends issued by [`HaloExchanger::post_sends()`], not yet confirmed.
///
/// Either [`wait_all()`](PendingSends::wait_all) or
/// [`detach()`](PendingSends::detach). Dropping is equivalent to
/// detaching.
#[must_use = "pending sends must be waited on or explicitly detached"]
#[derive(Debug, Default)]
pub struct PendingSends {
    handles: SmallVec<[TransferHandle; 2]>,
}

impl PendingSends {
    /// Number of sends in flight.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no sends were issued (a single-worker run).
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Destinations, in issue order.
    pub fn destinations(&self) -> SmallVec<[Rank; 2]> {
        self.handles.iter().map(|h| h.dest()).collect()
    }

    /// Wait for every send, returning the first failure.
    pub fn wait_all(self) -> Result<(), CommError> {
        let mut first = Ok(());
        for handle in self.handles {
            let outcome = handle.wait();
            if first.is_ok() {
                first = outcome;
            }
        }
        first
    }

    /// Abandon the sends without checking their outcome.
    pub fn detach(self) {
        for handle in self.handles {
            handle.detach();
        }
    }
}

/// Ghost-row protocol for one worker, bound to its descriptor.
///
/// Only [`exchange()`](HaloExchanger::exchange) guarantees that both
/// ghost rows hold this step's neighbour data and that this worker's own
/// boundary rows were handed off. The split
/// [`post_sends()`](HaloExchanger::post_sends) /
/// [`post_receives()`](HaloExchanger::post_receives) pair exists so a
/// caller can overlap other work with the transfers; it makes no
/// completion promise on the send side unless the caller waits.
#[derive(Clone, Copy, Debug)]
pub struct HaloExchanger<'d> {
    descriptor: &'d CommDescriptor,
}

impl<'d> HaloExchanger<'d> {
    /// Bind the protocol to a worker's descriptor.
    pub fn new(descriptor: &'d CommDescriptor) -> Self {
        Self { descriptor }
    }

    /// Values per transferred row: local width times directions.
    pub fn row_values(&self, mesh: &Mesh) -> usize {
        self.descriptor.width() * mesh.directions()
    }

    fn check_shape(&self, mesh: &Mesh) -> Result<(), CommError> {
        let expected = (self.descriptor.width(), self.descriptor.height());
        let found = (mesh.width(), mesh.height());
        if expected != found || expected.1 < 3 {
            return Err(CommError::MeshShapeMismatch { expected, found });
        }
        Ok(())
    }

    /// Start sending both boundary rows without waiting.
    ///
    /// Row `height - 2` goes to the neighbour below, then row `1` to the
    /// neighbour above, each only if that neighbour exists.
    pub fn post_sends<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mesh: &Mesh,
    ) -> Result<PendingSends, CommError> {
        self.check_shape(mesh)?;
        let height = mesh.height();
        let mut pending = PendingSends::default();
        if let Some(below) = self.descriptor.neighbor_below() {
            pending
                .handles
                .push(transport.isend(below, Tag::HALO, mesh.row(height - 2)));
        }
        if let Some(above) = self.descriptor.neighbor_above() {
            pending
                .handles
                .push(transport.isend(above, Tag::HALO, mesh.row(1)));
        }
        tracing::trace!(
            rank = %self.descriptor.rank(),
            sends = pending.len(),
            "posted halo sends"
        );
        Ok(pending)
    }

    /// Receive both ghost rows, blocking: below first, then above.
    pub fn post_receives<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mesh: &mut Mesh,
    ) -> Result<(), CommError> {
        self.check_shape(mesh)?;
        self.receive_ghosts(transport, mesh)
    }

    /// One full ghost refresh: send down and wait, send up and wait, then
    /// receive from below and from above.
    ///
    /// On return both ghost rows adjacent to existing neighbours hold the
    /// neighbours' current boundary rows.
    ///
    /// # Errors
    ///
    /// Any [`CommError`] is fatal to the run; the ghost rows may be
    /// partially updated.
    pub fn exchange<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mesh: &mut Mesh,
    ) -> Result<(), CommError> {
        self.check_shape(mesh)?;
        let height = mesh.height();
        if let Some(below) = self.descriptor.neighbor_below() {
            transport
                .isend(below, Tag::HALO, mesh.row(height - 2))
                .wait()?;
        }
        if let Some(above) = self.descriptor.neighbor_above() {
            transport.isend(above, Tag::HALO, mesh.row(1)).wait()?;
        }
        self.receive_ghosts(transport, mesh)?;
        tracing::trace!(rank = %self.descriptor.rank(), "halo exchange complete");
        Ok(())
    }

    fn receive_ghosts<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mesh: &mut Mesh,
    ) -> Result<(), CommError> {
        let height = mesh.height();
        if let Some(below) = self.descriptor.neighbor_below() {
            transport.recv_into(below, Tag::HALO, mesh.row_mut(height - 1))?;
        }
        if let Some(above) = self.descriptor.neighbor_above() {
            transport.recv_into(above, Tag::HALO, mesh.row_mut(0))?;
        }
        Ok(())
    }
}
