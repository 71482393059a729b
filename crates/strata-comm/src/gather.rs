//! Collective reduction of every worker's strip to the coordinator.
//!
//! The coordinator writes its own interior first, then receives each
//! other rank's whole mesh in ascending rank order and writes that
//! interior. Because ranks own strips in top-to-bottom order, the output
//! is the global grid in row order. Everything is sequential: one peer at
//! a time, no pipelining.

use std::io::Write;

use strata_core::{CommError, GatherError, Rank, Tag};
use strata_mesh::Mesh;

use crate::frame::write_interior;
use crate::partition::{strip_rows, CommDescriptor};
use crate::transport::Transport;

/// Gather one frame.
///
/// On the coordinator, writes the whole frame to `sink`, using `scratch`
/// to hold each peer's mesh in turn (it is reshaped as needed). On every
/// other rank, sends `local` (ghost rows included) to the coordinator and
/// leaves `sink` and `scratch` untouched. With a single worker, writes
/// `local` directly without messaging.
///
/// Every worker of the run must call this for the same frame.
///
/// # Errors
///
/// [`GatherError::Io`] if the sink rejects a write, and
/// [`GatherError::Comm`] for any transfer failure, a mesh that does not
/// match `descriptor`, or (on the coordinator) a `scratch` whose direction
/// count differs from `local`. Nothing is written in the last two cases.
pub fn gather<T, W>(
    transport: &T,
    descriptor: &CommDescriptor,
    sink: &mut W,
    local: &Mesh,
    scratch: &mut Mesh,
) -> Result<(), GatherError>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
{
    let expected = (descriptor.width(), descriptor.height());
    let found = (local.width(), local.height());
    if expected != found {
        return Err(CommError::MeshShapeMismatch { expected, found }.into());
    }

    let workers = descriptor.worker_count();
    if workers == 1 {
        write_interior(sink, local)?;
        return Ok(());
    }

    if !descriptor.rank().is_coordinator() {
        transport.send(Rank::COORDINATOR, Tag::GATHER, local.as_slice())?;
        tracing::trace!(rank = %descriptor.rank(), "sent strip to coordinator");
        return Ok(());
    }

    // Every peer strip lands in scratch, so it must agree with the local
    // mesh before anything reaches the sink.
    if scratch.directions() != local.directions() {
        return Err(CommError::DirectionMismatch {
            expected: local.directions(),
            found: scratch.directions(),
        }
        .into());
    }

    write_interior(sink, local)?;
    let height = descriptor.domain().height;
    for peer in 1..workers {
        let (_, rows) = strip_rows(peer, workers, height);
        let shape = (descriptor.width(), rows + 2);
        scratch
            .reshape(shape.0, shape.1)
            .map_err(|_| CommError::MeshShapeMismatch {
                expected: shape,
                found: (scratch.width(), scratch.height()),
            })?;
        transport.recv_into(Rank(peer), Tag::GATHER, scratch.as_mut_slice())?;
        write_interior(sink, scratch)?;
        tracing::trace!(peer, rows, "gathered strip");
    }
    Ok(())
}
