//! Point-to-point message transport between workers.
//!
//! [`Transport`] is the seam between the exchange protocol and whatever
//! moves bytes between workers. [`ChannelTransport`] is the in-process
//! implementation: every ordered pair of workers is joined by its own
//! unbounded crossbeam channel, so messages between two workers never
//! overtake each other and a receive names exactly one source.
//!
//! Sends are eager: a send completes once the payload has been handed to
//! the link, never waiting for the matching receive. That is what lets
//! every worker send both boundary rows before receiving either.

use crossbeam_channel::{Receiver, Sender};
use strata_core::{CommError, Rank, Tag};

/// A message in flight between two workers.
#[derive(Debug)]
struct Envelope {
    source: Rank,
    tag: Tag,
    payload: Vec<f64>,
}

/// Completion token for a non-blocking send.
///
/// The caller either [`wait()`](TransferHandle::wait)s for the outcome
/// or [`detach()`](TransferHandle::detach)es the handle, accepting that
/// a failed send goes unnoticed by the protocol. A handle that is
/// detached or dropped while carrying a failure logs it at `warn`.
#[must_use = "a transfer handle must be waited on or explicitly detached"]
#[derive(Debug)]
pub struct TransferHandle {
    dest: Rank,
    outcome: Option<Result<(), CommError>>,
}

impl TransferHandle {
    /// Handle for a send that has already completed.
    pub fn completed(dest: Rank) -> Self {
        Self {
            dest,
            outcome: Some(Ok(())),
        }
    }

    /// Handle for a send that failed before completing.
    pub fn failed(dest: Rank, error: CommError) -> Self {
        Self {
            dest,
            outcome: Some(Err(error)),
        }
    }

    /// Destination of the transfer.
    pub fn dest(&self) -> Rank {
        self.dest
    }

    /// Block until the send completes and report its outcome.
    pub fn wait(mut self) -> Result<(), CommError> {
        self.outcome.take().unwrap_or(Ok(()))
    }

    /// Give up on the outcome. The send keeps whatever effect it had.
    pub fn detach(mut self) {
        if let Some(Err(error)) = self.outcome.take() {
            tracing::warn!(dest = %self.dest, %error, "detached transfer had failed");
        }
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        if let Some(Err(error)) = self.outcome.take() {
            tracing::warn!(dest = %self.dest, %error, "dropped transfer handle had failed");
        }
    }
}

/// Point-to-point messaging for one worker.
///
/// Implementations must deliver messages between any ordered pair of
/// workers in the order they were sent.
pub trait Transport: Send {
    /// This worker's rank.
    fn rank(&self) -> Rank;

    /// Number of workers reachable through this transport, self included.
    fn worker_count(&self) -> usize;

    /// Start sending `data` to `dest` under `tag`.
    ///
    /// Never blocks on the receiver. Failures are reported through the
    /// returned handle.
    fn isend(&self, dest: Rank, tag: Tag, data: &[f64]) -> TransferHandle;

    /// Receive the next message from `source` into `buf`, blocking until
    /// one arrives.
    ///
    /// The message must carry `tag` and exactly `buf.len()` values;
    /// anything else is a protocol violation.
    fn recv_into(&self, source: Rank, tag: Tag, buf: &mut [f64]) -> Result<(), CommError>;

    /// Send and wait for completion.
    fn send(&self, dest: Rank, tag: Tag, data: &[f64]) -> Result<(), CommError> {
        self.isend(dest, tag, data).wait()
    }
}

/// In-process transport backed by one crossbeam channel per worker pair.
///
/// Built as a whole cluster by [`ChannelTransport::cluster()`]; each
/// element is moved onto its worker's thread. Dropping a worker's
/// transport closes all of its links, and peers blocked on it see
/// [`CommError::PeerDisconnected`].
///
/// # Examples
///
/// ```
/// use strata_comm::transport::{ChannelTransport, Transport};
/// use strata_core::{Rank, Tag};
///
/// let mut cluster = ChannelTransport::cluster(2);
/// let b = cluster.pop().unwrap();
/// let a = cluster.pop().unwrap();
///
/// a.send(Rank(1), Tag::HALO, &[1.0, 2.0]).unwrap();
/// let mut buf = [0.0; 2];
/// b.recv_into(Rank(0), Tag::HALO, &mut buf).unwrap();
/// assert_eq!(buf, [1.0, 2.0]);
/// ```
#[derive(Debug)]
pub struct ChannelTransport {
    rank: Rank,
    outboxes: Vec<Sender<Envelope>>,
    inboxes: Vec<Receiver<Envelope>>,
}

impl ChannelTransport {
    /// Build fully connected transports for `worker_count` workers, in
    /// rank order.
    pub fn cluster(worker_count: usize) -> Vec<ChannelTransport> {
        // links[src][dst]
        let links: Vec<Vec<(Sender<Envelope>, Receiver<Envelope>)>> = (0..worker_count)
            .map(|_| {
                (0..worker_count)
                    .map(|_| crossbeam_channel::unbounded())
                    .collect()
            })
            .collect();

        (0..worker_count)
            .map(|rank| ChannelTransport {
                rank: Rank(rank),
                outboxes: links[rank].iter().map(|(tx, _)| tx.clone()).collect(),
                inboxes: links.iter().map(|row| row[rank].1.clone()).collect(),
            })
            .collect()
    }

    fn check_peer(&self, peer: Rank) -> Result<usize, CommError> {
        if peer.index() < self.outboxes.len() {
            Ok(peer.index())
        } else {
            Err(CommError::UnknownPeer {
                peer,
                worker_count: self.outboxes.len(),
            })
        }
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn worker_count(&self) -> usize {
        self.outboxes.len()
    }

    fn isend(&self, dest: Rank, tag: Tag, data: &[f64]) -> TransferHandle {
        let idx = match self.check_peer(dest) {
            Ok(i) => i,
            Err(e) => return TransferHandle::failed(dest, e),
        };
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload: data.to_vec(),
        };
        match self.outboxes[idx].send(envelope) {
            Ok(()) => TransferHandle::completed(dest),
            Err(_) => TransferHandle::failed(dest, CommError::PeerDisconnected { peer: dest }),
        }
    }

    fn recv_into(&self, source: Rank, tag: Tag, buf: &mut [f64]) -> Result<(), CommError> {
        let idx = self.check_peer(source)?;
        let envelope = self.inboxes[idx]
            .recv()
            .map_err(|_| CommError::PeerDisconnected { peer: source })?;
        debug_assert_eq!(envelope.source, source);
        if envelope.tag != tag {
            return Err(CommError::TagMismatch {
                peer: source,
                expected: tag,
                received: envelope.tag,
            });
        }
        if envelope.payload.len() != buf.len() {
            return Err(CommError::SizeMismatch {
                peer: source,
                expected: buf.len(),
                received: envelope.payload.len(),
            });
        }
        buf.copy_from_slice(&envelope.payload);
        Ok(())
    }
}
