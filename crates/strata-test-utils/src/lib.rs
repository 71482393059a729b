//! Test utilities and fixtures for Strata development.
//!
//! Seeded mesh patterns, a thread-per-worker harness over
//! [`ChannelTransport`], and sinks that misbehave on demand. The physics
//! fixtures live in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io::{self, Write};
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_comm::{ChannelTransport, CommDescriptor};
use strata_mesh::Mesh;

/// Fill every interior row of `mesh` with values drawn from a ChaCha8
/// stream seeded by `seed`. Ghost rows are set to `ghost`.
///
/// Two meshes of the same shape filled with the same seed are identical.
pub fn fill_seeded(mesh: &mut Mesh, seed: u64, ghost: f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let last = mesh.height() - 1;
    mesh.row_mut(0).fill(ghost);
    mesh.row_mut(last).fill(ghost);
    for r in mesh.interior_rows() {
        for v in mesh.row_mut(r) {
            *v = rng.random::<f64>();
        }
    }
}

/// Seed for a given rank, so each worker gets its own stream.
pub fn rank_seed(base: u64, descriptor: &CommDescriptor) -> u64 {
    base ^ (descriptor.rank().index() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Encode a global cell coordinate as a value: `row * 1000 + col`.
pub fn global_cell_value(row: usize, col: usize) -> f64 {
    (row * 1000 + col) as f64
}

/// Stamp every interior cell with [`global_cell_value()`] of its global
/// position and set ghost rows to `ghost`.
pub fn stamp_global(mesh: &mut Mesh, descriptor: &CommDescriptor, ghost: f64) {
    let (_, y) = descriptor.origin();
    let last = mesh.height() - 1;
    mesh.row_mut(0).fill(ghost);
    mesh.row_mut(last).fill(ghost);
    for r in mesh.interior_rows() {
        for c in 1..mesh.width() - 1 {
            mesh.cell_mut(r, c).fill(global_cell_value(y + r - 1, c - 1));
        }
    }
}

/// Run `body` once per worker of a `worker_count` cluster, each on its
/// own thread, and return the results in rank order.
///
/// Panics in `body` are re-raised on the calling thread.
pub fn spawn_cluster<F, R>(worker_count: usize, body: F) -> Vec<R>
where
    F: Fn(ChannelTransport) -> R + Sync,
    R: Send,
{
    let body = &body;
    thread::scope(|s| {
        let handles: Vec<_> = ChannelTransport::cluster(worker_count)
            .into_iter()
            .map(|t| s.spawn(move || body(t)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Writer that accepts `capacity` bytes and then fails every write.
#[derive(Debug)]
pub struct FailingWriter {
    capacity: usize,
    pub written: Vec<u8>,
}

impl FailingWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            written: Vec::new(),
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.capacity == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "sink exhausted"));
        }
        let n = buf.len().min(self.capacity);
        self.capacity -= n;
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
