//! Reusable physics fixtures.
//!
//! - [`ConstPhysics`] writes a constant into every interior cell.
//! - [`StepStampPhysics`] writes `rank * 1000 + step` into every interior cell.
//! - [`FailingPhysics`] fails deterministically at a given step.

use strata_comm::Physics;
use strata_core::{PhysicsError, Rank};
use strata_mesh::{CellTypeGrid, Mesh};

/// Writes `value` into every interior row, ghost columns included.
pub struct ConstPhysics {
    pub value: f64,
}

impl ConstPhysics {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Physics for ConstPhysics {
    fn step(&mut self, _step: u64, mesh: &mut Mesh, _: &CellTypeGrid) -> Result<(), PhysicsError> {
        for r in mesh.interior_rows() {
            mesh.row_mut(r).fill(self.value);
        }
        Ok(())
    }
}

/// Writes `rank * 1000 + step` into every interior row, so a ghost row
/// shows which neighbour and which step it came from.
pub struct StepStampPhysics {
    pub rank: Rank,
    pub calls: u64,
}

impl StepStampPhysics {
    pub fn new(rank: Rank) -> Self {
        Self { rank, calls: 0 }
    }

    pub fn stamp(rank: Rank, step: u64) -> f64 {
        (rank.index() as u64 * 1000 + step) as f64
    }
}

impl Physics for StepStampPhysics {
    fn step(&mut self, step: u64, mesh: &mut Mesh, _: &CellTypeGrid) -> Result<(), PhysicsError> {
        self.calls += 1;
        let v = Self::stamp(self.rank, step);
        for r in mesh.interior_rows() {
            mesh.row_mut(r).fill(v);
        }
        Ok(())
    }
}

/// Succeeds until `fail_at`, then fails on that step.
pub struct FailingPhysics {
    pub fail_at: u64,
}

impl FailingPhysics {
    pub fn new(fail_at: u64) -> Self {
        Self { fail_at }
    }
}

impl Physics for FailingPhysics {
    fn step(&mut self, step: u64, _: &mut Mesh, _: &CellTypeGrid) -> Result<(), PhysicsError> {
        if step == self.fail_at {
            Err(PhysicsError::ExecutionFailed {
                reason: format!("failed at step {step}"),
            })
        } else {
            Ok(())
        }
    }
}
