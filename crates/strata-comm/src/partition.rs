//! Strip partitioning of the global grid across workers.
//!
//! The global `width x height` domain is cut into contiguous horizontal
//! strips, one per worker, in rank order from the top. Rank 0 absorbs
//! the remainder rows. Columns are never partitioned: every worker sees
//! the full width plus one ghost column on each side, and one ghost row
//! above and below its strip.

use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;
use strata_core::{PlanError, Rank};

/// Logical extent of the whole simulated grid, without padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlobalDomain {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl GlobalDomain {
    /// Domain of `width x height` cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of cells, saturating at `usize::MAX`.
    ///
    /// Planned domains never saturate; [`plan()`] rejects them first.
    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

/// One worker's view of the decomposition.
///
/// Created once by [`plan()`] and never mutated afterwards, except for
/// the explicit [`release()`](CommDescriptor::release) at shutdown.
/// `width()` and `height()` are the *local* extent including ghost
/// padding; they are the dimensions the worker's mesh is allocated with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommDescriptor {
    rank: Rank,
    worker_count: usize,
    domain: GlobalDomain,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    grid: (usize, usize),
    above: Option<Rank>,
    below: Option<Rank>,
}

impl CommDescriptor {
    /// This worker's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of workers in the run.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The global grid this descriptor was planned against.
    pub fn domain(&self) -> GlobalDomain {
        self.domain
    }

    /// Global `(x, y)` of the first interior cell. `x` is always 0.
    pub fn origin(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Local width, including the two ghost columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Local height, including the two ghost rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of rows this worker owns.
    pub fn interior_rows(&self) -> usize {
        self.height.saturating_sub(2)
    }

    /// Global rows owned by this worker, `[y, y + interior_rows)`.
    pub fn global_rows(&self) -> Range<usize> {
        self.y..self.y + self.interior_rows()
    }

    /// Decomposition shape as `(columns, rows)` of workers.
    pub fn decomposition(&self) -> (usize, usize) {
        self.grid
    }

    /// The worker owning the strip directly above, if any.
    pub fn neighbor_above(&self) -> Option<Rank> {
        self.above
    }

    /// The worker owning the strip directly below, if any.
    pub fn neighbor_below(&self) -> Option<Rank> {
        self.below
    }

    /// Existing neighbours, below first (the order sends are issued in).
    pub fn neighbors(&self) -> SmallVec<[Rank; 2]> {
        self.below.into_iter().chain(self.above).collect()
    }

    /// Reset origin and extent to zero and clear both neighbours.
    ///
    /// Called at shutdown. Rank and worker count are kept so a released
    /// descriptor still identifies its worker in diagnostics.
    pub fn release(&mut self) {
        self.x = 0;
        self.y = 0;
        self.width = 0;
        self.height = 0;
        self.above = None;
        self.below = None;
    }

    /// Whether [`release()`](CommDescriptor::release) has been called.
    pub fn is_released(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

struct Neighbor(Option<Rank>);

impl fmt::Display for Neighbor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(r) => write!(f, "{r}"),
            None => write!(f, "none"),
        }
    }
}

impl fmt::Display for CommDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rank {} (above {} below {}) origin ({}, {}) extent {}x{}",
            self.rank,
            Neighbor(self.above),
            Neighbor(self.below),
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

/// First global row and row count of `rank`'s strip.
///
/// Callers guarantee `1 <= worker_count <= height` and `rank < worker_count`.
pub(crate) fn strip_rows(rank: usize, worker_count: usize, height: usize) -> (usize, usize) {
    let rows = height / worker_count;
    let extra = height % worker_count;
    if rank == 0 {
        (0, rows + extra)
    } else {
        (rank * rows + extra, rows)
    }
}

/// Compute `rank`'s descriptor for a `width x height` grid split across
/// `worker_count` workers.
///
/// Pure: identical inputs always produce identical descriptors.
///
/// # Errors
///
/// - [`PlanError::NoWorkers`] if `worker_count == 0`.
/// - [`PlanError::NoValidDecomposition`] if `worker_count > height`.
/// - [`PlanError::EmptyDomain`] if `width == 0`.
/// - [`PlanError::DomainTooLarge`] if the ghost-padded global extent
///   `(width + 2) x (height + 2)` does not fit in `usize`.
/// - [`PlanError::RankOutOfRange`] if `rank >= worker_count`.
///
/// # Examples
///
/// ```
/// use strata_comm::partition::plan;
/// use strata_core::Rank;
///
/// // 10 rows over 3 workers: rank 0 takes 3 + 1 remainder rows.
/// let top = plan(Rank(0), 3, 8, 10).unwrap();
/// assert_eq!(top.global_rows(), 0..4);
/// assert_eq!(top.height(), 6);
/// assert_eq!(top.width(), 10);
///
/// let middle = plan(Rank(1), 3, 8, 10).unwrap();
/// assert_eq!(middle.global_rows(), 4..7);
/// assert_eq!(middle.neighbor_above(), Some(Rank(0)));
/// assert_eq!(middle.neighbor_below(), Some(Rank(2)));
/// ```
pub fn plan(
    rank: Rank,
    worker_count: usize,
    width: usize,
    height: usize,
) -> Result<CommDescriptor, PlanError> {
    if worker_count == 0 {
        return Err(PlanError::NoWorkers);
    }
    if worker_count > height {
        return Err(PlanError::NoValidDecomposition {
            worker_count,
            height,
        });
    }
    if width == 0 {
        return Err(PlanError::EmptyDomain { width, height });
    }
    let padded_width = match (width.checked_add(2), height.checked_add(2)) {
        (Some(w), Some(h)) if w.checked_mul(h).is_some() => w,
        _ => return Err(PlanError::DomainTooLarge { width, height }),
    };
    if rank.index() >= worker_count {
        return Err(PlanError::RankOutOfRange { rank, worker_count });
    }

    let r = rank.index();
    let (y, rows) = strip_rows(r, worker_count, height);
    let descriptor = CommDescriptor {
        rank,
        worker_count,
        domain: GlobalDomain::new(width, height),
        x: 0,
        y,
        width: padded_width,
        height: rows + 2,
        grid: (1, worker_count),
        above: (r > 0).then(|| Rank(r - 1)),
        below: (r + 1 < worker_count).then(|| Rank(r + 1)),
    };
    tracing::debug!(%descriptor, "planned strip");
    Ok(descriptor)
}

/// Descriptors for every rank of a run, in rank order.
pub fn plan_all(
    worker_count: usize,
    width: usize,
    height: usize,
) -> Result<Vec<CommDescriptor>, PlanError> {
    (0..worker_count)
        .map(|r| plan(Rank(r), worker_count, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_worker_owns_everything() {
        let d = plan(Rank(0), 1, 5, 7).unwrap();
        assert_eq!(d.origin(), (0, 0));
        assert_eq!((d.width(), d.height()), (7, 9));
        assert_eq!(d.neighbor_above(), None);
        assert_eq!(d.neighbor_below(), None);
        assert!(d.neighbors().is_empty());
        assert_eq!(d.decomposition(), (1, 1));
    }

    #[test]
    fn remainder_goes_to_rank_zero() {
        let ds = plan_all(4, 3, 11).unwrap();
        let rows: Vec<usize> = ds.iter().map(|d| d.interior_rows()).collect();
        assert_eq!(rows, vec![5, 2, 2, 2]);
        let origins: Vec<usize> = ds.iter().map(|d| d.origin().1).collect();
        assert_eq!(origins, vec![0, 5, 7, 9]);
    }

    #[test]
    fn too_many_workers_is_a_configuration_error() {
        for width in [0, 1, 16, 1000] {
            assert_eq!(
                plan(Rank(0), 5, width, 4),
                Err(PlanError::NoValidDecomposition {
                    worker_count: 5,
                    height: 4
                })
            );
        }
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert_eq!(plan(Rank(0), 0, 4, 4), Err(PlanError::NoWorkers));
        assert_eq!(
            plan(Rank(3), 3, 4, 4),
            Err(PlanError::RankOutOfRange {
                rank: Rank(3),
                worker_count: 3
            })
        );
        assert_eq!(
            plan(Rank(0), 1, 0, 4),
            Err(PlanError::EmptyDomain {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn oversized_domain_is_rejected_without_overflow() {
        assert_eq!(
            plan(Rank(0), 1, usize::MAX, 4),
            Err(PlanError::DomainTooLarge {
                width: usize::MAX,
                height: 4
            })
        );
        assert_eq!(
            plan(Rank(0), 2, usize::MAX / 2, 8),
            Err(PlanError::DomainTooLarge {
                width: usize::MAX / 2,
                height: 8
            })
        );
        assert_eq!(GlobalDomain::new(usize::MAX, 3).cell_count(), usize::MAX);
    }

    #[test]
    fn as_many_workers_as_rows() {
        let ds = plan_all(6, 2, 6).unwrap();
        for (r, d) in ds.iter().enumerate() {
            assert_eq!(d.interior_rows(), 1);
            assert_eq!(d.global_rows(), r..r + 1);
        }
    }

    #[test]
    fn neighbors_list_below_first() {
        let d = plan(Rank(1), 3, 4, 9).unwrap();
        assert_eq!(d.neighbors().as_slice(), &[Rank(2), Rank(0)]);
        let last = plan(Rank(2), 3, 4, 9).unwrap();
        assert_eq!(last.neighbors().as_slice(), &[Rank(1)]);
    }

    #[test]
    fn release_resets_only_this_descriptor() {
        let mut a = plan(Rank(1), 3, 4, 9).unwrap();
        let b = plan(Rank(2), 3, 4, 9).unwrap();
        let b_before = b.clone();
        a.release();
        assert_eq!(a.origin(), (0, 0));
        assert_eq!((a.width(), a.height()), (0, 0));
        assert_eq!(a.neighbor_above(), None);
        assert_eq!(a.neighbor_below(), None);
        assert!(a.is_released());
        assert_eq!(a.rank(), Rank(1));
        assert_eq!(b, b_before);
        assert!(!b.is_released());
    }

    #[test]
    fn display_is_one_line() {
        let d = plan(Rank(1), 3, 4, 9).unwrap();
        let s = d.to_string();
        assert_eq!(s, "rank 1 (above 0 below 2) origin (0, 3) extent 6x5");
        let top = plan(Rank(0), 3, 4, 9).unwrap();
        assert!(top.to_string().contains("above none"));
    }

    proptest! {
        #[test]
        fn strips_tile_the_domain(height in 1usize..200, width in 1usize..50, n in 1usize..200) {
            let n = 1 + (n - 1) % height;
            let ds = plan_all(n, width, height).unwrap();
            let mut next = 0;
            for d in &ds {
                prop_assert_eq!(d.global_rows().start, next);
                prop_assert!(d.interior_rows() >= 1);
                prop_assert_eq!(d.origin().0, 0);
                prop_assert_eq!(d.width(), width + 2);
                next = d.global_rows().end;
            }
            prop_assert_eq!(next, height);
        }

        #[test]
        fn neighbours_form_a_chain(height in 1usize..100, n in 1usize..100) {
            let n = 1 + (n - 1) % height;
            let ds = plan_all(n, 3, height).unwrap();
            for (r, d) in ds.iter().enumerate() {
                let above = if r == 0 { None } else { Some(Rank(r - 1)) };
                let below = if r + 1 == n { None } else { Some(Rank(r + 1)) };
                prop_assert_eq!(d.neighbor_above(), above);
                prop_assert_eq!(d.neighbor_below(), below);
            }
        }

        #[test]
        fn plan_is_pure(rank in 0usize..16, n in 1usize..16, width in 1usize..64, height in 16usize..64) {
            let rank = rank % n;
            let a = plan(Rank(rank), n, width, height);
            let b = plan(Rank(rank), n, width, height);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn oversubscription_always_fails(height in 0usize..50, extra in 1usize..10, width in 0usize..50) {
            let n = height + extra;
            let is_no_valid_decomposition = matches!(
                plan(Rank(0), n, width, height),
                Err(PlanError::NoValidDecomposition { .. })
            );
            prop_assert!(is_no_valid_decomposition);
        }
    }
}
