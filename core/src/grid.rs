use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::*;

/// How [`GridState::sample_coordinates`] picks cells.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Draw with replacement and drop duplicates, so fewer cells than requested may come back.
    #[default]
    WithReplacement,
    /// Always return `min(count, length²)` distinct cells.
    Distinct,
}

/// Result of evaluating one round.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Sampled cells that were closed (struck) by evaluation time.
    pub score: CellCount,
    /// Sampled cells still open at evaluation time.
    pub penalty: CellCount,
}

impl Outcome {
    pub const fn total(&self) -> CellCount {
        self.score + self.penalty
    }
}

/// The N×N mole grid. The cell state itself is the hit flag: a mole whacked
/// before evaluation is already closed when [`GridState::evaluate_outcome`] reads it.
#[derive(Clone, Debug)]
pub struct GridState {
    cells: Array2<CellState>,
    policy: SamplingPolicy,
    rng: SmallRng,
}

impl GridState {
    pub fn new(length: Coord) -> Self {
        Self::with_rng(length, SmallRng::from_rng(&mut rand::rng()))
    }

    pub fn seeded(length: Coord, seed: u64) -> Self {
        Self::with_rng(length, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(length: Coord, rng: SmallRng) -> Self {
        Self {
            cells: Array2::default((length, length).to_nd_index()),
            policy: SamplingPolicy::default(),
            rng,
        }
    }

    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// Reallocates an all-closed `length`×`length` grid.
    pub fn reset(&mut self, length: Coord) {
        self.cells = Array2::default((length, length).to_nd_index());
        log::trace!("grid reset to {length}x{length}");
    }

    pub fn length(&self) -> Coord {
        // the grid is always square and built from a `Coord`
        self.cells.dim().0 as Coord
    }

    pub fn cell_at(&self, coord: Coord2) -> Result<CellState> {
        let coord = self.validate_coord(coord)?;
        Ok(self.cells[coord.to_nd_index()])
    }

    pub fn validate_coord(&self, coord: Coord2) -> Result<Coord2> {
        let length = self.length();
        if in_bounds(coord, length) {
            Ok(coord)
        } else {
            Err(GameError::CoordOutOfBounds { coord, length })
        }
    }

    /// All currently open cells.
    pub fn open_cells(&self) -> CoordSet {
        self.cells
            .indexed_iter()
            .filter(|(_, cell)| cell.is_open())
            .map(|((row, col), _)| (row as Coord, col as Coord))
            .collect()
    }

    /// Picks up to `count` random cells according to the sampling policy.
    ///
    /// Callers must not assume `count` cells come back: with
    /// [`SamplingPolicy::WithReplacement`] colliding draws collapse into one.
    pub fn sample_coordinates(&mut self, count: usize) -> CoordSet {
        let length = self.length();
        if length == 0 {
            return CoordSet::new();
        }

        let coords: CoordSet = match self.policy {
            SamplingPolicy::WithReplacement => (0..count)
                .map(|_| {
                    (
                        self.rng.random_range(0..length),
                        self.rng.random_range(0..length),
                    )
                })
                .collect(),
            SamplingPolicy::Distinct => {
                let total = area(length) as usize;
                rand::seq::index::sample(&mut self.rng, total, count.min(total))
                    .into_iter()
                    .map(|index| {
                        let length = usize::from(length);
                        ((index / length) as Coord, (index % length) as Coord)
                    })
                    .collect()
            }
        };

        log::trace!("sampled {} of {count} requested: {coords:?}", coords.len());
        coords
    }

    /// Sets every cell in `coords` to `state`. Nothing is written if any
    /// coordinate is out of bounds.
    pub fn set_state(&mut self, state: CellState, coords: &CoordSet) -> Result<()> {
        for &coord in coords {
            self.validate_coord(coord)?;
        }
        for &coord in coords {
            self.cells[coord.to_nd_index()] = state;
        }
        Ok(())
    }

    /// Counts closed cells in `coords` as score and open ones as penalty.
    pub fn evaluate_outcome(&self, coords: &CoordSet) -> Result<Outcome> {
        let mut outcome = Outcome::default();
        for &coord in coords {
            match self.cell_at(coord)? {
                CellState::Closed => outcome.score += 1,
                CellState::Open => outcome.penalty += 1,
            }
        }
        log::trace!("outcome {outcome:?} for {coords:?}");
        Ok(outcome)
    }
}
