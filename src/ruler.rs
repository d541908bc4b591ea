//! Module for representing and manipulating Golomb rulers

use std::fmt;

use thiserror::Error;

/// Error raised when a ruler is constructed from unusable input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulerError {
    /// A mark position was negative. Marks live on the non-negative line.
    #[error("invalid mark position {0}: positions must be non-negative")]
    InvalidInput(i64),
}

/// Represents a Golomb ruler as a sorted sequence of mark positions.
///
/// The first mark of any non-empty ruler produced by the engine is at
/// position 0. Length and mark count are derived from the positions and
/// cannot drift out of sync with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GolombRuler {
    positions: Vec<usize>,
}

impl GolombRuler {
    /// Creates a new ruler from raw positions, sorting them into ascending
    /// order. Fails if any position is negative.
    pub fn new(positions: &[i64]) -> Result<Self, RulerError> {
        for &pos in positions {
            if pos < 0 {
                return Err(RulerError::InvalidInput(pos));
            }
        }

        let mut sorted: Vec<usize> = positions.iter().map(|&p| p as usize).collect();
        sorted.sort_unstable();

        Ok(Self { positions: sorted })
    }

    /// Creates a ruler from positions already known to be sorted ascending.
    /// Used by the solver, which builds its candidates in order.
    pub(crate) fn from_sorted(positions: Vec<usize>) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Self { positions }
    }

    /// Returns the positions of the ruler marks.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Returns the length of the ruler, which is the position of the last mark.
    pub fn length(&self) -> usize {
        self.positions.last().copied().unwrap_or(0)
    }

    /// Returns the number of marks on the ruler.
    pub fn marks(&self) -> usize {
        self.positions.len()
    }

    /// Returns all pairwise distances between marks, sorted ascending.
    pub fn pairwise_distances(&self) -> Vec<usize> {
        let n = self.positions.len();
        if n < 2 {
            return Vec::new();
        }

        let mut distances = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                distances.push(self.positions[j] - self.positions[i]);
            }
        }

        distances.sort_unstable();
        distances
    }

    /// Returns the distances in [1, length] that the ruler cannot measure.
    /// Only used for reporting; the search never consults this.
    pub fn missing_distances(&self) -> Vec<usize> {
        if self.length() == 0 {
            return Vec::new();
        }

        let distances = self.pairwise_distances();
        let mut missing = Vec::new();
        for d in 1..=self.length() {
            if distances.binary_search(&d).is_err() {
                missing.push(d);
            }
        }

        missing
    }

    /// Checks whether all pairwise distances are distinct.
    ///
    /// This is the final safety net over a complete candidate; the hot-path
    /// pruning lives in [`crate::distance::DistanceBitset`].
    pub fn is_valid(&self) -> bool {
        if self.marks() < 2 {
            return true;
        }

        let distances = self.pairwise_distances();
        distances.windows(2).all(|w| w[0] != w[1])
    }
}

impl fmt::Display for GolombRuler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, pos) in self.positions.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", pos)?;
        }
        write!(f, "]")
    }
}
