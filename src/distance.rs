//! Incremental distance-uniqueness checking for partial rulers
//!
//! The backtracking search calls into this module once per node, so the
//! check must be allocation-free. Distances are tracked in a dense bitset
//! indexed by distance; each worker owns exactly one bitset and resets it
//! between candidate evaluations instead of reallocating.

/// Maximum ruler length the engine will ever consider.
pub const MAX_RULER_LENGTH: usize = 1000;

const WORD_BITS: usize = 64;
const WORDS: usize = MAX_RULER_LENGTH / WORD_BITS + 1;

/// Dense bitset over distances in [0, MAX_RULER_LENGTH].
///
/// Not shared between threads: every search worker owns its own instance.
#[derive(Debug)]
pub struct DistanceBitset {
    words: [u64; WORDS],
}

impl Default for DistanceBitset {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceBitset {
    pub fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Checks whether the first `len` positions form a duplicate-free
    /// partial ruler. `positions` must be sorted ascending up to `len`.
    ///
    /// The full distance multiset is rederived on every call rather than
    /// maintaining a delta against the previous node. That costs O(len²),
    /// but len is small compared to the search tree and the loop runs
    /// without allocating or branching unpredictably.
    pub fn is_partial_valid(&mut self, positions: &[usize], len: usize) -> bool {
        if len < 2 {
            return true;
        }

        // Only clear the words that can be touched: no distance exceeds the
        // largest filled position.
        let max_dist = positions[len - 1];
        let used = (max_dist / WORD_BITS + 1).min(WORDS);
        for word in &mut self.words[..used] {
            *word = 0;
        }

        for i in 0..len {
            for j in i + 1..len {
                let dist = positions[j] - positions[i];
                let word = dist / WORD_BITS;
                let mask = 1u64 << (dist % WORD_BITS);

                if self.words[word] & mask != 0 {
                    return false;
                }
                self.words[word] |= mask;
            }
        }

        true
    }
}

/// Fast check that the prefix (0, mark1, mark2) has three distinct pairwise
/// distances. Used to reject parallel search tasks in O(1) before paying for
/// the general check.
pub fn is_prefix3_valid(mark1: usize, mark2: usize) -> bool {
    if mark1 == 0 || mark2 <= mark1 {
        return false;
    }

    let d1 = mark1; // 0 to mark1
    let d2 = mark2 - mark1; // mark1 to mark2
    let d3 = mark2; // 0 to mark2

    d1 != d2 && d1 != d3 && d2 != d3
}
