/*!
Configuration of an analysis.

All resource control is by the two clause bounds: there are no timeouts in the contract.
Clauses past a bound are silently discarded, which preserves soundness at the price of precision.
*/

use std::fmt;

/// A clause bound: a finite limit, or no limit at all.
///
/// The unbounded case is a proper sentinel rather than a large integer, so arithmetic on bounds cannot overflow into nonsense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// At most the given value.
    Finite(u32),

    /// No limit.
    Unbounded,
}

impl Bound {
    /// Whether a measured value is within the bound.
    pub fn admits(self, value: u32) -> bool {
        match self {
            Bound::Finite(limit) => value <= limit,
            Bound::Unbounded => true,
        }
    }

    /// Whether the bound is finite.
    pub fn is_finite(self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    /// The CLI encoding: `-1` is unbounded, any other value is a finite limit.
    pub fn from_cli(value: i64) -> Bound {
        if value < 0 {
            Bound::Unbounded
        } else {
            Bound::Finite(value as u32)
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Finite(limit) => write!(f, "{limit}"),
            Bound::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// The transfer strategy for assignments through a memory dereference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DerefUpdate {
    /// The two-case expansion: every cell either kept its value or is the written address.
    ///
    /// Sound without any aliasing information.
    #[default]
    Weak,

    /// Only facts about the written cell are invalidated.
    ///
    /// Assumes distinct symbolic addresses do not alias, which holds when every address in the state was produced by a fresh-allocation transformer.
    Strong,
}

/// The primary configuration structure.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// The maximum number of literals a derived or merged clause may have.
    pub max_clause_size: Bound,

    /// The maximum rank a derived or merged clause may have.
    pub max_clause_rank: Bound,

    /// Permit redundancy elimination against the solver during saturation.
    pub prune_redundant: bool,

    /// How many admitted clauses accumulate between redundancy eliminations.
    pub prune_threshold: usize,

    /// Defer states flowing along back-edges onto the delayed worklist, re-merging them with the coarser join once the main worklist drains.
    pub defer_back_edges: bool,

    /// The transfer strategy for stores through a dereference.
    pub deref_update: DerefUpdate,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_clause_size: Bound::Finite(3),
            max_clause_rank: Bound::Finite(10),
            prune_redundant: false,
            prune_threshold: 100,
            defer_back_edges: false,
            deref_update: DerefUpdate::default(),
        }
    }
}
