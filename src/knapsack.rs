pub mod bab;
pub mod balknap;
pub mod bounds;
pub mod dp_bellman;
pub mod generate;
pub mod greedy;
pub mod instance;
pub mod io;
pub mod minknap;
pub mod part_sol;
pub mod sol_tree;
pub mod solution;
pub mod surrogate;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use strum_macros::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

use self::instance::Instance;
use self::solution::Solution;

/// Item weight. All arithmetic is done in signed 64-bit integers; callers
/// must ensure that N·max(p) and C·max(p)/min(w) fit in an i64.
pub type Weight = i64;
/// Item profit.
pub type Profit = i64;
/// Stable index of an item, assigned at insertion and never changed.
pub type ItemIdx = usize;
/// Position of an item in the (permuted) item vector of an instance.
pub type ItemPos = isize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    /// Original index, 0 <= j < n, unique per item.
    pub j: ItemIdx,
    /// Weight, w > 0.
    pub w: Weight,
    /// Profit, p >= 0.
    pub p: Profit,
}

impl Item {
    /// Efficiency comparison p1/w1 > p2/w2, cross-multiplied to stay in
    /// integer arithmetic.
    pub fn is_more_efficient_than(&self, other: &Item) -> bool {
        self.p * other.w > other.p * self.w
    }
}

#[derive(Error, Debug)]
pub enum KnapsackError {
    #[error("malformed input: {0}")]
    InputMalformed(String),
    #[error("invalid item weight")]
    InvalidItemWeight,
    #[error("invalid item profit")]
    InvalidItemProfit,
    #[error("item count mismatch: expected {expected}, found {found}")]
    ItemCountMismatch { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] text_io::Error),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, IntoStaticStr, clap::ValueEnum,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Method {
    Greedy,
    #[value(name = "greedynlogn")]
    #[strum(serialize = "greedynlogn")]
    GreedyNlogn,
    DpBellman,
    DpBalknap,
    DpMinknap,
    BabStar,
}

/// Upper bound used by the core solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, clap::ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum UpperBound {
    Dantzig,
    Trivial,
}

#[derive(Debug)]
pub struct SolveOutput {
    pub solution: Solution,
    /// False when the solver was cancelled before proving optimality, or
    /// when the algorithm is a heuristic.
    pub proven_optimal: bool,
}

pub trait KnapsackSolver {
    /// Solve the instance. The instance is mutated in place (sorted,
    /// reduced); callers that need it untouched should pass a clone.
    fn solve(&self, ins: &mut Instance) -> SolveOutput;

    fn method(&self) -> Method;
}

/// Caller-supplied cooperative cancellation signal, checked at the top of
/// every expansion iteration of the core solver.
pub type StopSignal = Arc<AtomicBool>;

#[cfg(test)]
pub(crate) mod testing {
    use super::instance::Instance;
    use super::{Profit, Weight};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    pub fn make_instance(c: Weight, wp: &[(Weight, Profit)]) -> Instance {
        let mut ins = Instance::new(c);
        for &(w, p) in wp {
            ins.add_item(w, p).unwrap();
        }
        ins
    }

    /// Seeded random instance with weights in [1, w_max] and profits in
    /// [1, p_max].
    pub fn random_instance(seed: u64, n: usize, c: Weight, w_max: Weight, p_max: Profit) -> Instance {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ins = Instance::new(c);
        for _ in 0..n {
            let w = rng.gen_range(1..=w_max);
            let p = rng.gen_range(1..=p_max);
            ins.add_item(w, p).unwrap();
        }
        ins
    }

    /// Exhaustive reference optimum, usable for n <= 20.
    pub fn brute_force(ins: &Instance) -> Profit {
        let n = ins.total_item_number();
        assert!(n <= 20);
        let mut best = 0;
        for mask in 0u32..(1 << n) {
            let mut w = 0;
            let mut p = 0;
            for pos in 0..n {
                if mask & (1 << pos) != 0 {
                    let it = ins.item(pos as super::ItemPos);
                    w += it.w;
                    p += it.p;
                }
            }
            if w <= ins.total_capacity() && p > best {
                best = p;
            }
        }
        best
    }
}
