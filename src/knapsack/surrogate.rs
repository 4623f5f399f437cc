//! Surrogate relaxation upper bound.
//!
//! The cardinality of an optimal solution is either at most or at least
//! the cardinality `k` of the break solution, so the optimum is bounded
//! by the worse of the two one-sided surrogate bounds. On each side the
//! multiplier folds the cardinality constraint into the weights
//! (`w + lambda`, capacity `c + lambda * k` on the "at most" side, signs
//! flipped on the other), and the relaxed problem is a plain fractional
//! knapsack. The multiplier minimizing a side is found by bisection,
//! steered by the cardinality of the relaxed solution.

use tracing::debug;

use super::instance::Instance;
use super::{Profit, Weight};

#[derive(Clone, Copy, Debug)]
pub struct SurrogateOut {
    /// Valid upper bound on the instance optimum.
    pub ub: Profit,
    /// Signed multiplier of the side attaining `ub`; feed it to
    /// `Instance::surrogate` together with `bound`.
    pub multiplier: Weight,
    /// Cardinality bound of that side.
    pub bound: i64,
}

/// Fractional optimum of the window items with `lambda` added to every
/// weight, against `capacity`. Returns the bound and the number of items
/// taken integrally.
fn relaxed_bound(items: &[(Weight, Profit)], lambda: Weight, capacity: Weight) -> (Profit, i64) {
    let mut taken_p: Profit = 0;
    let mut card: i64 = 0;
    let mut cap = capacity;
    let mut adj: Vec<(Weight, Profit)> = Vec::with_capacity(items.len());
    for &(w, p) in items {
        let w = w + lambda;
        if w <= 0 {
            // Free after adjustment; taking it only helps.
            taken_p += p;
            card += 1;
            cap -= w;
        } else {
            adj.push((w, p));
        }
    }
    adj.sort_by(|a, b| (b.1 * a.0).cmp(&(a.1 * b.0)));
    for &(w, p) in &adj {
        if w <= cap {
            cap -= w;
            taken_p += p;
            card += 1;
        } else {
            return (taken_p + (cap * p) / w, card);
        }
    }
    (taken_p, card)
}

/// Bisect the multiplier of one side towards the target cardinality,
/// returning the smallest bound seen and its multiplier. `sign` is +1 for
/// the "at most k" side and -1 for the "at least k" side.
fn minimize_side(
    items: &[(Weight, Profit)],
    capacity: Weight,
    target: i64,
    sign: Weight,
) -> (Profit, Weight) {
    let (mut best, mut best_lambda) = (relaxed_bound(items, 0, capacity), 0);
    let mut lo: Weight = 1;
    let mut hi: Weight = capacity.max(1);
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let lambda = sign * mid;
        let cap = capacity + lambda * target;
        let (ub, card) = relaxed_bound(items, lambda, cap);
        if ub < best.0 {
            best = (ub, card);
            best_lambda = lambda;
        }
        if card == target {
            break;
        }
        // More items taken than the target: strengthen the penalty.
        let too_many = card > target;
        if (sign > 0) == too_many {
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    (best.0, best_lambda)
}

/// Surrogate upper bound. Returns immediately when the plain fractional
/// bound already matches `lb`.
pub fn ub_surrogate(ins: &Instance, lb: Profit) -> SurrogateOut {
    let base_p = ins.reduced_solution().profit();
    let base_n = ins.reduced_solution().item_number() as i64;
    let capacity = ins.capacity();
    let items: Vec<(Weight, Profit)> = (ins.first_item()..=ins.last_item())
        .map(|pos| {
            let it = ins.item(pos);
            (it.w, it.p)
        })
        .collect();

    let (ub0, card0) = relaxed_bound(&items, 0, capacity);
    let k = card0 + base_n;
    let mut out = SurrogateOut {
        ub: base_p + ub0,
        multiplier: 0,
        bound: k,
    };
    if out.ub == lb || items.len() as i64 == card0 {
        return out;
    }

    let target = k - base_n;
    let (ub_le, lambda_le) = minimize_side(&items, capacity, target, 1);
    let (ub_ge, lambda_ge) = minimize_side(&items, capacity, target, -1);

    // The optimum lies on one of the two sides, so the worse side bound
    // is the valid combined bound.
    let (ub, multiplier) = if ub_le >= ub_ge {
        (ub_le, lambda_le)
    } else {
        (ub_ge, lambda_ge)
    };
    if base_p + ub < out.ub {
        out.ub = base_p + ub;
        out.multiplier = multiplier;
    }
    debug!(
        ub = out.ub,
        multiplier = out.multiplier,
        bound = out.bound,
        "surrogate bound"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::super::testing::{brute_force, random_instance};
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn surrogate_bound_is_valid_and_no_worse_than_dantzig() {
        for seed in 0..30 {
            let mut ins = random_instance(seed, 14, 60, 12, 20);
            let opt = brute_force(&ins);
            ins.sort_partially(super::super::instance::PARTIAL_SORT_LIMIT);
            let out = ub_surrogate(&ins, 0);
            assert!(out.ub >= opt, "seed {}: ub {} < opt {}", seed, out.ub, opt);
            let dantzig = super::super::bounds::ub_dantzig(&ins);
            assert!(out.ub <= dantzig, "seed {}", seed);
        }
    }

    #[test]
    fn surrogate_bound_on_ratio_bounded_items() {
        // Profits drawn so that p/w lies in [1, 2].
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut ins = Instance::new(500);
        for _ in 0..100 {
            let w: Weight = rng.gen_range(1..=10);
            let p: Profit = w + rng.gen_range(0..=w);
            ins.add_item(w, p).unwrap();
        }
        let reference = {
            use super::super::KnapsackSolver;
            let mut copy = ins.clone();
            let out = super::super::dp_bellman::BellmanSolver.solve(&mut copy);
            out.solution.profit()
        };
        ins.sort_partially(super::super::instance::PARTIAL_SORT_LIMIT);
        let out = ub_surrogate(&ins, 0);
        assert!(out.ub >= reference);
    }

    #[test]
    fn exact_bound_when_everything_fits() {
        let mut ins = Instance::new(1_000);
        ins.add_items(&[(2, 5), (3, 4), (4, 3)]).unwrap();
        ins.sort_partially(super::super::instance::PARTIAL_SORT_LIMIT);
        let out = ub_surrogate(&ins, 0);
        assert_eq!(out.ub, 12);
        assert_eq!(out.multiplier, 0);
    }
}
