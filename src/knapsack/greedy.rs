//! Greedy lower bounds used to warm-start the exact solvers, also
//! exposed as standalone algorithms.

use tracing::debug;

use super::bounds::ub_dantzig;
use super::instance::{Instance, PARTIAL_SORT_LIMIT};
use super::solution::Solution;
use super::{ItemPos, KnapsackSolver, Method, Profit, SolveOutput};

/// Break solution improved by the best of a single forward insertion
/// (one item added after the break) or backward exchange (the break item
/// traded against one prefix item). Needs the break item only.
pub fn sol_greedy(ins: &Instance) -> Solution {
    debug_assert!(ins.break_item_found());
    let mut sol = ins.break_solution().clone();
    let b = ins.break_item();
    if b > ins.last_item() {
        return sol;
    }

    let mut gain: Profit = 0;
    let mut chosen: Option<ItemPos> = None;

    // Backward: remove one prefix item so that the break item fits.
    let rb = ins.break_capacity() - ins.item(b).w;
    for k in ins.first_item()..=b {
        if rb + ins.item(k).w >= 0 && ins.item(b).p - ins.item(k).p > gain {
            gain = ins.item(b).p - ins.item(k).p;
            chosen = Some(k);
        }
    }

    // Forward: add one item beyond the break.
    let rf = ins.break_capacity();
    for k in b + 1..=ins.last_item() {
        if ins.item(k).w <= rf && ins.item(k).p > gain {
            gain = ins.item(k).p;
            chosen = Some(k);
        }
    }

    match chosen {
        Some(k) if k <= b => {
            sol.set(ins.item(b), true);
            sol.set(ins.item(k), false);
        }
        Some(k) => sol.set(ins.item(k), true),
        None => {}
    }
    debug!(profit = sol.profit(), "greedy lower bound");
    sol
}

/// Full-sort greedy: sweep every item past the break in efficiency order
/// and take whatever still fits, then try the exchange step on top.
pub fn sol_bestgreedynlogn(ins: &mut Instance) -> Solution {
    ins.sort();
    let mut sol = ins.break_solution().clone();
    let mut r = ins.break_capacity();
    for k in ins.break_item()..=ins.last_item() {
        let it = *ins.item(k);
        if it.w <= r {
            sol.set(&it, true);
            r -= it.w;
        }
    }
    let swap = sol_greedy(ins);
    if swap.profit() > sol.profit() {
        sol = swap;
    }
    debug!(profit = sol.profit(), "greedy nlogn lower bound");
    sol
}

pub struct GreedySolver;

impl KnapsackSolver for GreedySolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        ins.sort_partially(PARTIAL_SORT_LIMIT);
        let solution = sol_greedy(ins);
        let proven_optimal = solution.profit() == ub_dantzig(ins);
        SolveOutput {
            solution,
            proven_optimal,
        }
    }

    fn method(&self) -> Method {
        Method::Greedy
    }
}

pub struct GreedyNlognSolver;

impl KnapsackSolver for GreedyNlognSolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        let solution = sol_bestgreedynlogn(ins);
        let proven_optimal = solution.profit() == ub_dantzig(ins);
        SolveOutput {
            solution,
            proven_optimal,
        }
    }

    fn method(&self) -> Method {
        Method::GreedyNlogn
    }
}
