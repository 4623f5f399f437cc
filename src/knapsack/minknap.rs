//! Expanding-core dynamic program (primal-dual scheme with a partial
//! solution window) and the solver pipeline driving it.
//!
//! The state list starts from the break solution and grows in both
//! directions: adding items to the right of the break item, removing
//! items on its left. States are kept sorted by weight and Pareto-pruned,
//! and every candidate state is cut against the Dembo bound of the next
//! item in its expansion direction. The sorted core is extended lazily
//! from the pending intervals of the partial sort, filtering items whose
//! bound cannot beat the running lower bound.
//!
//! Decisions are remembered in a sliding 64-bit window; once the
//! expansion is exhausted, the remembered window of the best state is
//! fixed into the instance and the shrunken instance is solved again with
//! the best profit as target, until everything is decided.

use std::sync::atomic::Ordering;

use tracing::{debug, info};

use super::bounds::{ub_dantzig, ub_dembo, ub_dembo_rev, ub_trivial};
use super::greedy::{sol_bestgreedynlogn, sol_greedy};
use super::instance::{Instance, PARTIAL_SORT_LIMIT};
use super::part_sol::{PartSol, PartSolFactory};
use super::solution::Solution;
use super::surrogate::ub_surrogate;
use super::{
    ItemPos, KnapsackSolver, Method, Profit, SolveOutput, StopSignal, UpperBound, Weight,
};

#[derive(Clone, Debug)]
pub struct MinknapParams {
    /// Width of the partial-solution window, at most 64.
    pub k: usize,
    pub upper_bound: UpperBound,
    /// 0: none, 1: Dembo bounds (partial sort is enough), 2: Dantzig
    /// bounds through the prefix sums (requires the full sort).
    pub reduction: u8,
    /// Solve the surrogate instance for a possibly better incumbent.
    pub surrogate: bool,
    /// Recursion depth at which the greedy lower bound is invoked;
    /// negative disables it.
    pub lb_greedy: i64,
    pub lb_greedynlogn: i64,
    pub stop: Option<StopSignal>,
}

impl Default for MinknapParams {
    fn default() -> Self {
        MinknapParams {
            k: 64,
            upper_bound: UpperBound::Dantzig,
            reduction: 0,
            surrogate: false,
            lb_greedy: 0,
            lb_greedynlogn: -1,
            stop: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct State {
    w: Weight,
    p: Profit,
    sol: PartSol,
}

struct MinknapData {
    l0: Vec<State>,
    s: ItemPos,
    t: ItemPos,
    lb: Profit,
    ub: Profit,
    best_state: State,
    psolf: PartSolFactory,
    state_number: u64,
}

impl MinknapData {
    /// Expand every state with the item at `t`: merge-walk the unchanged
    /// states and the shifted copies by weight, keeping the list Pareto
    /// efficient and cutting against the Dembo bounds.
    fn add_item(&mut self, ins: &Instance) {
        self.psolf.add_item(self.t);
        self.best_state.sol = self.psolf.remove(self.best_state.sol);
        let c = ins.total_capacity();
        let (wt, pt) = {
            let it = ins.item(self.t);
            (it.w, it.p)
        };
        let tx = if ins.int_right_size() > 0 && self.t == ins.last_sorted_item() {
            ins.last_item() + 1
        } else {
            self.t + 1
        };
        let sx = if ins.int_left_size() > 0 && self.s == ins.first_sorted_item() {
            ins.first_item() - 1
        } else {
            self.s
        };

        let len = self.l0.len();
        let mut l: Vec<State> = Vec::with_capacity(len + 1);
        let (mut it, mut it1) = (0usize, 0usize);
        while it < len || it1 < len {
            if it == len || (it1 < len && self.l0[it].w > self.l0[it1].w + wt) {
                let s1 = State {
                    w: self.l0[it1].w + wt,
                    p: self.l0[it1].p + pt,
                    sol: self.psolf.add(self.l0[it1].sol),
                };
                if l.last().map_or(true, |last| s1.p > last.p) {
                    if s1.w <= c && s1.p > self.lb {
                        self.lb = s1.p;
                        self.best_state = s1;
                        if self.lb == self.ub {
                            return;
                        }
                    }
                    if l.last().map_or(false, |last| s1.w == last.w) {
                        *l.last_mut().unwrap() = s1;
                    } else {
                        let ub = if s1.w <= c {
                            ub_dembo(ins, tx, s1.p, c - s1.w)
                        } else {
                            ub_dembo_rev(ins, sx, s1.p, c - s1.w)
                        };
                        if ub > self.lb {
                            l.push(s1);
                        }
                    }
                }
                it1 += 1;
            } else {
                let mut state = self.l0[it];
                state.sol = self.psolf.remove(state.sol);
                if l.last().map_or(true, |last| state.p > last.p) {
                    if l.last().map_or(false, |last| state.w == last.w) {
                        *l.last_mut().unwrap() = state;
                    } else {
                        let ub = if state.w <= c {
                            ub_dembo(ins, tx, state.p, c - state.w)
                        } else {
                            ub_dembo_rev(ins, sx, state.p, c - state.w)
                        };
                        if ub > self.lb {
                            l.push(state);
                        }
                    }
                }
                it += 1;
            }
        }
        self.l0 = l;
    }

    /// Mirror of `add_item`: expand every state by removing the item at
    /// `s` from the states that still carry it.
    fn remove_item(&mut self, ins: &Instance) {
        self.psolf.add_item(self.s);
        self.best_state.sol = self.psolf.add(self.best_state.sol);
        let c = ins.total_capacity();
        let (ws, ps) = {
            let it = ins.item(self.s);
            (it.w, it.p)
        };
        let tx = if ins.int_right_size() > 0 && self.t == ins.last_sorted_item() {
            ins.last_item() + 1
        } else {
            self.t
        };
        let sx = if ins.int_left_size() > 0 && self.s == ins.first_sorted_item() {
            ins.first_item() - 1
        } else {
            self.s - 1
        };

        let len = self.l0.len();
        let mut l: Vec<State> = Vec::with_capacity(len + 1);
        let (mut it, mut it1) = (0usize, 0usize);
        while it < len || it1 < len {
            if it1 == len || (it < len && self.l0[it].w <= self.l0[it1].w - ws) {
                let mut state = self.l0[it];
                state.sol = self.psolf.add(state.sol);
                if l.last().map_or(true, |last| state.p > last.p) {
                    if l.last().map_or(false, |last| state.w == last.w) {
                        *l.last_mut().unwrap() = state;
                    } else {
                        let ub = if state.w <= c {
                            ub_dembo(ins, tx, state.p, c - state.w)
                        } else {
                            ub_dembo_rev(ins, sx, state.p, c - state.w)
                        };
                        if ub > self.lb {
                            l.push(state);
                        }
                    }
                }
                it += 1;
            } else {
                let s1 = State {
                    w: self.l0[it1].w - ws,
                    p: self.l0[it1].p - ps,
                    sol: self.psolf.remove(self.l0[it1].sol),
                };
                if l.last().map_or(true, |last| s1.p > last.p) {
                    if s1.w <= c && s1.p > self.lb {
                        self.lb = s1.p;
                        self.best_state = s1;
                        if self.lb == self.ub {
                            return;
                        }
                    }
                    if l.last().map_or(false, |last| s1.w == last.w) {
                        *l.last_mut().unwrap() = s1;
                    } else {
                        let ub = if s1.w <= c {
                            ub_dembo(ins, tx, s1.p, c - s1.w)
                        } else {
                            ub_dembo_rev(ins, sx, s1.p, c - s1.w)
                        };
                        if ub > self.lb {
                            l.push(s1);
                        }
                    }
                }
                it1 += 1;
            }
        }
        self.l0 = l;
    }
}

struct PartOutput {
    sol: Solution,
    proven: bool,
}

/// One pass of the expanding-core recursion. `o`, when given, is the
/// profit of a solution known to exist in the instance; the pass then
/// looks for it with `lb = o - 1`. `lb_seed` seeds the lower bound with
/// an incumbent profit found outside this pass.
fn minknap_part(
    ins: &mut Instance,
    params: &mut MinknapParams,
    o: Option<Profit>,
    lb_seed: Profit,
    depth: u32,
) -> PartOutput {
    ins.sort_partially(PARTIAL_SORT_LIMIT);
    debug!(
        depth,
        n = ins.item_number(),
        f = ins.first_item(),
        l = ins.last_item(),
        target = o,
        "expanding-core pass"
    );

    if ins.break_item() == ins.last_item() + 1 {
        // Everything in the window fits.
        return PartOutput {
            sol: ins.break_solution().clone(),
            proven: true,
        };
    }

    if params.lb_greedynlogn > 0 {
        params.lb_greedynlogn -= 1;
    }
    if params.lb_greedy > 0 {
        params.lb_greedy -= 1;
    }
    let sol = if params.lb_greedynlogn == 0 {
        params.lb_greedynlogn = -1;
        sol_bestgreedynlogn(ins)
    } else if params.lb_greedy == 0 {
        params.lb_greedy = -1;
        sol_greedy(ins)
    } else {
        ins.break_solution().clone()
    };

    let c = ins.total_capacity();
    let n = ins.item_number();
    let mut lb = sol.profit().max(lb_seed);
    if let Some(o) = o {
        lb = lb.max(o - 1);
    }

    // Trivial cases.
    if n == 0 || c == 0 {
        let red = ins.reduced_solution();
        let best = if red.profit() > sol.profit() {
            red.clone()
        } else {
            sol
        };
        return PartOutput {
            sol: best,
            proven: true,
        };
    }
    if n == 1 {
        let mut sol1 = ins.reduced_solution().clone();
        let it = *ins.item(ins.first_item());
        if sol1.weight() + it.w <= c {
            sol1.set(&it, true);
        }
        let best = if sol1.profit() > sol.profit() { sol1 } else { sol };
        return PartOutput {
            sol: best,
            proven: true,
        };
    }

    let w_bar = ins.break_solution().weight();
    let p_bar = ins.break_solution().profit();
    let u = match o {
        Some(o) => o,
        None => match params.upper_bound {
            UpperBound::Dantzig => ub_dantzig(ins),
            UpperBound::Trivial => ub_trivial(ins),
        },
    };
    if sol.profit() == u {
        return PartOutput { sol, proven: true };
    }

    let root = State {
        w: w_bar,
        p: p_bar,
        sol: 0,
    };
    let mut d = MinknapData {
        l0: vec![root],
        s: ins.break_item() - 1,
        t: ins.break_item(),
        lb,
        ub: u,
        best_state: root,
        psolf: PartSolFactory::new(params.k),
        state_number: 1,
    };

    let mut cancelled = false;
    while !d.l0.is_empty() {
        if params
            .stop
            .as_ref()
            .map_or(false, |s| s.load(Ordering::Relaxed))
        {
            cancelled = true;
            break;
        }
        let can_right = ins.int_right_size() > 0 || d.t <= ins.last_sorted_item();
        let can_left = ins.int_left_size() > 0 || d.s >= ins.first_sorted_item();
        if !can_right && !can_left {
            break;
        }

        if ins.int_right_size() > 0 && d.t + 1 > ins.last_sorted_item() {
            ins.sort_right(d.lb);
        }
        if d.t <= ins.last_sorted_item() {
            d.add_item(ins);
            d.state_number += d.l0.len() as u64;
            d.t += 1;
        }
        if d.lb == d.ub {
            break;
        }

        if ins.int_left_size() > 0 && d.s - 1 < ins.first_sorted_item() {
            ins.sort_left(d.lb);
        }
        if d.s >= ins.first_sorted_item() {
            d.remove_item(ins);
            d.state_number += d.l0.len() as u64;
            d.s -= 1;
        }
        if d.lb == d.ub {
            break;
        }
    }
    debug!(depth, states = d.state_number, lb = d.lb, "expansion done");

    if cancelled {
        // The decisions behind the running lower bound are not all
        // materialized; fall back to the best complete solution.
        return PartOutput { sol, proven: false };
    }

    if d.best_state.p <= sol.profit() {
        return PartOutput { sol, proven: true };
    }

    // Fix everything that was never touched or is still remembered, and
    // re-solve the rest with the best profit as target.
    ins.set_first_item(d.s + 1);
    ins.set_last_item(d.t - 1);
    ins.fix(&d.psolf, d.best_state.sol);
    minknap_part(ins, params, Some(d.best_state.p), 0, depth + 1)
}

/// Full solver pipeline: partial sort, warm lower bound, surrogate upper
/// bound, optional surrogate-instance solve, optional variable reduction,
/// then the expanding-core recursion.
pub fn minknap(ins: &mut Instance, params: MinknapParams) -> SolveOutput {
    let mut params = params;
    info!(
        n = ins.total_item_number(),
        c = ins.total_capacity(),
        "minknap"
    );

    if params.reduction == 2 {
        ins.sort();
    } else {
        ins.sort_partially(PARTIAL_SORT_LIMIT);
    }

    let mut incumbent = if params.lb_greedynlogn == 0 {
        params.lb_greedynlogn = -1;
        sol_bestgreedynlogn(ins)
    } else if params.lb_greedy == 0 {
        params.lb_greedy = -1;
        sol_greedy(ins)
    } else {
        ins.break_solution().clone()
    };

    let surout = ub_surrogate(ins, incumbent.profit());
    info!(lb = incumbent.profit(), ub = surout.ub, "initial bounds");
    if incumbent.profit() == surout.ub {
        return SolveOutput {
            solution: incumbent,
            proven_optimal: true,
        };
    }

    if params.surrogate && surout.multiplier != 0 {
        let mut sur = ins.clone();
        sur.surrogate(surout.multiplier, surout.bound);
        let sur_params = MinknapParams {
            surrogate: false,
            stop: params.stop.clone(),
            ..params.clone()
        };
        let sur_out = minknap(&mut sur, sur_params);
        if sur_out.solution.item_number() as i64 == surout.bound {
            // With the cardinality bound met, the surrogate solution is
            // feasible under the original weights.
            let mut adopted = Solution::new(ins.total_item_number());
            for pos in 0..ins.total_item_number() as ItemPos {
                let it = ins.item(pos);
                if sur_out.solution.contains(it.j) {
                    adopted.set(it, true);
                }
            }
            debug!(
                profit = adopted.profit(),
                weight = adopted.weight(),
                "surrogate instance solved"
            );
            if adopted.weight() <= ins.total_capacity() && adopted.profit() > incumbent.profit() {
                incumbent = adopted;
                if incumbent.profit() == surout.ub {
                    return SolveOutput {
                        solution: incumbent,
                        proven_optimal: true,
                    };
                }
            }
        }
    }

    if ins.break_item() <= ins.last_item() {
        let reduced_to_optimal = match params.reduction {
            1 => ins.reduce1(incumbent.profit()),
            2 => ins.reduce2(incumbent.profit()),
            _ => false,
        };
        if reduced_to_optimal {
            return SolveOutput {
                solution: incumbent,
                proven_optimal: true,
            };
        }
    }

    let out = minknap_part(ins, &mut params, None, incumbent.profit(), 0);
    let solution = if out.sol.profit() >= incumbent.profit() {
        out.sol
    } else {
        incumbent
    };
    SolveOutput {
        solution,
        proven_optimal: out.proven,
    }
}

#[derive(Default)]
pub struct MinknapSolver {
    pub params: MinknapParams,
}

impl MinknapSolver {
    pub fn new(params: MinknapParams) -> Self {
        MinknapSolver { params }
    }
}

impl KnapsackSolver for MinknapSolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        minknap(ins, self.params.clone())
    }

    fn method(&self) -> Method {
        Method::DpMinknap
    }
}

#[cfg(test)]
mod tests {
    use super::super::dp_bellman::BellmanSolver;
    use super::super::testing::{make_instance, random_instance};
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn solve_default(ins: &mut Instance) -> SolveOutput {
        minknap(ins, MinknapParams::default())
    }

    #[test]
    fn two_light_items_beat_the_heavy_ones() {
        let mut ins = make_instance(5, &[(2, 3), (3, 4), (4, 5), (5, 6)]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 7);
        assert!(out.proven_optimal);
        assert!(out.solution.contains(0) && out.solution.contains(1));
    }

    #[test]
    fn break_solution_is_already_optimal() {
        let mut ins = make_instance(10, &[(5, 10), (4, 40), (6, 30)]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 70);
        assert!(out.proven_optimal);
    }

    #[test]
    fn infeasible_item_yields_the_empty_solution() {
        let mut ins = make_instance(1, &[(2, 100)]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 0);
        assert_eq!(out.solution.item_number(), 0);
        assert!(out.proven_optimal);
    }

    #[test]
    fn subset_sum_fills_the_capacity() {
        let mut ins = make_instance(7, &[(3, 3), (3, 3), (4, 4), (5, 5)]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 7);
        assert!(out.proven_optimal);
    }

    #[test]
    fn empty_instance() {
        let mut ins = Instance::new(10);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 0);
        assert!(out.proven_optimal);
    }

    #[test]
    fn zero_capacity() {
        let mut ins = make_instance(0, &[(1, 10), (2, 20)]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 0);
        assert!(out.proven_optimal);
    }

    #[test]
    fn identical_items() {
        // Five copies of (3, 7) with capacity 10: three fit.
        let mut ins = make_instance(10, &[(3, 7); 5]);
        let out = solve_default(&mut ins);
        assert_eq!(out.solution.profit(), 21);
        assert!(out.proven_optimal);
    }

    #[test]
    fn matches_bellman_on_random_instances() {
        for seed in 0..40 {
            let mut ins = random_instance(seed, 50, 250, 25, 40);
            let reference = BellmanSolver.solve(&mut ins.clone()).solution.profit();
            let out = solve_default(&mut ins);
            assert_eq!(out.solution.profit(), reference, "seed {}", seed);
            assert!(out.proven_optimal, "seed {}", seed);
            assert!(out.solution.weight() <= ins.total_capacity());
        }
    }

    #[test]
    fn narrow_window_exercises_the_recursion() {
        for seed in 40..70 {
            let mut ins = random_instance(seed, 60, 300, 20, 35);
            let reference = BellmanSolver.solve(&mut ins.clone()).solution.profit();
            let params = MinknapParams {
                k: 2,
                ..MinknapParams::default()
            };
            let out = minknap(&mut ins, params);
            assert_eq!(out.solution.profit(), reference, "seed {}", seed);
        }
    }

    #[test]
    fn reductions_and_surrogate_do_not_change_the_optimum() {
        for seed in 70..90 {
            let mut reference_ins = random_instance(seed, 50, 250, 25, 40);
            let reference = BellmanSolver
                .solve(&mut reference_ins)
                .solution
                .profit();
            for reduction in [1u8, 2u8] {
                let mut ins = random_instance(seed, 50, 250, 25, 40);
                let params = MinknapParams {
                    reduction,
                    surrogate: true,
                    lb_greedynlogn: if reduction == 2 { 0 } else { -1 },
                    ..MinknapParams::default()
                };
                let out = minknap(&mut ins, params);
                assert_eq!(
                    out.solution.profit(),
                    reference,
                    "seed {} reduction {}",
                    seed,
                    reduction
                );
            }
        }
    }

    #[test]
    fn solution_profit_matches_its_items() {
        let mut ins = random_instance(123, 80, 400, 30, 50);
        let out = solve_default(&mut ins);
        let mut p = 0;
        let mut w = 0;
        for pos in 0..ins.total_item_number() as ItemPos {
            let it = ins.item(pos);
            if out.solution.contains(it.j) {
                p += it.p;
                w += it.w;
            }
        }
        assert_eq!(p, out.solution.profit());
        assert_eq!(w, out.solution.weight());
        assert!(w <= ins.total_capacity());
    }

    #[test]
    fn cancellation_returns_a_feasible_solution() {
        // Greedy finds 5 here while the optimum is 6, so the solve cannot
        // short-circuit before reaching the expansion loop.
        let stop = Arc::new(AtomicBool::new(true));
        let mut ins = make_instance(6, &[(4, 5), (3, 3), (3, 3)]);
        let params = MinknapParams {
            stop: Some(stop),
            ..MinknapParams::default()
        };
        let out = minknap(&mut ins, params);
        assert!(!out.proven_optimal);
        assert_eq!(out.solution.profit(), 5);
        assert!(out.solution.weight() <= ins.total_capacity());
    }
}
