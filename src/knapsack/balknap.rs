//! Balanced primal-dual dynamic program.
//!
//! Works on a fully sorted instance: starting from the break solution,
//! items after the break are tentatively added and items before it
//! tentatively removed, one position per step, over a weight-sorted,
//! Pareto-pruned state list. Unlike the expanding-core solver this one
//! sorts everything up front and remembers the complete decision trail of
//! every state through chained 64-bit fragments, so no re-solve pass is
//! needed for reconstruction.

use tracing::debug;

use super::bounds::{ub_dembo, ub_dembo_rev};
use super::instance::Instance;
use super::sol_tree::{SolutionFragment, SolutionTree};
use super::solution::Solution;
use super::{ItemPos, KnapsackSolver, Method, Profit, SolveOutput, Weight};

#[derive(Clone, Copy)]
struct BalknapState {
    weight: Weight,
    profit: Profit,
    fragment: SolutionFragment,
}

struct Balknap<'a> {
    ins: &'a Instance,
    s: ItemPos,
    t: ItemPos,
    lb: Profit,
    /// States heavier than this can never come back under capacity on a
    /// path towards a feasible solution, since the additions of such a
    /// path weigh at most the capacity on top of the break weight.
    max_weight: Weight,
    traversal: Vec<ItemPos>,
    best_step: usize,
    best_fragment: SolutionFragment,
    tree: SolutionTree,
}

impl<'a> Balknap<'a> {
    fn new(ins: &'a Instance) -> Self {
        let b = ins.break_item();
        Balknap {
            ins,
            s: b,
            t: b - 1,
            lb: ins.break_solution().profit(),
            max_weight: ins.total_capacity() + ins.break_solution().weight(),
            traversal: Vec::new(),
            best_step: 0,
            best_fragment: SolutionFragment::default(),
            tree: SolutionTree::new(),
        }
    }

    fn upper_bound(&self, state: &BalknapState) -> Profit {
        let c = self.ins.total_capacity();
        if state.weight <= c {
            ub_dembo(self.ins, self.t + 1, state.profit, c - state.weight)
        } else {
            ub_dembo_rev(self.ins, self.s - 1, state.profit, c - state.weight)
        }
    }

    fn try_update_best(&mut self, state: &BalknapState) {
        if state.weight <= self.ins.total_capacity() && state.profit > self.lb {
            self.lb = state.profit;
            self.best_step = self.traversal.len() - 1;
            self.best_fragment = state.fragment;
        }
    }

    fn push_or_overwrite(next: &mut Vec<BalknapState>, state: BalknapState) {
        match next.last_mut() {
            Some(last) if last.weight == state.weight => *last = state,
            _ => next.push(state),
        }
    }

    /// Expand with the item at `t`: each state either takes it or stays.
    /// The two walks are merged by weight so `next` stays sorted with
    /// strictly increasing profits.
    fn explore_item_t(&mut self, current: &[BalknapState], next: &mut Vec<BalknapState>) {
        self.traversal.push(self.t);
        let item = *self.ins.item(self.t);
        let n = current.len();
        let (mut take_i, mut keep_i) = (0usize, 0usize);
        while take_i < n || keep_i < n {
            if keep_i >= n
                || (take_i < n && current[keep_i].weight > current[take_i].weight + item.w)
            {
                let mut state = current[take_i];
                take_i += 1;
                state.weight += item.w;
                state.profit += item.p;
                if state.weight > self.max_weight {
                    continue;
                }
                if next.last().map_or(false, |last| last.profit >= state.profit) {
                    continue;
                }
                if self.upper_bound(&state) <= self.lb {
                    continue;
                }
                state.fragment.push_decision(true);
                self.try_update_best(&state);
                Self::push_or_overwrite(next, state);
            } else {
                let mut state = current[keep_i];
                keep_i += 1;
                if next.last().map_or(false, |last| last.profit >= state.profit) {
                    continue;
                }
                if self.upper_bound(&state) <= self.lb {
                    continue;
                }
                state.fragment.push_decision(false);
                Self::push_or_overwrite(next, state);
            }
        }
    }

    /// Mirror step for the item at `s`: each state that still carries it
    /// may drop it.
    fn explore_item_s(&mut self, current: &[BalknapState], next: &mut Vec<BalknapState>) {
        self.traversal.push(self.s);
        let item = *self.ins.item(self.s);
        let n = current.len();
        let (mut drop_i, mut keep_i) = (0usize, 0usize);
        while drop_i < n || keep_i < n {
            if drop_i >= n
                || (keep_i < n && current[keep_i].weight <= current[drop_i].weight - item.w)
            {
                let mut state = current[keep_i];
                keep_i += 1;
                if next.last().map_or(false, |last| last.profit >= state.profit) {
                    continue;
                }
                if self.upper_bound(&state) <= self.lb {
                    continue;
                }
                state.fragment.push_decision(false);
                Self::push_or_overwrite(next, state);
            } else {
                let mut state = current[drop_i];
                drop_i += 1;
                state.weight -= item.w;
                state.profit -= item.p;
                if next.last().map_or(false, |last| last.profit >= state.profit) {
                    continue;
                }
                if self.upper_bound(&state) <= self.lb {
                    continue;
                }
                state.fragment.push_decision(true);
                self.try_update_best(&state);
                Self::push_or_overwrite(next, state);
            }
        }
    }

    /// Spill the fragment word of every live state into the arena once 64
    /// decisions have accumulated.
    fn update_history(&mut self, states: &mut [BalknapState]) {
        if !self.traversal.is_empty() && self.traversal.len() % 64 == 0 {
            for state in states.iter_mut() {
                let idx = self.tree.push(state.fragment);
                state.fragment.spill(idx);
            }
            // The best fragment is a snapshot taken at `best_step`; the
            // reconstruction walks it from that step, so it must keep its
            // word as it was.
        }
    }

    /// Walk the decision trail of the best state backwards and patch the
    /// break solution: a set bit before the break removes the item, a set
    /// bit from the break onwards adds it.
    fn reconstruct(&self) -> Solution {
        let mut sol = self.ins.break_solution().clone();
        if self.traversal.is_empty() {
            return sol;
        }
        let b = self.ins.break_item();
        let mut step = self.best_step;
        let mut fragment = self.best_fragment;
        loop {
            let in_fragment = step % 64 + 1;
            for i in 0..in_fragment {
                if !fragment.decision(i) {
                    continue;
                }
                let pos = self.traversal[step - i];
                let item = *self.ins.item(pos);
                sol.set(&item, pos >= b);
            }
            match fragment.parent() {
                Some(idx) => {
                    fragment = *self.tree.get(idx).expect("fragment chain broken");
                    step -= in_fragment;
                }
                None => break,
            }
        }
        sol
    }

    fn run(&mut self) -> Solution {
        let f = self.ins.first_item();
        let l = self.ins.last_item();
        let mut current = vec![BalknapState {
            weight: self.ins.break_solution().weight(),
            profit: self.ins.break_solution().profit(),
            fragment: SolutionFragment::default(),
        }];
        let mut next: Vec<BalknapState> = Vec::new();

        loop {
            let mut progressed = false;
            if !current.is_empty() && self.t + 1 <= l {
                self.t += 1;
                self.explore_item_t(&current, &mut next);
                current.clear();
                std::mem::swap(&mut current, &mut next);
                self.update_history(&mut current);
                progressed = true;
            }
            if !current.is_empty() && self.s - 1 >= f {
                self.s -= 1;
                self.explore_item_s(&current, &mut next);
                current.clear();
                std::mem::swap(&mut current, &mut next);
                self.update_history(&mut current);
                progressed = true;
            }
            if current.is_empty() || !progressed {
                break;
            }
        }
        debug!(
            lb = self.lb,
            steps = self.traversal.len(),
            fragments = self.tree.len(),
            "balanced expansion done"
        );
        self.reconstruct()
    }
}

pub struct BalknapSolver;

impl KnapsackSolver for BalknapSolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        ins.sort();
        if ins.break_item() == ins.last_item() + 1 {
            return SolveOutput {
                solution: ins.break_solution().clone(),
                proven_optimal: true,
            };
        }
        let solution = Balknap::new(ins).run();
        SolveOutput {
            solution,
            proven_optimal: true,
        }
    }

    fn method(&self) -> Method {
        Method::DpBalknap
    }
}
