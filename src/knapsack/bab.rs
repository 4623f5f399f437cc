//! Depth-first branch and bound over the efficiency-sorted window,
//! include-branch first, with the fractional bound of the remaining
//! items pruning whole subtrees. The traversal keeps an explicit stack
//! instead of recursing.

use tracing::debug;

use super::bounds::ub_dembo;
use super::instance::Instance;
use super::{ItemPos, KnapsackSolver, Method, SolveOutput};

pub struct BabSolver;

impl KnapsackSolver for BabSolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        ins.sort();
        if ins.break_item() == ins.last_item() + 1 {
            return SolveOutput {
                solution: ins.break_solution().clone(),
                proven_optimal: true,
            };
        }

        let f = ins.first_item();
        let l = ins.last_item();
        let c = ins.total_capacity();
        let mut best = ins.break_solution().clone();
        let mut current = ins.reduced_solution().clone();
        // Decision stack: (position, include branch still open).
        let mut stack: Vec<(ItemPos, bool)> = Vec::new();
        let mut node_number: u64 = 0;
        let mut pos = f;

        'explore: loop {
            if pos <= l {
                node_number += 1;
                let it = *ins.item(pos);
                let ub = ub_dembo(ins, pos, current.profit(), c - current.weight());
                if ub > best.profit() {
                    if current.weight() + it.w <= c {
                        stack.push((pos, true));
                        current.set(&it, true);
                    } else {
                        stack.push((pos, false));
                    }
                    pos += 1;
                    continue;
                }
                // The whole subtree is bounded out; evaluate and backtrack.
            }
            if current.profit() > best.profit() {
                best = current.clone();
            }
            loop {
                match stack.pop() {
                    Some((p, true)) => {
                        current.set(ins.item(p), false);
                        stack.push((p, false));
                        pos = p + 1;
                        continue 'explore;
                    }
                    Some((_, false)) => continue,
                    None => break 'explore,
                }
            }
        }
        debug!(nodes = node_number, profit = best.profit(), "search done");

        SolveOutput {
            solution: best,
            proven_optimal: true,
        }
    }

    fn method(&self) -> Method {
        Method::BabStar
    }
}

#[cfg(test)]
mod tests {
    use super::super::dp_bellman::BellmanSolver;
    use super::super::testing::{make_instance, random_instance};
    use super::*;

    #[test]
    fn small_scenarios() {
        let cases: &[(i64, &[(i64, i64)], i64)] = &[
            (5, &[(2, 3), (3, 4), (4, 5), (5, 6)], 7),
            (10, &[(5, 10), (4, 40), (6, 30)], 70),
            (7, &[(3, 3), (3, 3), (4, 4), (5, 5)], 7),
            (1, &[(2, 100)], 0),
        ];
        for &(c, items, expected) in cases {
            let mut ins = make_instance(c, items);
            let out = BabSolver.solve(&mut ins);
            assert_eq!(out.solution.profit(), expected);
            assert!(out.proven_optimal);
        }
    }

    #[test]
    fn matches_bellman_on_random_instances() {
        for seed in 0..25 {
            let mut ins = random_instance(seed, 30, 150, 18, 30);
            let reference = BellmanSolver.solve(&mut ins.clone()).solution.profit();
            let out = BabSolver.solve(&mut ins);
            assert_eq!(out.solution.profit(), reference, "seed {}", seed);
        }
    }
}
