//! Classic Bellman dynamic program over capacities, with solution
//! recovery by walking the table backwards. Exact, needs no sorting, and
//! allocates the full (n x C) table, so it is the reference algorithm for
//! small capacities.

use ndarray::Array2;
use tracing::debug;

use super::instance::Instance;
use super::solution::Solution;
use super::{ItemPos, KnapsackSolver, Method, Profit, SolveOutput};

pub struct BellmanSolver;

impl KnapsackSolver for BellmanSolver {
    fn solve(&self, ins: &mut Instance) -> SolveOutput {
        let c = ins.capacity().max(0) as usize;
        let n = ins.item_number();
        let mut sol: Solution = ins.reduced_solution().clone();
        if n == 0 || c == 0 {
            return SolveOutput {
                solution: sol,
                proven_optimal: true,
            };
        }

        let item_at = |i: usize| *ins.item(ins.first_item() + i as ItemPos);

        let mut table = Array2::<Profit>::zeros((n, c + 1));
        let first = item_at(0);
        if first.w as usize <= c {
            for d in first.w as usize..=c {
                table[[0, d]] = first.p;
            }
        }
        for i in 1..n {
            let it = item_at(i);
            for d in 0..=c {
                let mut best = table[[i - 1, d]];
                if it.w as usize <= d {
                    best = best.max(table[[i - 1, d - it.w as usize]] + it.p);
                }
                table[[i, d]] = best;
            }
        }
        debug!(profit = table[[n - 1, c]], "bellman table filled");

        let mut d = c;
        for i in (1..n).rev() {
            if table[[i, d]] != table[[i - 1, d]] {
                let it = item_at(i);
                sol.set(&it, true);
                d -= it.w as usize;
            }
        }
        if table[[0, d]] > 0 {
            sol.set(&first, true);
        }

        SolveOutput {
            solution: sol,
            proven_optimal: true,
        }
    }

    fn method(&self) -> Method {
        Method::DpBellman
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{brute_force, make_instance, random_instance};
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
            let out = BellmanSolver.solve(&mut ins);
            assert_eq!(out.solution.profit(), expected);
            assert!(out.proven_optimal);
            assert!(out.solution.weight() <= c);
        }
    }

    #[test]
    fn matches_brute_force() {
        for seed in 0..30 {
            let mut ins = random_instance(seed, 14, 50, 12, 25);
            let expected = brute_force(&ins);
            let out = BellmanSolver.solve(&mut ins);
            assert_eq!(out.solution.profit(), expected, "seed {}", seed);
        }
    }

    #[test]
    fn recovered_items_sum_to_the_profit() {
        let mut ins = random_instance(99, 25, 120, 15, 30);
        let out = BellmanSolver.solve(&mut ins);
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
        assert!(w <= ins.total_capacity());
    }
}
