pub mod knapsack;

pub use knapsack::bab::BabSolver;
pub use knapsack::balknap::BalknapSolver;
pub use knapsack::dp_bellman::BellmanSolver;
pub use knapsack::greedy::{GreedyNlognSolver, GreedySolver};
pub use knapsack::instance::Instance;
pub use knapsack::minknap::{minknap, MinknapParams, MinknapSolver};
pub use knapsack::solution::Solution;
pub use knapsack::surrogate::ub_surrogate;
pub use knapsack::*;
