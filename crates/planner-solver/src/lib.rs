mod problem;
mod solver;
mod solution;

pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, Sense, Variable};
pub use solver::{LpSolver, Solver};
pub use solution::{Analysis, ShadowPrice, Solution, SolutionStatus};
