use log::{debug, warn};
use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::problem::{ConstraintOp, LpProblem, Sense};
use crate::solution::{Analysis, ShadowPrice, Solution, SolutionStatus};

/// Anything that can solve a linear program.
///
/// Model builders depend on this trait only, so the algorithm behind it can be
/// swapped without touching the formulation.
pub trait LpSolver {
    fn solve(&self, problem: &LpProblem) -> Solution;
}

/// Sparse revised simplex from `microlp`.
///
/// Shadow prices come from a second solve of the dual program.
pub struct Solver {
    /// Values closer to zero than this are reported as zero, and inequalities
    /// with less slack than this count as binding
    tolerance: f64,
    /// Whether to solve the dual program for shadow prices
    dual_analysis: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            dual_analysis: true,
        }
    }
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

/// A row in `A x (op) b` form with merged terms. Finite variable bounds
/// other than `x >= 0` follow the problem's own constraints as extra rows.
struct Row {
    terms: Vec<(usize, f64)>,
    op: ConstraintOp,
    rhs: f64,
}

struct StandardForm {
    rows: Vec<Row>,
    /// Dense objective coefficients, in the problem's own sense
    costs: Vec<f64>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Skip the dual solve; solutions then carry no shadow prices
    pub fn with_dual_analysis(mut self, enabled: bool) -> Self {
        self.dual_analysis = enabled;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let form = match standard_form(problem) {
            Ok(form) => form,
            Err(reason) => {
                warn!("rejecting problem: {}", reason);
                return Solution::other();
            }
        };
        if problem.variables.iter().any(|v| v.lower > v.upper) {
            return Solution::infeasible();
        }
        debug!(
            "solving {} variables, {} constraints, {} bound rows",
            problem.num_variables(),
            problem.num_constraints(),
            form.rows.len() - problem.num_constraints()
        );

        let values = match self.solve_primal(problem, &form) {
            Ok(values) => values,
            Err(microlp::Error::Infeasible) => return Solution::infeasible(),
            Err(microlp::Error::Unbounded) => return Solution::unbounded(),
            Err(e) => {
                warn!("solver failed: {}", e);
                return Solution::other();
            }
        };
        let objective_value = problem.objective_value(&values);
        debug!("primal optimum {}", objective_value);

        let shadow_prices = if self.dual_analysis {
            match self.solve_dual(problem, &form) {
                Some(duals) => problem
                    .constraints
                    .iter()
                    .zip(duals)
                    .map(|(c, value)| ShadowPrice {
                        constraint: c.name.clone(),
                        value,
                    })
                    .collect(),
                None => {
                    warn!("dual solve failed, no shadow prices");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let binding_constraints = problem
            .constraints
            .iter()
            .filter(|c| c.op != ConstraintOp::Eq)
            .filter(|c| (c.lhs(&values) - c.rhs).abs() <= self.tolerance)
            .map(|c| c.name.clone())
            .collect();

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            analysis: Analysis {
                shadow_prices,
                binding_constraints,
            },
        }
    }

    fn solve_primal(&self, problem: &LpProblem, form: &StandardForm) -> Result<Vec<f64>, microlp::Error> {
        let direction = match problem.objective.sense {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = Problem::new(direction);
        let vars: Vec<_> = problem
            .variables
            .iter()
            .zip(&form.costs)
            .map(|(v, &cost)| lp.add_var(cost, (v.lower, v.upper)))
            .collect();

        // bounds go to the solver directly, only the problem's own rows are added
        for row in &form.rows[..problem.num_constraints()] {
            lp.add_constraint(
                row.terms.iter().map(|&(j, coef)| (vars[j], coef)),
                comparison(row.op),
                row.rhs,
            );
        }

        let solution = lp.solve()?;
        Ok(vars.iter().map(|&v| self.clamp(solution[v])).collect())
    }

    /// Dual of `max c x, A x (op) b, x >= 0`: `min b y, A' y >= c` with
    /// `y >= 0` on `<=` rows, `y <= 0` on `>=` rows and `y` free on
    /// equalities. A minimization is solved as `max -c x` and its duals
    /// are negated back.
    fn solve_dual(&self, problem: &LpProblem, form: &StandardForm) -> Option<Vec<f64>> {
        let sign = match problem.objective.sense {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        };

        let mut lp = Problem::new(OptimizationDirection::Minimize);
        let duals: Vec<_> = form
            .rows
            .iter()
            .map(|row| {
                let bounds = match row.op {
                    ConstraintOp::Le => (0.0, f64::INFINITY),
                    ConstraintOp::Ge => (f64::NEG_INFINITY, 0.0),
                    ConstraintOp::Eq => (f64::NEG_INFINITY, f64::INFINITY),
                };
                lp.add_var(row.rhs, bounds)
            })
            .collect();

        let mut columns = vec![Vec::new(); problem.num_variables()];
        for (row, &y) in form.rows.iter().zip(&duals) {
            for &(j, coef) in &row.terms {
                columns[j].push((y, coef));
            }
        }
        for (column, &cost) in columns.into_iter().zip(&form.costs) {
            let cost = sign * cost;
            if column.is_empty() {
                if cost > self.tolerance {
                    return None;
                }
                continue;
            }
            lp.add_constraint(column, ComparisonOp::Ge, cost);
        }

        let solution = lp.solve().ok()?;
        Some(
            duals[..problem.num_constraints()]
                .iter()
                .map(|&y| self.clamp(sign * solution[y]))
                .collect(),
        )
    }

    fn clamp(&self, value: f64) -> f64 {
        if value.abs() < self.tolerance { 0.0 } else { value }
    }
}

fn comparison(op: ConstraintOp) -> ComparisonOp {
    match op {
        ConstraintOp::Le => ComparisonOp::Le,
        ConstraintOp::Ge => ComparisonOp::Ge,
        ConstraintOp::Eq => ComparisonOp::Eq,
    }
}

/// Validate the problem and bring it to row form. Only `[l, u]` domains with
/// a finite `l >= 0` are supported.
fn standard_form(problem: &LpProblem) -> Result<StandardForm, String> {
    let n = problem.num_variables();

    let mut costs = vec![0.0; n];
    for &(j, coef) in &problem.objective.terms {
        if j >= n || !coef.is_finite() {
            return Err(format!("bad objective term ({}, {})", j, coef));
        }
        costs[j] += coef;
    }

    let mut rows = Vec::with_capacity(problem.num_constraints());
    for c in &problem.constraints {
        if !c.rhs.is_finite() {
            return Err(format!("constraint {} has right-hand side {}", c.name, c.rhs));
        }
        if c.terms.iter().any(|&(j, coef)| j >= n || !coef.is_finite()) {
            return Err(format!("constraint {} has a bad term", c.name));
        }
        rows.push(Row {
            terms: merge_terms(&c.terms),
            op: c.op,
            rhs: c.rhs,
        });
    }

    for (j, v) in problem.variables.iter().enumerate() {
        if !v.lower.is_finite() || v.lower < 0.0 || v.upper.is_nan() {
            return Err(format!("variable {} has domain [{}, {}]", v.name, v.lower, v.upper));
        }
        if v.lower > 0.0 {
            rows.push(Row {
                terms: vec![(j, 1.0)],
                op: ConstraintOp::Ge,
                rhs: v.lower,
            });
        }
        if v.upper.is_finite() {
            rows.push(Row {
                terms: vec![(j, 1.0)],
                op: ConstraintOp::Le,
                rhs: v.upper,
            });
        }
    }

    Ok(StandardForm { rows, costs })
}

/// Sum repeated variables; `microlp` takes each variable once per row
fn merge_terms(terms: &[(usize, f64)]) -> Vec<(usize, f64)> {
    let mut merged = terms.to_vec();
    merged.sort_by_key(|&(j, _)| j);
    merged.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
    merged
}
