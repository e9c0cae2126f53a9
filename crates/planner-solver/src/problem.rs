use std::fmt;

/// Represents a linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Decision variables, addressed by position
    pub variables: Vec<Variable>,
    /// Objective function
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

/// A continuous decision variable with bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Sparse `(variable, coefficient)` terms
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Sparse `(variable, coefficient)` terms. Repeated variables add up.
    pub terms: Vec<(usize, f64)>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl Variable {
    /// A variable with domain `[0, +inf)`
    pub fn non_negative(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: 0.0,
            upper: f64::INFINITY,
        }
    }

    pub fn bounded(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }
}

impl Constraint {
    /// Evaluate the left-hand side for a given assignment
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(j, coef)| coef * values.get(j).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether `values` satisfies this constraint within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }

    pub fn references(&self, variable: usize) -> bool {
        self.terms.iter().any(|&(j, coef)| j == variable && coef != 0.0)
    }
}

impl LpProblem {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            objective: Objective {
                terms: Vec::new(),
                sense: Sense::Minimize,
            },
            constraints: Vec::new(),
        }
    }

    /// Shorthand for a problem whose variables all live in `[0, +inf)`
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Variable::non_negative).collect())
    }

    pub fn set_objective(&mut self, terms: Vec<(usize, f64)>, sense: Sense) {
        self.objective = Objective { terms, sense };
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(usize, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of an assignment
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .terms
            .iter()
            .map(|&(j, coef)| coef * values.get(j).copied().unwrap_or(0.0))
            .sum()
    }
}

fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[(usize, f64)], variables: &[Variable]) -> fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }
    for (i, &(j, coef)) in terms.iter().enumerate() {
        let name = variables.get(j).map(|v| v.name.as_str()).unwrap_or("?");
        let sign = if coef < 0.0 { "-" } else { "+" };
        if i == 0 && coef >= 0.0 {
            write!(f, "{} {}", coef, name)?;
        } else if i == 0 {
            write!(f, "- {} {}", -coef, name)?;
        } else {
            write!(f, " {} {} {}", sign, coef.abs(), name)?;
        }
    }
    Ok(())
}

/// LP-format text dump, close to what CPLEX/GLPK accept
impl fmt::Display for LpProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective.sense {
            Sense::Minimize => writeln!(f, "Minimize")?,
            Sense::Maximize => writeln!(f, "Maximize")?,
        }
        write!(f, " obj: ")?;
        write_terms(f, &self.objective.terms, &self.variables)?;
        writeln!(f)?;

        writeln!(f, "Subject To")?;
        for c in &self.constraints {
            write!(f, " {}: ", c.name)?;
            write_terms(f, &c.terms, &self.variables)?;
            let op = match c.op {
                ConstraintOp::Le => "<=",
                ConstraintOp::Ge => ">=",
                ConstraintOp::Eq => "=",
            };
            writeln!(f, " {} {}", op, c.rhs)?;
        }

        writeln!(f, "Bounds")?;
        for v in &self.variables {
            if v.upper.is_infinite() {
                writeln!(f, " {} >= {}", v.name, v.lower)?;
            } else {
                writeln!(f, " {} <= {} <= {}", v.lower, v.name, v.upper)?;
            }
        }
        writeln!(f, "End")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lhs_sums_repeated_terms() {
        let c = Constraint {
            name: "c".to_string(),
            terms: vec![(0, 1.0), (1, -2.0), (0, 0.5)],
            op: ConstraintOp::Ge,
            rhs: 0.0,
        };
        assert!((c.lhs(&[2.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!(c.is_satisfied(&[2.0, 1.0], 1e-9));
        assert!(!c.is_satisfied(&[1.0, 1.0], 1e-9));
    }

    #[test]
    fn test_lp_format_dump() {
        let mut problem = LpProblem::with_names(["x", "y"]);
        problem.set_objective(vec![(0, 3.0), (1, 2.0)], Sense::Maximize);
        problem.add_constraint("sum", vec![(0, 1.0), (1, -1.0)], ConstraintOp::Le, 4.0);

        let text = problem.to_string();
        assert!(text.starts_with("Maximize\n obj: 3 x + 2 y\n"));
        assert!(text.contains(" sum: 1 x - 1 y <= 4\n"));
        assert!(text.contains(" y >= 0\n"));
        assert!(text.ends_with("End\n"));
    }
}
