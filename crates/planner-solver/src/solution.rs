/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Dual information at the optimum
    pub analysis: Analysis,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// Iteration limit, malformed input or any other failure
    Other,
}

impl SolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensitivity information of the optimal basis
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Shadow prices (dual values) for each constraint, in constraint order.
    /// Change of the objective per unit increase of the right-hand side.
    pub shadow_prices: Vec<ShadowPrice>,

    /// Inequality constraints that hold with equality at the optimum
    pub binding_constraints: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct ShadowPrice {
    /// Constraint name
    pub constraint: String,
    /// Shadow price value
    pub value: f64,
}

impl Solution {
    pub fn infeasible() -> Self {
        Self::without_values(SolutionStatus::Infeasible, f64::NAN)
    }

    pub fn unbounded() -> Self {
        Self::without_values(SolutionStatus::Unbounded, f64::NAN)
    }

    pub fn other() -> Self {
        Self::without_values(SolutionStatus::Other, f64::NAN)
    }

    fn without_values(status: SolutionStatus, objective_value: f64) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            analysis: Analysis::default(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Shadow price of the named constraint, if it exists
    pub fn shadow_price(&self, constraint: &str) -> Option<f64> {
        self.analysis
            .shadow_prices
            .iter()
            .find(|sp| sp.constraint == constraint)
            .map(|sp| sp.value)
    }
}
