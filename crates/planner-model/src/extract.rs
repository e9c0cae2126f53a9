use planner_solver::{Solution, SolutionStatus};

use crate::dataset::Dataset;
use crate::error::PlanError;
use crate::schema::{Family, Shape, VarId, VariableSchema};

/// Solved plan, laid out like the variable schema.
///
/// Year families are indexed `[year]`, product families `[year][product]`,
/// pair families `[year][product][input]`, with products in dataset order.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub products: Vec<String>,
    pub objective_value: f64,
    pub target_fulfillment: Vec<f64>,
    pub labor_supply_used: Vec<f64>,
    pub accumulation: Vec<Vec<f64>>,
    pub final_consumption: Vec<Vec<f64>>,
    pub labor_for: Vec<Vec<f64>>,
    pub output: Vec<Vec<f64>>,
    pub productive_consumption: Vec<Vec<f64>>,
    pub accumulation_for: Vec<Vec<Vec<f64>>>,
    pub capital_stock_for: Vec<Vec<Vec<f64>>>,
    pub depreciation_in: Vec<Vec<Vec<f64>>>,
    pub flow_for: Vec<Vec<Vec<f64>>>,
}

/// Values of one variable family
#[derive(Debug, Clone, Copy)]
pub enum FamilyValues<'a> {
    Year(&'a [f64]),
    Product(&'a [Vec<f64>]),
    Pair(&'a [Vec<Vec<f64>>]),
}

/// What came out of a solve
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Optimal(Plan),
    /// Infeasible, unbounded or failed; nothing was extracted
    NoSolution(SolutionStatus),
}

impl PlanOutcome {
    pub fn status(&self) -> SolutionStatus {
        match self {
            PlanOutcome::Optimal(_) => SolutionStatus::Optimal,
            PlanOutcome::NoSolution(status) => *status,
        }
    }

    pub fn plan(&self) -> Option<&Plan> {
        match self {
            PlanOutcome::Optimal(plan) => Some(plan),
            PlanOutcome::NoSolution(_) => None,
        }
    }
}

/// Map solved values back onto the schema. Non-optimal solutions yield
/// [`PlanOutcome::NoSolution`] and no partial values.
pub fn extract(schema: &VariableSchema, dataset: &Dataset, solution: &Solution) -> Result<PlanOutcome, PlanError> {
    if solution.status != SolutionStatus::Optimal {
        return Ok(PlanOutcome::NoSolution(solution.status));
    }
    if solution.values.len() != schema.len() {
        return Err(PlanError::SchemaMismatch {
            expected: schema.len(),
            found: solution.values.len(),
        });
    }

    let values = &solution.values;
    let value = |id: VarId| values[id.index()];
    let years = schema.years();
    let n = schema.products();

    let per_year = |f: &dyn Fn(usize) -> VarId| (0..years).map(|y| value(f(y))).collect::<Vec<_>>();
    let per_product = |f: &dyn Fn(usize, usize) -> VarId| {
        (0..years)
            .map(|y| (0..n).map(|p| value(f(y, p))).collect())
            .collect::<Vec<Vec<f64>>>()
    };
    let per_pair = |f: &dyn Fn(usize, usize, usize) -> VarId| {
        (0..years)
            .map(|y| (0..n).map(|p| (0..n).map(|q| value(f(y, p, q))).collect()).collect())
            .collect::<Vec<Vec<Vec<f64>>>>()
    };

    Ok(PlanOutcome::Optimal(Plan {
        products: dataset.product_names(),
        objective_value: solution.objective_value,
        target_fulfillment: per_year(&|y| schema.target_fulfillment(y)),
        labor_supply_used: per_year(&|y| schema.labor_supply_used(y)),
        accumulation: per_product(&|y, p| schema.accumulation(y, p)),
        final_consumption: per_product(&|y, p| schema.final_consumption(y, p)),
        labor_for: per_product(&|y, p| schema.labor_for(y, p)),
        output: per_product(&|y, p| schema.output(y, p)),
        productive_consumption: per_product(&|y, p| schema.productive_consumption(y, p)),
        accumulation_for: per_pair(&|y, p, q| schema.accumulation_for(y, p, q)),
        capital_stock_for: per_pair(&|y, p, q| schema.capital_stock_for(y, p, q)),
        depreciation_in: per_pair(&|y, p, q| schema.depreciation_in(y, p, q)),
        flow_for: per_pair(&|y, p, q| schema.flow_for(y, p, q)),
    }))
}

impl Plan {
    pub fn years(&self) -> usize {
        self.target_fulfillment.len()
    }

    pub fn product_index(&self, name: &str) -> Option<usize> {
        self.products.iter().position(|p| p == name)
    }

    pub fn total_fulfillment(&self) -> f64 {
        self.target_fulfillment.iter().sum()
    }

    pub fn values(&self, family: Family) -> FamilyValues<'_> {
        match family {
            Family::TargetFulfillment => FamilyValues::Year(&self.target_fulfillment),
            Family::LaborSupplyUsed => FamilyValues::Year(&self.labor_supply_used),
            Family::Accumulation => FamilyValues::Product(&self.accumulation),
            Family::FinalConsumption => FamilyValues::Product(&self.final_consumption),
            Family::LaborFor => FamilyValues::Product(&self.labor_for),
            Family::Output => FamilyValues::Product(&self.output),
            Family::ProductiveConsumption => FamilyValues::Product(&self.productive_consumption),
            Family::AccumulationFor => FamilyValues::Pair(&self.accumulation_for),
            Family::CapitalStockFor => FamilyValues::Pair(&self.capital_stock_for),
            Family::DepreciationIn => FamilyValues::Pair(&self.depreciation_in),
            Family::FlowFor => FamilyValues::Pair(&self.flow_for),
        }
    }

    /// Iterate every value with the schema position it came from
    pub fn iter_values(&self) -> impl Iterator<Item = (Family, usize, Option<usize>, Option<usize>, f64)> + '_ {
        Family::ALL.into_iter().flat_map(move |family| {
            let mut out = Vec::new();
            match (family.shape(), self.values(family)) {
                (Shape::Year, FamilyValues::Year(v)) => {
                    out.extend(v.iter().enumerate().map(|(y, &x)| (family, y, None, None, x)));
                }
                (Shape::YearProduct, FamilyValues::Product(v)) => {
                    for (y, row) in v.iter().enumerate() {
                        out.extend(row.iter().enumerate().map(|(p, &x)| (family, y, Some(p), None, x)));
                    }
                }
                (Shape::YearPair, FamilyValues::Pair(v)) => {
                    for (y, rows) in v.iter().enumerate() {
                        for (p, row) in rows.iter().enumerate() {
                            out.extend(row.iter().enumerate().map(|(q, &x)| (family, y, Some(p), Some(q), x)));
                        }
                    }
                }
                _ => {}
            }
            out
        })
    }
}
