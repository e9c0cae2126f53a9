use log::info;
use planner_solver::{LpProblem, LpSolver, Solution, Solver};

use crate::constraints::{ConstraintGenerator, Rule, RuleTag};
use crate::dataset::Dataset;
use crate::error::PlanError;
use crate::extract::{extract, PlanOutcome};
use crate::objective::objective;
use crate::schema::VariableSchema;

/// Problem dimensions, known before anything is allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSize {
    pub years: usize,
    pub products: usize,
    pub variables: usize,
}

impl ModelSize {
    pub fn of(dataset: &Dataset) -> Self {
        let years = dataset.years();
        let products = dataset.num_products();
        Self {
            years,
            products,
            variables: VariableSchema::variable_count(years, products),
        }
    }
}

/// A fully built planning model, ready to hand to a solver
#[derive(Debug, Clone)]
pub struct PlanModel {
    pub schema: VariableSchema,
    pub problem: LpProblem,
    /// Rule that produced each constraint of `problem`, in the same order
    pub tags: Vec<RuleTag>,
}

impl PlanModel {
    pub fn build(dataset: &Dataset) -> Self {
        let schema = VariableSchema::new(dataset.years(), dataset.num_products());
        let mut problem = LpProblem::new(schema.variables(dataset.products()));

        let (constraints, tags) = ConstraintGenerator::new(dataset, &schema).generate().into_parts();
        problem.constraints = constraints;
        problem.objective = objective(&schema);

        Self { schema, problem, tags }
    }

    pub fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }

    /// Names of the constraints produced by `rule`
    pub fn constraint_names(&self, rule: Rule) -> Vec<&str> {
        self.tags
            .iter()
            .zip(&self.problem.constraints)
            .filter(|(tag, _)| tag.rule == rule)
            .map(|(_, c)| c.name.as_str())
            .collect()
    }
}

/// Builds, solves and extracts multi-year plans
pub struct Planner<S = Solver> {
    solver: S,
    max_variables: Option<usize>,
}

impl Default for Planner<Solver> {
    fn default() -> Self {
        Self::new(Solver::new())
    }
}

impl<S: LpSolver> Planner<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            max_variables: None,
        }
    }

    /// Refuse to build models with more variables than `max`
    pub fn with_max_variables(mut self, max: usize) -> Self {
        self.max_variables = Some(max);
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn build(&self, dataset: &Dataset) -> Result<PlanModel, PlanError> {
        let size = ModelSize::of(dataset);
        if let Some(limit) = self.max_variables {
            if size.variables > limit {
                return Err(PlanError::ModelTooLarge {
                    years: size.years,
                    products: size.products,
                    required: size.variables,
                    limit,
                });
            }
        }

        let model = PlanModel::build(dataset);
        info!(
            "built plan model: {} years, {} products, {} variables, {} constraints",
            size.years,
            size.products,
            model.num_variables(),
            model.num_constraints()
        );
        Ok(model)
    }

    pub fn solve(&self, model: &PlanModel) -> Solution {
        let solution = self.solver.solve(&model.problem);
        info!("solver finished with status {}", solution.status);
        solution
    }

    /// Build, solve and extract in one go
    pub fn plan(&self, dataset: &Dataset) -> Result<PlanOutcome, PlanError> {
        let model = self.build(dataset)?;
        let solution = self.solve(&model);
        extract(&model.schema, dataset, &solution)
    }
}
