pub mod constraints;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod objective;
pub mod planner;
pub mod schema;
pub mod table;

pub use constraints::{ratio, ConstraintGenerator, ConstraintSet, Rule, RuleTag};
pub use dataset::{Dataset, Product, LABOR, OUTPUT};
pub use error::PlanError;
pub use extract::{extract, FamilyValues, Plan, PlanOutcome};
pub use objective::objective;
pub use planner::{ModelSize, PlanModel, Planner};
pub use schema::{Family, Shape, VarId, VarKey, VariableSchema};
pub use table::Table;
