use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("{table} table has no `{row}` row")]
    MissingRow { table: String, row: String },
    #[error("{table} table references unknown product `{product}`")]
    UnknownProduct { table: String, product: String },
    #[error("{table} table does not cover the products of the flow table, missing: {}", missing.join(", "))]
    ProductMismatch { table: String, missing: Vec<String> },
    #[error("{table} table lists `{heading}` more than once")]
    DuplicateHeading { table: String, heading: String },
    #[error("targets table has no `labor` column")]
    MissingLaborSupply,
    #[error("{table} table has a non-finite value at row `{row}`, column `{column}`")]
    InvalidValue { table: String, row: String, column: String },
    #[error("{table} table row `{row}` has {found} values, expected {expected}")]
    RaggedTable { table: String, row: String, expected: usize, found: usize },
    #[error("targets table has no rows, a plan needs at least one year")]
    EmptyHorizon,
    #[error("flow table has no product columns")]
    NoProducts,
    #[error("model needs {required} variables for {years} years and {products} products, limit is {limit}")]
    ModelTooLarge { years: usize, products: usize, required: usize, limit: usize },
    #[error("solver returned {found} values for a schema of {expected} variables")]
    SchemaMismatch { expected: usize, found: usize },
}
