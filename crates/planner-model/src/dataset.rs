use std::collections::HashMap;

use crate::error::PlanError;
use crate::table::Table;

/// Row of the flow table holding labor input per unit of output
pub const LABOR: &str = "labor";
/// Row of the flow table holding gross output per production step
pub const OUTPUT: &str = "output";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub unit: Option<String>,
}

/// Normalized economic data, addressed by product index and year.
///
/// Product order is the column order of the flow table. All matrices are
/// stored flat as `[input * n + output]`, targets as `[year * n + product]`.
#[derive(Debug, Clone)]
pub struct Dataset {
    products: Vec<Product>,
    index: HashMap<String, usize>,
    years: usize,
    labor_coefficients: Vec<f64>,
    output_coefficients: Vec<f64>,
    flows: Vec<f64>,
    capital_stock: Vec<f64>,
    depreciation_rates: Vec<f64>,
    targets: Vec<f64>,
    labor_supply: Vec<f64>,
}

impl Dataset {
    /// Validate and normalize the four input tables.
    ///
    /// Every table must agree with the product set of the flow table; any
    /// disagreement aborts before a model is built.
    pub fn new(
        flows: &Table,
        capital_stock: &Table,
        depreciation_rates: &Table,
        targets: &Table,
    ) -> Result<Self, PlanError> {
        if flows.columns().is_empty() {
            return Err(PlanError::NoProducts);
        }
        check_unique(flows.name(), flows.columns())?;
        check_unique(flows.name(), flows.row_headings())?;

        let products: Vec<Product> = flows
            .columns()
            .iter()
            .map(|name| Product { name: name.clone(), unit: None })
            .collect();
        let index: HashMap<String, usize> = flows
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let n = products.len();

        // Flow table rows: labor, output and one per product
        let row_of = |heading: &str| {
            flows.row_index(heading).ok_or_else(|| PlanError::MissingRow {
                table: flows.name().to_string(),
                row: heading.to_string(),
            })
        };
        let labor_row = row_of(LABOR)?;
        let output_row = row_of(OUTPUT)?;
        for heading in flows.row_headings() {
            if heading != LABOR && heading != OUTPUT && !index.contains_key(heading) {
                return Err(PlanError::UnknownProduct {
                    table: flows.name().to_string(),
                    product: heading.clone(),
                });
            }
        }

        let labor_coefficients = flows.row(labor_row).to_vec();
        let output_coefficients = flows.row(output_row).to_vec();
        let mut flow_matrix = vec![0.0; n * n];
        for (input, product) in products.iter().enumerate() {
            let row = row_of(&product.name)?;
            flow_matrix[input * n..(input + 1) * n].copy_from_slice(flows.row(row));
        }

        let capital_stock = square_matrix(capital_stock, &products, &index)?;
        let depreciation_rates = square_matrix(depreciation_rates, &products, &index)?;

        // Targets: rows are years, columns products plus labor
        if targets.num_rows() == 0 {
            return Err(PlanError::EmptyHorizon);
        }
        check_unique(targets.name(), targets.columns())?;
        let labor_col = targets.column_index(LABOR).ok_or(PlanError::MissingLaborSupply)?;
        let mut target_columns = Vec::with_capacity(targets.columns().len());
        for (col, name) in targets.columns().iter().enumerate() {
            if col == labor_col {
                continue;
            }
            let product = index.get(name).ok_or_else(|| PlanError::UnknownProduct {
                table: targets.name().to_string(),
                product: name.clone(),
            })?;
            target_columns.push((col, *product));
        }

        let years = targets.num_rows();
        let mut target_values = vec![0.0; years * n];
        let mut labor_supply = Vec::with_capacity(years);
        for (year, row) in targets.rows().enumerate() {
            for &(col, product) in &target_columns {
                target_values[year * n + product] = row[col];
            }
            labor_supply.push(row[labor_col]);
        }

        Ok(Self {
            products,
            index,
            years,
            labor_coefficients,
            output_coefficients,
            flows: flow_matrix,
            capital_stock,
            depreciation_rates,
            targets: target_values,
            labor_supply,
        })
    }

    /// Attach display units to products
    pub fn with_units<I, K, V>(mut self, units: I) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, unit) in units {
            let name = name.as_ref();
            let i = self.product_index(name).ok_or_else(|| PlanError::UnknownProduct {
                table: "units".to_string(),
                product: name.to_string(),
            })?;
            let unit = unit.into();
            self.products[i].unit = if unit.is_empty() { None } else { Some(unit) };
        }
        Ok(self)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product_names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name.clone()).collect()
    }

    pub fn product_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    pub fn years(&self) -> usize {
        self.years
    }

    /// `io(input, output)` for a product input
    pub fn io(&self, input: usize, output: usize) -> f64 {
        self.flows[input * self.products.len() + output]
    }

    /// `io(labor, output)`
    pub fn labor_coefficient(&self, output: usize) -> f64 {
        self.labor_coefficients[output]
    }

    /// `io(output, output)`: gross output of one production step
    pub fn output_coefficient(&self, output: usize) -> f64 {
        self.output_coefficients[output]
    }

    pub fn capital_stock(&self, input: usize, output: usize) -> f64 {
        self.capital_stock[input * self.products.len() + output]
    }

    pub fn depreciation_rate(&self, input: usize, output: usize) -> f64 {
        self.depreciation_rates[input * self.products.len() + output]
    }

    /// Final-consumption target; 0 when absent
    pub fn target(&self, product: usize, year: usize) -> f64 {
        self.targets[year * self.products.len() + product]
    }

    pub fn labor_supply(&self, year: usize) -> f64 {
        self.labor_supply[year]
    }
}

fn check_unique(table: &str, headings: &[String]) -> Result<(), PlanError> {
    for (i, heading) in headings.iter().enumerate() {
        if headings[..i].contains(heading) {
            return Err(PlanError::DuplicateHeading {
                table: table.to_string(),
                heading: heading.clone(),
            });
        }
    }
    Ok(())
}

/// Reorder a products-by-products table into flow-table product order.
/// `labor` and `output` rows are allowed and ignored.
fn square_matrix(
    table: &Table,
    products: &[Product],
    index: &HashMap<String, usize>,
) -> Result<Vec<f64>, PlanError> {
    check_unique(table.name(), table.columns())?;
    check_unique(table.name(), table.row_headings())?;

    for name in table.columns().iter().chain(table.row_headings()) {
        if name != LABOR && name != OUTPUT && !index.contains_key(name) {
            return Err(PlanError::UnknownProduct {
                table: table.name().to_string(),
                product: name.clone(),
            });
        }
    }

    let missing: Vec<String> = products
        .iter()
        .filter(|p| table.column_index(&p.name).is_none() || table.row_index(&p.name).is_none())
        .map(|p| p.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(PlanError::ProductMismatch {
            table: table.name().to_string(),
            missing,
        });
    }

    let n = products.len();
    let mut matrix = vec![0.0; n * n];
    for (input, p) in products.iter().enumerate() {
        let row = table.row_index(&p.name).ok_or_else(|| PlanError::MissingRow {
            table: table.name().to_string(),
            row: p.name.clone(),
        })?;
        for (output, q) in products.iter().enumerate() {
            let col = table.column_index(&q.name).ok_or_else(|| PlanError::ProductMismatch {
                table: table.name().to_string(),
                missing: vec![q.name.clone()],
            })?;
            matrix[input * n + output] = table.get(row, col);
        }
    }
    Ok(matrix)
}
