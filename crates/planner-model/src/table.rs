use crate::error::PlanError;

/// Already-parsed numeric table: one heading per row, one name per column.
///
/// Rows only enter through [`Table::push_row`], so every row has one finite
/// value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    row_headings: Vec<String>,
    /// `values[row][column]`
    values: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            row_headings: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a table in one go, mostly for tests and fixtures
    pub fn from_rows(name: &str, columns: &[&str], rows: &[(&str, &[f64])]) -> Result<Self, PlanError> {
        let mut table = Self::new(name, columns.iter().map(|c| c.to_string()).collect());
        for (heading, values) in rows {
            table.push_row(*heading, values.to_vec())?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, heading: impl Into<String>, values: Vec<f64>) -> Result<(), PlanError> {
        let heading = heading.into();
        if values.len() != self.columns.len() {
            return Err(PlanError::RaggedTable {
                table: self.name.clone(),
                row: heading,
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(PlanError::InvalidValue {
                table: self.name.clone(),
                row: heading,
                column: self.columns[col].clone(),
            });
        }
        self.row_headings.push(heading);
        self.values.push(values);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_headings(&self) -> &[String] {
        &self.row_headings
    }

    /// Values of one row, in column order
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.iter().map(Vec::as_slice)
    }

    pub fn num_rows(&self) -> usize {
        self.values.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_index(&self, heading: &str) -> Option<usize> {
        self.row_headings.iter().position(|h| h == heading)
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row][column]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_row_is_rejected() {
        let err = Table::from_rows("flows", &["coal", "iron"], &[("labor", &[1.0])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::RaggedTable {
                table: "flows".to_string(),
                row: "labor".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let err = Table::from_rows("targets", &["coal"], &[("0", &[f64::NAN])]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidValue { ref column, .. } if column == "coal"));
    }

    #[test]
    fn test_lookup() {
        let table = Table::from_rows("flows", &["coal", "iron"], &[("labor", &[1.0, 2.0]), ("output", &[3.0, 4.0])]).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get(table.row_index("output").unwrap(), table.column_index("iron").unwrap()), 4.0);
        assert_eq!(table.row_index("coal"), None);
        assert_eq!(table.row(1), &[3.0, 4.0]);
        assert_eq!(table.row_headings(), &["labor", "output"]);
    }

    #[test]
    fn test_rejected_row_leaves_table_unchanged() {
        let mut table = Table::new("flows", vec!["coal".to_string(), "iron".to_string()]);
        table.push_row("labor", vec![1.0, 2.0]).unwrap();
        assert!(table.push_row("output", vec![1.0]).is_err());

        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.row_headings().len(), table.rows().count());
        assert!(table.rows().all(|row| row.len() == table.columns().len()));
    }
}
