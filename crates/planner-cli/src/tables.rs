//! CSV input and output of planning data.
//!
//! An input directory holds `flows.csv`, `capital_stock.csv`,
//! `depreciation_rates.csv`, `targets.csv` and optionally `units.csv`.
//! A solved plan is written as one CSV per variable family.

use std::path::{Path, PathBuf};

use log::{debug, info};
use planner_model::{Dataset, Family, FamilyValues, Plan, PlanError, Table};
use thiserror::Error;

pub const FLOWS: &str = "flows.csv";
pub const CAPITAL_STOCK: &str = "capital_stock.csv";
pub const DEPRECIATION_RATES: &str = "depreciation_rates.csv";
pub const TARGETS: &str = "targets.csv";
pub const UNITS: &str = "units.csv";

const YEAR: &str = "year";

#[derive(Error, Debug)]
pub enum TableError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },
    #[error("cannot write {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{} has no header row", path.display())]
    NoHeader { path: PathBuf },
    #[error("{}: `{cell}` at row `{row}`, column `{column}` is not a number", path.display())]
    NotANumber { path: PathBuf, row: String, column: String, cell: String },
    #[error("{} must have exactly one row, found {found}", path.display())]
    UnitRows { path: PathBuf, found: usize },
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Read and validate the dataset stored in `dir`
pub fn load_dataset(dir: &Path) -> Result<Dataset, TableError> {
    let flows = read_labelled(&dir.join(FLOWS), "flows")?;
    let capital_stock = read_labelled(&dir.join(CAPITAL_STOCK), "capital_stock")?;
    let depreciation_rates = read_labelled(&dir.join(DEPRECIATION_RATES), "depreciation_rates")?;
    let targets = read_targets(&dir.join(TARGETS))?;

    let mut dataset = Dataset::new(&flows, &capital_stock, &depreciation_rates, &targets)?;

    let units = dir.join(UNITS);
    if units.is_file() {
        dataset = dataset.with_units(read_units(&units)?)?;
    }

    info!(
        "loaded {}: {} products over {} years",
        dir.display(),
        dataset.num_products(),
        dataset.years()
    );
    Ok(dataset)
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, TableError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn headers(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> Result<Vec<String>, TableError> {
    let headers = reader.headers().map_err(|source| TableError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if headers.is_empty() {
        return Err(TableError::NoHeader {
            path: path.to_path_buf(),
        });
    }
    Ok(headers.iter().map(str::to_string).collect())
}

fn parse_cell(path: &Path, row: &str, column: &str, cell: &str) -> Result<f64, TableError> {
    cell.parse().map_err(|_| TableError::NotANumber {
        path: path.to_path_buf(),
        row: row.to_string(),
        column: column.to_string(),
        cell: cell.to_string(),
    })
}

fn parse_row<'a>(
    path: &Path,
    table: &Table,
    heading: &str,
    cells: impl Iterator<Item = &'a str>,
) -> Result<Vec<f64>, TableError> {
    cells
        .enumerate()
        .map(|(i, cell)| {
            let column = table.columns().get(i).map(String::as_str).unwrap_or_default();
            parse_cell(path, heading, column, cell)
        })
        .collect()
}

/// Read a table whose first column holds the row headings
fn read_labelled(path: &Path, name: &str) -> Result<Table, TableError> {
    let mut reader = open(path)?;
    let columns = headers(&mut reader, path)?;
    let mut table = Table::new(name, columns[1..].to_vec());

    for record in reader.records() {
        let record = record.map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cells = record.iter();
        let heading = cells.next().unwrap_or_default();
        let values = parse_row(path, &table, heading, cells)?;
        table.push_row(heading, values)?;
    }

    debug!("read {}: {} rows, {} columns", path.display(), table.num_rows(), table.columns().len());
    Ok(table)
}

/// Read the targets table: one row per year, an optional leading `year` column
fn read_targets(path: &Path) -> Result<Table, TableError> {
    let mut reader = open(path)?;
    let mut columns = headers(&mut reader, path)?;
    let has_year = columns[0].eq_ignore_ascii_case(YEAR);
    if has_year {
        columns.remove(0);
    }
    let mut table = Table::new("targets", columns);

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cells = record.iter();
        let heading = if has_year {
            cells.next().unwrap_or_default().to_string()
        } else {
            i.to_string()
        };
        let values = parse_row(path, &table, &heading, cells)?;
        table.push_row(heading, values)?;
    }

    debug!("read {}: {} years", path.display(), table.num_rows());
    Ok(table)
}

/// Read the single-row units table as `(product, unit)` pairs
fn read_units(path: &Path) -> Result<Vec<(String, String)>, TableError> {
    let mut reader = open(path)?;
    let columns = headers(&mut reader, path)?;
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let [record] = records.as_slice() else {
        return Err(TableError::UnitRows {
            path: path.to_path_buf(),
            found: records.len(),
        });
    };
    Ok(columns
        .into_iter()
        .zip(record.iter().map(str::to_string))
        .collect())
}

/// Write one CSV per variable family into `dir`, returning the written paths
pub fn write_plan(plan: &Plan, dir: &Path) -> Result<Vec<PathBuf>, TableError> {
    std::fs::create_dir_all(dir).map_err(|source| TableError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(Family::ALL.len());
    for family in Family::ALL {
        let path = dir.join(format!("{}.csv", family.table_name()));
        write_family(plan, family, &path)?;
        written.push(path);
    }

    info!("wrote {} tables to {}", written.len(), dir.display());
    Ok(written)
}

fn write_family(plan: &Plan, family: Family, path: &Path) -> Result<(), TableError> {
    let write_err = |source| TableError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    match plan.values(family) {
        FamilyValues::Year(values) => {
            rows.push(vec![YEAR.to_string(), "value".to_string()]);
            for (y, v) in values.iter().enumerate() {
                rows.push(vec![y.to_string(), v.to_string()]);
            }
        }
        FamilyValues::Product(values) => {
            rows.push(header(&plan.products, &[YEAR]));
            for (y, row) in values.iter().enumerate() {
                rows.push(std::iter::once(y.to_string()).chain(row.iter().map(f64::to_string)).collect());
            }
        }
        FamilyValues::Pair(values) => {
            rows.push(header(&plan.products, &[YEAR, "product"]));
            for (y, matrix) in values.iter().enumerate() {
                for (p, row) in matrix.iter().enumerate() {
                    rows.push(
                        [y.to_string(), plan.products[p].clone()]
                            .into_iter()
                            .chain(row.iter().map(f64::to_string))
                            .collect(),
                    );
                }
            }
        }
    }

    for row in &rows {
        writer.write_record(row).map_err(write_err)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn header(products: &[String], leading: &[&str]) -> Vec<String> {
    leading
        .iter()
        .map(|s| s.to_string())
        .chain(products.iter().cloned())
        .collect()
}
