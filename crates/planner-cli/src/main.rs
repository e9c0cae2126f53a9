mod tables;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use planner_model::{extract, Dataset, ModelSize, Plan, PlanOutcome, Planner, Rule};
use planner_solver::{Analysis, Solver};
use serde_json::json;

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Multi-year linear production planning", long_about = None)]
struct Cli {
    /// Log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and solve a plan, optionally exporting it as CSV tables
    Plan {
        /// Directory holding flows, capital_stock, depreciation_rates and targets CSVs
        input: PathBuf,
        /// Directory to write one CSV per variable family into
        output: Option<PathBuf>,
        /// Report format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Show binding constraints and labor shadow prices
        #[arg(short, long)]
        analysis: bool,
        #[command(flatten)]
        limits: Limits,
    },
    /// Print the linear program without solving it
    Model {
        input: PathBuf,
        #[command(flatten)]
        limits: Limits,
    },
    /// Validate a dataset and print the model size
    Check { input: PathBuf },
}

#[derive(Args)]
struct Limits {
    /// Values below this are reported as zero and slacks below it as binding
    #[arg(long)]
    tolerance: Option<f64>,
    /// Refuse datasets whose model needs more variables than this
    #[arg(long)]
    max_variables: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

impl Limits {
    fn planner(&self, shadow_prices: bool) -> Planner {
        let mut solver = Solver::new().with_dual_analysis(shadow_prices);
        if let Some(tol) = self.tolerance {
            solver = solver.with_tolerance(tol);
        }
        let planner = Planner::new(solver);
        match self.max_variables {
            Some(n) => planner.with_max_variables(n),
            None => planner,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Plan {
            input,
            output,
            format,
            analysis,
            limits,
        } => plan(&input, output.as_deref(), format, analysis, &limits),
        Commands::Model { input, limits } => model(&input, &limits),
        Commands::Check { input } => check(&input),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(input: &Path) -> anyhow::Result<Dataset> {
    tables::load_dataset(input).with_context(|| format!("loading dataset from {}", input.display()))
}

fn plan(
    input: &Path,
    output: Option<&Path>,
    format: Format,
    analysis: bool,
    limits: &Limits,
) -> anyhow::Result<ExitCode> {
    let dataset = load(input)?;
    let planner = limits.planner(analysis);
    let model = planner.build(&dataset)?;
    let solution = planner.solve(&model);

    let plan = match extract(&model.schema, &dataset, &solution)? {
        PlanOutcome::Optimal(plan) => plan,
        PlanOutcome::NoSolution(status) => {
            match format {
                Format::Json => println!("{}", json!({ "status": status.as_str() })),
                Format::Table => {
                    println!("Status: {}", status);
                    println!("No plan was produced; nothing was written.");
                }
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    match format {
        Format::Json => {
            let mut report = json!({ "status": "OPTIMAL", "plan": plan });
            if analysis {
                report["analysis"] = serde_json::to_value(&solution.analysis)?;
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Table => {
            print_plan(&dataset, &plan);
            if analysis {
                print_analysis(&solution.analysis);
            }
        }
    }

    if let Some(dir) = output {
        let written = tables::write_plan(&plan, dir).with_context(|| format!("exporting plan to {}", dir.display()))?;
        if format == Format::Table {
            println!();
            println!("Wrote {} tables to {}", written.len(), dir.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_plan(dataset: &Dataset, plan: &Plan) {
    println!("Status: OPTIMAL");
    println!("Total target fulfillment: {:.4}", plan.objective_value);
    println!();

    println!("{:>6} {:>14} {:>14} {:>14}", "year", "fulfillment", "labor used", "labor supply");
    for y in 0..plan.years() {
        println!(
            "{:>6} {:>14.4} {:>14.4} {:>14.4}",
            y,
            plan.target_fulfillment[y],
            plan.labor_supply_used[y],
            dataset.labor_supply(y)
        );
    }

    for (p, product) in dataset.products().iter().enumerate() {
        println!();
        match &product.unit {
            Some(unit) => println!("{} ({}):", product.name, unit),
            None => println!("{}:", product.name),
        }
        println!(
            "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "year", "output", "final", "productive", "accumulated", "target"
        );
        for y in 0..plan.years() {
            println!(
                "{:>6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                y,
                plan.output[y][p],
                plan.final_consumption[y][p],
                plan.productive_consumption[y][p],
                plan.accumulation[y][p],
                dataset.target(p, y)
            );
        }
    }
}

fn print_analysis(analysis: &Analysis) {
    println!();
    println!("Analysis:");
    println!();

    if !analysis.binding_constraints.is_empty() {
        println!("Binding constraints:");
        for name in &analysis.binding_constraints {
            println!("  - {}", name);
        }
        println!();
    }

    let labor = format!("{}_", Rule::LaborSupply.label());
    println!("Shadow prices of labor supply:");
    for sp in &analysis.shadow_prices {
        if sp.constraint.starts_with(&labor) && sp.value.abs() > 0.001 {
            println!("  {:30} {:10.4}", sp.constraint, sp.value);
        }
    }
}

fn model(input: &Path, limits: &Limits) -> anyhow::Result<ExitCode> {
    let dataset = load(input)?;
    let model = limits.planner(false).build(&dataset)?;

    println!("{}", model.problem);
    println!("\\ {} variables, {} constraints", model.num_variables(), model.num_constraints());
    for rule in Rule::ALL {
        let count = model.constraint_names(rule).len();
        if count > 0 {
            println!("\\   {:24} {}", rule.label(), count);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check(input: &Path) -> anyhow::Result<ExitCode> {
    match tables::load_dataset(input) {
        Ok(dataset) => {
            let size = ModelSize::of(&dataset);
            println!("✓ {} is valid", input.display());
            println!("  {} products", size.products);
            println!("  {} years", size.years);
            println!("  {} variables", size.variables);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ {} has errors:", input.display());
            eprintln!("  {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
