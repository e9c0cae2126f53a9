use float_cmp::approx_eq;
use planner_model::{extract, Dataset, PlanModel, PlanOutcome, Planner, Rule, Table};
use planner_solver::{Solution, SolutionStatus};
use proptest::collection::vec;
use proptest::prelude::*;

const TOL: f64 = 1e-6;

fn one_product(targets: &[(&str, &[f64])]) -> Dataset {
    let flows = Table::from_rows("flows", &["grain"], &[("labor", &[1.0]), ("output", &[1.0]), ("grain", &[0.0])]).unwrap();
    let capital = Table::from_rows("capital_stock", &["grain"], &[("grain", &[0.0])]).unwrap();
    let depreciation = Table::from_rows("depreciation_rates", &["grain"], &[("grain", &[0.0])]).unwrap();
    let targets = Table::from_rows("targets", &["grain", "labor"], targets).unwrap();
    Dataset::new(&flows, &capital, &depreciation, &targets).unwrap()
}

/// Two products feeding each other, with capital stock and depreciation
fn coal_and_iron(capital_stock: bool, targets: &[(&str, &[f64])]) -> Dataset {
    let flows = Table::from_rows(
        "flows",
        &["coal", "iron"],
        &[
            ("labor", &[0.5, 1.0]),
            ("output", &[1.0, 1.0]),
            ("coal", &[0.1, 0.4]),
            ("iron", &[0.2, 0.0]),
        ],
    )
    .unwrap();
    let capital = if capital_stock {
        Table::from_rows("capital_stock", &["coal", "iron"], &[("coal", &[0.0, 1.0]), ("iron", &[2.0, 0.0])]).unwrap()
    } else {
        Table::from_rows("capital_stock", &["coal", "iron"], &[("coal", &[0.0, 0.0]), ("iron", &[0.0, 0.0])]).unwrap()
    };
    let depreciation =
        Table::from_rows("depreciation_rates", &["coal", "iron"], &[("coal", &[0.0, 0.1]), ("iron", &[0.05, 0.0])])
            .unwrap();
    let targets = Table::from_rows("targets", &["coal", "iron", "labor"], targets).unwrap();
    Dataset::new(&flows, &capital, &depreciation, &targets).unwrap()
}

/// Square matrices are row-major `[input * n + output]`, targets
/// `[year * n + product]`
struct Economy<'a> {
    products: &'a [&'a str],
    labor: &'a [f64],
    flows: &'a [f64],
    capital_stock: &'a [f64],
    depreciation_rates: &'a [f64],
    targets: &'a [f64],
    labor_supply: &'a [f64],
}

impl Economy<'_> {
    fn dataset(&self) -> Dataset {
        let n = self.products.len();
        let columns: Vec<String> = self.products.iter().map(|p| p.to_string()).collect();
        let square = |name: &str, values: &[f64]| {
            let mut table = Table::new(name, columns.clone());
            for (p, row) in self.products.iter().zip(values.chunks(n)) {
                table.push_row(*p, row.to_vec()).unwrap();
            }
            table
        };

        let mut flows = square("flows", self.flows);
        flows.push_row("labor", self.labor.to_vec()).unwrap();
        flows.push_row("output", vec![1.0; n]).unwrap();

        let mut target_columns = columns.clone();
        target_columns.push("labor".to_string());
        let mut targets = Table::new("targets", target_columns);
        for (y, (row, &supply)) in self.targets.chunks(n).zip(self.labor_supply).enumerate() {
            let mut values = row.to_vec();
            values.push(supply);
            targets.push_row(y.to_string(), values).unwrap();
        }

        Dataset::new(
            &flows,
            &square("capital_stock", self.capital_stock),
            &square("depreciation_rates", self.depreciation_rates),
            &targets,
        )
        .unwrap()
    }
}

/// Coal and steel feed tools; steel and tools are capital for everything
fn four_product_economy() -> Dataset {
    #[rustfmt::skip]
    let economy = Economy {
        products: &["coal", "steel", "grain", "tools"],
        labor: &[0.6, 1.2, 0.8, 1.5],
        flows: &[
            0.05, 0.4, 0.0, 0.1,
            0.1, 0.0, 0.0, 0.3,
            0.0, 0.0, 0.05, 0.0,
            0.02, 0.05, 0.1, 0.0,
        ],
        capital_stock: &[
            0.0, 0.0, 0.0, 0.0,
            2.0, 3.0, 0.5, 1.0,
            0.0, 0.0, 0.0, 0.0,
            0.5, 0.8, 1.5, 0.4,
        ],
        depreciation_rates: &[
            0.0, 0.0, 0.0, 0.0,
            0.05, 0.05, 0.05, 0.05,
            0.0, 0.0, 0.0, 0.0,
            0.1, 0.1, 0.1, 0.1,
        ],
        targets: &[
            1.0, 0.5, 3.0, 0.5,
            1.0, 0.5, 3.2, 0.5,
            1.2, 0.6, 3.4, 0.6,
            1.2, 0.6, 3.6, 0.6,
            1.4, 0.7, 3.8, 0.7,
        ],
        labor_supply: &[30.0, 32.0, 34.0, 36.0, 38.0],
    };
    economy.dataset()
}

fn three_year_economy() -> Dataset {
    coal_and_iron(
        true,
        &[("0", &[1.0, 1.0, 20.0]), ("1", &[1.0, 1.0, 20.0]), ("2", &[1.0, 1.5, 25.0])],
    )
}

#[test]
fn labor_bound_single_product() {
    let dataset = one_product(&[("0", &[1.0, 10.0]), ("1", &[1.0, 10.0])]);
    let planner = Planner::default();
    let model = planner.build(&dataset).unwrap();
    let solution = planner.solve(&model);

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert!(solution.analysis.binding_constraints.contains(&"labor_supply_0".to_string()));
    assert!(solution.analysis.binding_constraints.contains(&"labor_supply_1".to_string()));

    let outcome = extract(&model.schema, &dataset, &solution).unwrap();
    let plan = outcome.plan().expect("optimal plan");
    for y in 0..2 {
        assert!(approx_eq!(f64, plan.output[y][0], 10.0, epsilon = TOL), "output {}", plan.output[y][0]);
        assert!(approx_eq!(f64, plan.target_fulfillment[y], 10.0, epsilon = TOL));
        assert!(approx_eq!(f64, plan.final_consumption[y][0], 10.0, epsilon = TOL));
        assert!(approx_eq!(f64, plan.labor_supply_used[y], 10.0, epsilon = TOL));
    }
    assert!(approx_eq!(f64, plan.objective_value, 20.0, epsilon = TOL));
}

#[test]
fn no_labor_degrades_to_zero_fulfillment() {
    let dataset = one_product(&[("0", &[1.0, 0.0])]);
    let outcome = Planner::default().plan(&dataset).unwrap();

    // leontief constraints are ">= 0", so producing nothing stays feasible
    assert_eq!(outcome.status(), SolutionStatus::Optimal);
    let plan = outcome.plan().unwrap();
    assert!(approx_eq!(f64, plan.target_fulfillment[0], 0.0, epsilon = TOL));
    assert!(approx_eq!(f64, plan.output[0][0], 0.0, epsilon = TOL));
}

#[test]
fn solution_respects_model_invariants() {
    let dataset = three_year_economy();
    let planner = Planner::default();
    let model = planner.build(&dataset).unwrap();
    let solution = planner.solve(&model);

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert_invariants(&dataset, &model, &solution);
}

#[test]
fn four_products_over_five_years() {
    let dataset = four_product_economy();
    let planner = Planner::default();
    let model = planner.build(&dataset).unwrap();
    let solution = planner.solve(&model);

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert_invariants(&dataset, &model, &solution);

    let plan = extract(&model.schema, &dataset, &solution).unwrap();
    let plan = plan.plan().unwrap();
    assert!(plan.target_fulfillment.iter().all(|&tf| tf > 0.0), "{:?}", plan.target_fulfillment);

    // objective equals the dual bound built from the shadow prices
    let dual_bound: f64 = model
        .problem
        .constraints
        .iter()
        .map(|c| c.rhs * solution.shadow_price(&c.name).unwrap())
        .sum();
    assert!(
        approx_eq!(f64, dual_bound, solution.objective_value, epsilon = 1e-5 * (1.0 + solution.objective_value)),
        "dual bound {} objective {}",
        dual_bound,
        solution.objective_value
    );
}

/// Checks every generated constraint and the balance, leontief, depreciation
/// and recurrence identities on the extracted plan
fn assert_invariants(dataset: &Dataset, model: &PlanModel, solution: &Solution) {
    for c in &model.problem.constraints {
        assert!(c.is_satisfied(&solution.values, TOL), "violated: {}", c.name);
    }
    assert!(solution.values.iter().all(|&v| v >= -TOL));

    let plan = extract(&model.schema, dataset, solution).unwrap();
    let plan = plan.plan().unwrap();
    let n = dataset.num_products();
    assert!(plan.total_fulfillment() > 0.0);

    for y in 0..dataset.years() {
        for p in 0..n {
            let allocated = plan.accumulation[y][p] + plan.final_consumption[y][p] + plan.productive_consumption[y][p];
            assert!(approx_eq!(f64, plan.output[y][p], allocated, epsilon = TOL), "balance y={} p={}", y, p);

            if dataset.target(p, y) > 0.0 {
                assert!(plan.target_fulfillment[y] <= plan.final_consumption[y][p] / dataset.target(p, y) + TOL);
            }

            for q in 0..n {
                let stock = plan.capital_stock_for[y][p][q];
                assert!(approx_eq!(
                    f64,
                    plan.depreciation_in[y][p][q],
                    dataset.depreciation_rate(q, p) * stock,
                    epsilon = TOL
                ));
                if y == 0 {
                    assert!(stock <= dataset.capital_stock(q, p) + TOL);
                } else {
                    let carried = plan.capital_stock_for[y - 1][p][q] + plan.accumulation_for[y - 1][p][q]
                        - plan.depreciation_in[y - 1][p][q];
                    assert!(approx_eq!(f64, stock, carried, epsilon = TOL), "recurrence y={} p={} q={}", y, p, q);
                }
            }
        }
    }
}

#[test]
fn zero_flow_coefficient_has_no_flow_constraint() {
    let dataset = three_year_economy();
    let model = Planner::default().build(&dataset).unwrap();
    let iron = dataset.product_index("iron").unwrap();

    // io(iron, iron) is zero
    for y in 0..dataset.years() {
        let flow = model.schema.flow_for(y, iron, iron).index();
        for (tag, c) in model.tags.iter().zip(&model.problem.constraints) {
            if tag.rule == Rule::FlowCapacity {
                assert!(!c.references(flow), "{} references flow of iron into iron", c.name);
            }
        }
    }
    assert_eq!(model.constraint_names(Rule::FlowCapacity).len(), 3 * dataset.years());
}

#[test]
fn dropping_capital_requirements_never_hurts() {
    let scarce = three_year_economy();
    let plenty = coal_and_iron(
        false,
        &[("0", &[1.0, 1.0, 20.0]), ("1", &[1.0, 1.0, 20.0]), ("2", &[1.0, 1.5, 25.0])],
    );

    let planner = Planner::default();
    let scarce = planner.plan(&scarce).unwrap();
    let plenty = planner.plan(&plenty).unwrap();

    // without capital coefficients output is bounded by labor and flows only
    assert!(plenty.plan().unwrap().total_fulfillment() >= scarce.plan().unwrap().total_fulfillment() - TOL);
}

fn total_fulfillment(dataset: &Dataset) -> f64 {
    match Planner::default().plan(dataset).unwrap() {
        PlanOutcome::Optimal(plan) => plan.total_fulfillment(),
        PlanOutcome::NoSolution(status) => panic!("no solution: {}", status),
    }
}

const PRODUCTS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
const YEARS: usize = 5;

/// Small coefficients are dropped to zero so their ratio rules are skipped
fn sparse(values: Vec<f64>, below: f64) -> Vec<f64> {
    values.into_iter().map(|v| if v < below { 0.0 } else { v }).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn more_labor_never_lowers_fulfillment(
        labor0 in 0.0f64..30.0,
        labor1 in 0.0f64..30.0,
        extra in 0.0f64..15.0,
        year in 0usize..2,
    ) {
        let targets = [[1.0, 2.0, labor0], [2.0, 1.0, labor1]];
        let mut more = targets;
        more[year][2] += extra;

        let rows = |t: &[[f64; 3]; 2]| coal_and_iron(false, &[("0", &t[0][..]), ("1", &t[1][..])]);
        let base = total_fulfillment(&rows(&targets));
        let more = total_fulfillment(&rows(&more));

        prop_assert!(more >= base - TOL, "base {} more {}", base, more);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_economies_solve_to_optimal(
        (n, labor, flows, capital_stock, depreciation_rates, targets, labor_supply) in (4usize..=6).prop_flat_map(|n| (
            Just(n),
            vec(0.1f64..2.0, n),
            vec(0.0f64..0.15, n * n),
            vec(0.0f64..3.0, n * n),
            vec(0.0f64..0.2, n * n),
            vec(0.2f64..4.0, YEARS * n),
            vec(5.0f64..60.0, YEARS),
        )),
    ) {
        let flows = sparse(flows, 0.05);
        let capital_stock = sparse(capital_stock, 1.5);
        let economy = Economy {
            products: &PRODUCTS[..n],
            labor: &labor,
            flows: &flows,
            capital_stock: &capital_stock,
            depreciation_rates: &depreciation_rates,
            targets: &targets,
            labor_supply: &labor_supply,
        };
        let dataset = economy.dataset();
        let planner = Planner::default();
        let model = planner.build(&dataset).unwrap();
        let solution = planner.solve(&model);

        prop_assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_invariants(&dataset, &model, &solution);
    }
}
