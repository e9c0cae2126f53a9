use log::debug;
use planner_solver::{Constraint, ConstraintOp};

use crate::dataset::Dataset;
use crate::schema::{VarId, VariableSchema};

/// The twelve rule families of the planning model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Final consumption over target bounds the year's fulfillment
    Leontief,
    /// Labor used equals the sum of labor per product
    LaborTotal,
    /// Labor used stays within the year's supply
    LaborSupply,
    /// Output needs its labor input
    LaborCapacity,
    /// Accumulation of a product equals the sum of its uses as capital
    AccumulationTotal,
    /// Productive consumption equals the sum of intermediate flows
    ProductiveConsumption,
    /// Output is split into accumulation, final and productive consumption
    Balance,
    /// Output needs capital stock of each input
    CapitalCapacity,
    /// Output needs intermediate flow of each input
    FlowCapacity,
    /// Depreciation is a fixed share of each capital stock
    Depreciation,
    /// Capital stock carried over from the previous year
    CapitalRecurrence,
    /// Year 0 capital stock is bounded by the exogenous stock
    InitialCapitalStock,
}

impl Rule {
    pub const ALL: [Rule; 12] = [
        Rule::Leontief,
        Rule::LaborTotal,
        Rule::LaborSupply,
        Rule::LaborCapacity,
        Rule::AccumulationTotal,
        Rule::ProductiveConsumption,
        Rule::Balance,
        Rule::CapitalCapacity,
        Rule::FlowCapacity,
        Rule::Depreciation,
        Rule::CapitalRecurrence,
        Rule::InitialCapitalStock,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Rule::Leontief => "leontief",
            Rule::LaborTotal => "labor_total",
            Rule::LaborSupply => "labor_supply",
            Rule::LaborCapacity => "labor",
            Rule::AccumulationTotal => "accumulation_total",
            Rule::ProductiveConsumption => "productive_consumption",
            Rule::Balance => "consumption",
            Rule::CapitalCapacity => "capital",
            Rule::FlowCapacity => "flow",
            Rule::Depreciation => "depreciation",
            Rule::CapitalRecurrence => "accumulation",
            Rule::InitialCapitalStock => "initial_capital_stock",
        }
    }
}

/// Which rule produced a constraint, and for which indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTag {
    pub rule: Rule,
    pub year: usize,
    pub product: Option<usize>,
    pub input: Option<usize>,
}

/// `numerator / denominator`, or `None` when there is nothing to constrain.
///
/// Every ratio in the model goes through here; a `None` means the
/// constraint using the ratio is left out entirely.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Append-only list of constraints with the rule that produced each one
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    tags: Vec<RuleTag>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, tag: RuleTag, name: String, terms: Vec<(VarId, f64)>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name,
            terms: terms.into_iter().map(|(id, coef)| (id.index(), coef)).collect(),
            op,
            rhs,
        });
        self.tags.push(tag);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn tags(&self) -> &[RuleTag] {
        &self.tags
    }

    /// Constraints generated by one rule
    pub fn of_rule(&self, rule: Rule) -> impl Iterator<Item = (&RuleTag, &Constraint)> {
        self.tags
            .iter()
            .zip(&self.constraints)
            .filter(move |(tag, _)| tag.rule == rule)
    }

    pub fn into_parts(self) -> (Vec<Constraint>, Vec<RuleTag>) {
        (self.constraints, self.tags)
    }
}

/// Emits the linear constraints of the planning model.
///
/// The whole schema exists before any constraint is generated, so year `y`
/// only ever reads the (already allocated) variables of year `y - 1`.
pub struct ConstraintGenerator<'a> {
    dataset: &'a Dataset,
    schema: &'a VariableSchema,
}

impl<'a> ConstraintGenerator<'a> {
    pub fn new(dataset: &'a Dataset, schema: &'a VariableSchema) -> Self {
        Self { dataset, schema }
    }

    /// Constraints for every year of the horizon
    pub fn generate(&self) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        for year in 0..self.schema.years() {
            let before = set.len();
            self.generate_year(year, &mut set);
            debug!("year {}: {} constraints", year, set.len() - before);
        }
        set
    }

    /// Year-wide rules, then per-product and per-pair rules
    pub fn generate_year(&self, y: usize, set: &mut ConstraintSet) {
        let s = self.schema;
        let n = self.dataset.num_products();
        let tag = |rule| RuleTag {
            rule,
            year: y,
            product: None,
            input: None,
        };

        // 1. targets given by leontief demand
        for p in 0..n {
            let target = self.dataset.target(p, y);
            let Some(weight) = ratio(1.0, target).filter(|_| target > 0.0) else {
                continue;
            };
            set.push(
                RuleTag {
                    product: Some(p),
                    ..tag(Rule::Leontief)
                },
                self.product_name(Rule::Leontief, y, p),
                vec![(s.final_consumption(y, p), weight), (s.target_fulfillment(y), -1.0)],
                ConstraintOp::Ge,
                0.0,
            );
        }

        // 2. labor total
        let mut terms = vec![(s.labor_supply_used(y), 1.0)];
        terms.extend((0..n).map(|p| (s.labor_for(y, p), -1.0)));
        set.push(
            tag(Rule::LaborTotal),
            self.year_name(Rule::LaborTotal, y),
            terms,
            ConstraintOp::Eq,
            0.0,
        );

        // 3. labor supply
        set.push(
            tag(Rule::LaborSupply),
            self.year_name(Rule::LaborSupply, y),
            vec![(s.labor_supply_used(y), 1.0)],
            ConstraintOp::Le,
            self.dataset.labor_supply(y),
        );

        for p in 0..n {
            self.generate_product(y, p, set);
        }
    }

    fn generate_product(&self, y: usize, p: usize, set: &mut ConstraintSet) {
        let s = self.schema;
        let d = self.dataset;
        let n = d.num_products();
        let tag = |rule| RuleTag {
            rule,
            year: y,
            product: Some(p),
            input: None,
        };

        // 4. labor needed for output
        if let Some(capacity) = ratio(d.output_coefficient(p), d.labor_coefficient(p)) {
            set.push(
                tag(Rule::LaborCapacity),
                self.product_name(Rule::LaborCapacity, y, p),
                vec![(s.output(y, p), -1.0), (s.labor_for(y, p), capacity)],
                ConstraintOp::Ge,
                0.0,
            );
        }

        // 5. accumulation total
        let mut terms = vec![(s.accumulation(y, p), 1.0)];
        terms.extend((0..n).map(|q| (s.accumulation_for(y, q, p), -1.0)));
        set.push(
            tag(Rule::AccumulationTotal),
            self.product_name(Rule::AccumulationTotal, y, p),
            terms,
            ConstraintOp::Eq,
            0.0,
        );

        // 6. productive consumption
        let mut terms = vec![(s.productive_consumption(y, p), 1.0)];
        terms.extend((0..n).map(|q| (s.flow_for(y, q, p), -1.0)));
        set.push(
            tag(Rule::ProductiveConsumption),
            self.product_name(Rule::ProductiveConsumption, y, p),
            terms,
            ConstraintOp::Eq,
            0.0,
        );

        // 7. balance of output
        set.push(
            tag(Rule::Balance),
            self.product_name(Rule::Balance, y, p),
            vec![
                (s.output(y, p), 1.0),
                (s.accumulation(y, p), -1.0),
                (s.final_consumption(y, p), -1.0),
                (s.productive_consumption(y, p), -1.0),
            ],
            ConstraintOp::Eq,
            0.0,
        );

        for q in 0..n {
            self.generate_pair(y, p, q, set);
        }
    }

    fn generate_pair(&self, y: usize, p: usize, q: usize, set: &mut ConstraintSet) {
        let s = self.schema;
        let d = self.dataset;
        let tag = |rule| RuleTag {
            rule,
            year: y,
            product: Some(p),
            input: Some(q),
        };

        // 8. output bounded by capital stock
        if let Some(capacity) = ratio(d.output_coefficient(p), d.capital_stock(q, p)) {
            set.push(
                tag(Rule::CapitalCapacity),
                self.pair_name(Rule::CapitalCapacity, y, p, q),
                vec![(s.capital_stock_for(y, p, q), capacity), (s.output(y, p), -1.0)],
                ConstraintOp::Ge,
                0.0,
            );
        }

        // 9. output bounded by intermediate flow
        if let Some(capacity) = ratio(d.output_coefficient(p), d.io(q, p)) {
            set.push(
                tag(Rule::FlowCapacity),
                self.pair_name(Rule::FlowCapacity, y, p, q),
                vec![(s.flow_for(y, p, q), capacity), (s.output(y, p), -1.0)],
                ConstraintOp::Ge,
                0.0,
            );
        }

        // 10. depreciation
        set.push(
            tag(Rule::Depreciation),
            self.pair_name(Rule::Depreciation, y, p, q),
            vec![
                (s.depreciation_in(y, p, q), 1.0),
                (s.capital_stock_for(y, p, q), -d.depreciation_rate(q, p)),
            ],
            ConstraintOp::Eq,
            0.0,
        );

        if y > 0 {
            // 11. capital stock carried over from last year
            set.push(
                tag(Rule::CapitalRecurrence),
                self.pair_name(Rule::CapitalRecurrence, y, p, q),
                vec![
                    (s.capital_stock_for(y - 1, p, q), 1.0),
                    (s.accumulation_for(y - 1, p, q), 1.0),
                    (s.depreciation_in(y - 1, p, q), -1.0),
                    (s.capital_stock_for(y, p, q), -1.0),
                ],
                ConstraintOp::Eq,
                0.0,
            );
        } else {
            // 12. initial capital stock
            set.push(
                tag(Rule::InitialCapitalStock),
                self.pair_name(Rule::InitialCapitalStock, y, p, q),
                vec![(s.capital_stock_for(y, p, q), 1.0)],
                ConstraintOp::Le,
                d.capital_stock(q, p),
            );
        }
    }

    fn year_name(&self, rule: Rule, y: usize) -> String {
        format!("{}_{}", rule.label(), y)
    }

    fn product_name(&self, rule: Rule, y: usize, p: usize) -> String {
        format!("{}_{}_year_{}", rule.label(), self.dataset.products()[p].name, y)
    }

    fn pair_name(&self, rule: Rule, y: usize, p: usize, q: usize) -> String {
        let products = self.dataset.products();
        format!("{}_{}_of_{}_year_{}", rule.label(), products[p].name, products[q].name, y)
    }
}
