//! Flat arena of decision variables.
//!
//! Every family occupies one contiguous block. Inside a block, variables are
//! laid out year-major, then by product, then by input product, so the id of
//! `(family, year, p, q)` is a computed offset and no lookup tables exist.

use planner_solver::Variable;

use crate::dataset::Product;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    TargetFulfillment,
    LaborSupplyUsed,
    Accumulation,
    FinalConsumption,
    LaborFor,
    Output,
    ProductiveConsumption,
    AccumulationFor,
    CapitalStockFor,
    DepreciationIn,
    FlowFor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One variable per year
    Year,
    /// One variable per year and product
    YearProduct,
    /// One variable per year and product pair
    YearPair,
}

impl Family {
    pub const ALL: [Family; 11] = [
        Family::TargetFulfillment,
        Family::LaborSupplyUsed,
        Family::Accumulation,
        Family::FinalConsumption,
        Family::LaborFor,
        Family::Output,
        Family::ProductiveConsumption,
        Family::AccumulationFor,
        Family::CapitalStockFor,
        Family::DepreciationIn,
        Family::FlowFor,
    ];

    pub fn shape(self) -> Shape {
        match self {
            Family::TargetFulfillment | Family::LaborSupplyUsed => Shape::Year,
            Family::Accumulation
            | Family::FinalConsumption
            | Family::LaborFor
            | Family::Output
            | Family::ProductiveConsumption => Shape::YearProduct,
            Family::AccumulationFor | Family::CapitalStockFor | Family::DepreciationIn | Family::FlowFor => {
                Shape::YearPair
            }
        }
    }

    /// Stable name used for export tables
    pub fn table_name(self) -> &'static str {
        match self {
            Family::TargetFulfillment => "target_fulfillment_in_year",
            Family::LaborSupplyUsed => "labor_in_year",
            Family::Accumulation => "accumulation_of",
            Family::FinalConsumption => "final_consumption_of",
            Family::LaborFor => "labor_for",
            Family::Output => "output_of",
            Family::ProductiveConsumption => "productive_consumption_of",
            Family::AccumulationFor => "accumulation_for_of",
            Family::CapitalStockFor => "capital_stock_for_of",
            Family::DepreciationIn => "depreciation_in_production_of",
            Family::FlowFor => "flow_for_of",
        }
    }

    /// Declaration order, which is also the block order in the arena
    fn position(self) -> usize {
        self as usize
    }
}

/// Index of a variable in the arena, and in the solver's value vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a variable sits in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarKey {
    pub family: Family,
    pub year: usize,
    pub product: Option<usize>,
    pub input: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSchema {
    years: usize,
    products: usize,
    offsets: [usize; 11],
    len: usize,
}

impl VariableSchema {
    /// `2|Y| + 5|Y||P| + 4|Y||P|^2`, without allocating anything
    pub fn variable_count(years: usize, products: usize) -> usize {
        years * (2 + 5 * products + 4 * products * products)
    }

    pub fn new(years: usize, products: usize) -> Self {
        let mut offsets = [0; 11];
        let mut next = 0;
        for (offset, family) in offsets.iter_mut().zip(Family::ALL) {
            *offset = next;
            next += years * Self::block_stride(family, products);
        }
        Self {
            years,
            products,
            offsets,
            len: next,
        }
    }

    fn block_stride(family: Family, products: usize) -> usize {
        match family.shape() {
            Shape::Year => 1,
            Shape::YearProduct => products,
            Shape::YearPair => products * products,
        }
    }

    pub fn years(&self) -> usize {
        self.years
    }

    pub fn products(&self) -> usize {
        self.products
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn year_var(&self, family: Family, year: usize) -> VarId {
        debug_assert!(year < self.years);
        VarId(self.offsets[family.position()] + year)
    }

    fn product_var(&self, family: Family, year: usize, product: usize) -> VarId {
        debug_assert!(year < self.years && product < self.products);
        VarId(self.offsets[family.position()] + year * self.products + product)
    }

    fn pair_var(&self, family: Family, year: usize, product: usize, input: usize) -> VarId {
        debug_assert!(year < self.years && product < self.products && input < self.products);
        let n = self.products;
        VarId(self.offsets[family.position()] + year * n * n + product * n + input)
    }

    pub fn target_fulfillment(&self, year: usize) -> VarId {
        self.year_var(Family::TargetFulfillment, year)
    }

    pub fn labor_supply_used(&self, year: usize) -> VarId {
        self.year_var(Family::LaborSupplyUsed, year)
    }

    pub fn accumulation(&self, year: usize, product: usize) -> VarId {
        self.product_var(Family::Accumulation, year, product)
    }

    pub fn final_consumption(&self, year: usize, product: usize) -> VarId {
        self.product_var(Family::FinalConsumption, year, product)
    }

    pub fn labor_for(&self, year: usize, product: usize) -> VarId {
        self.product_var(Family::LaborFor, year, product)
    }

    pub fn output(&self, year: usize, product: usize) -> VarId {
        self.product_var(Family::Output, year, product)
    }

    pub fn productive_consumption(&self, year: usize, product: usize) -> VarId {
        self.product_var(Family::ProductiveConsumption, year, product)
    }

    /// Accumulation of `input` as capital for producing `product`
    pub fn accumulation_for(&self, year: usize, product: usize, input: usize) -> VarId {
        self.pair_var(Family::AccumulationFor, year, product, input)
    }

    /// Capital stock of `input` available for producing `product`
    pub fn capital_stock_for(&self, year: usize, product: usize, input: usize) -> VarId {
        self.pair_var(Family::CapitalStockFor, year, product, input)
    }

    /// Depreciation of `input` capital used for producing `product`
    pub fn depreciation_in(&self, year: usize, product: usize, input: usize) -> VarId {
        self.pair_var(Family::DepreciationIn, year, product, input)
    }

    /// Flow of `input` consumed while producing `product`
    pub fn flow_for(&self, year: usize, product: usize, input: usize) -> VarId {
        self.pair_var(Family::FlowFor, year, product, input)
    }

    /// Any variable by family and indices
    pub fn var(&self, key: VarKey) -> VarId {
        match key.family.shape() {
            Shape::Year => self.year_var(key.family, key.year),
            Shape::YearProduct => self.product_var(key.family, key.year, key.product.unwrap_or(0)),
            Shape::YearPair => self.pair_var(
                key.family,
                key.year,
                key.product.unwrap_or(0),
                key.input.unwrap_or(0),
            ),
        }
    }

    /// Inverse of the offset computation
    pub fn locate(&self, id: VarId) -> Option<VarKey> {
        if id.0 >= self.len {
            return None;
        }
        let pos = self.offsets.iter().rposition(|&offset| offset <= id.0)?;
        let family = Family::ALL[pos];
        let rel = id.0 - self.offsets[pos];
        let n = self.products;
        let key = match family.shape() {
            Shape::Year => VarKey {
                family,
                year: rel,
                product: None,
                input: None,
            },
            Shape::YearProduct => VarKey {
                family,
                year: rel / n,
                product: Some(rel % n),
                input: None,
            },
            Shape::YearPair => VarKey {
                family,
                year: rel / (n * n),
                product: Some(rel / n % n),
                input: Some(rel % n),
            },
        };
        Some(key)
    }

    pub fn variable_name(&self, id: VarId, products: &[Product]) -> String {
        let Some(key) = self.locate(id) else {
            return format!("x{}", id.0);
        };
        let name = |i: Option<usize>| i.and_then(|i| products.get(i)).map(|p| p.name.as_str()).unwrap_or("?");
        let (y, p, q) = (key.year, name(key.product), name(key.input));
        match key.family {
            Family::TargetFulfillment => format!("target_fulfillment_in_year_{y}"),
            Family::LaborSupplyUsed => format!("labor_in_year_{y}"),
            Family::Accumulation => format!("accumulation_of_{p}_year_{y}"),
            Family::FinalConsumption => format!("final_consumption_of_{p}_year_{y}"),
            Family::LaborFor => format!("labor_for_{p}_year_{y}"),
            Family::Output => format!("output_of_{p}_year_{y}"),
            Family::ProductiveConsumption => format!("productive_consumption_of_{p}_year_{y}"),
            Family::AccumulationFor => format!("accumulation_for_{p}_of_{q}_year_{y}"),
            Family::CapitalStockFor => format!("capital_stock_for_{p}_of_{q}_year_{y}"),
            Family::DepreciationIn => format!("depreciation_in_{p}_production_of_{q}_year_{y}"),
            Family::FlowFor => format!("flow_for_{p}_of_{q}_year_{y}"),
        }
    }

    /// Solver variables in id order, all with domain `[0, +inf)`
    pub fn variables(&self, products: &[Product]) -> Vec<Variable> {
        (0..self.len)
            .map(|i| Variable::non_negative(self.variable_name(VarId(i), products)))
            .collect()
    }
}
