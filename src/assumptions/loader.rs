//! CSV-based assumption loader
//!
//! Loads a versioned assumption set from CSV files in data/assumptions/:
//! - `decrement_rates.csv`: product_class,age,duration,mortality,lapse
//! - `select_periods.csv` (optional): product_class,select_period
//! - `parameters.csv`: name,value

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use super::decrement::{DecrementRate, DecrementTable};
use super::expense::ExpenseAssumptions;
use crate::contract::ProductClass;

/// Default path to assumptions directory
pub const DEFAULT_ASSUMPTIONS_PATH: &str = "data/assumptions";

#[derive(Debug, Deserialize)]
struct DecrementRow {
    product_class: String,
    age: u32,
    duration: u32,
    mortality: f64,
    lapse: f64,
}

#[derive(Debug, Deserialize)]
struct SelectPeriodRow {
    product_class: String,
    select_period: u32,
}

/// Load the decrement table, including select periods when present
pub fn load_decrement_table(path: &Path) -> Result<DecrementTable> {
    let file_path = path.join("decrement_rates.csv");
    let file = File::open(&file_path).with_context(|| format!("opening {}", file_path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut table = DecrementTable::new();

    for (line, result) in reader.deserialize::<DecrementRow>().enumerate() {
        let row: DecrementRow =
            result.with_context(|| format!("{} row {}", file_path.display(), line + 1))?;
        let rate = DecrementRate::new(row.mortality, row.lapse)
            .with_context(|| format!("{} row {}", file_path.display(), line + 1))?;
        table.insert(ProductClass::new(row.product_class), row.age, row.duration, rate);
    }

    let select_path = path.join("select_periods.csv");
    if select_path.exists() {
        let mut reader = csv::Reader::from_path(&select_path)
            .with_context(|| format!("opening {}", select_path.display()))?;
        for result in reader.deserialize::<SelectPeriodRow>() {
            let row: SelectPeriodRow = result?;
            table.set_select_period(ProductClass::new(row.product_class), row.select_period);
        }
    }

    if table.is_empty() {
        bail!("{} contains no rates", file_path.display());
    }

    Ok(table)
}

/// Load named scalar parameters
/// Returns HashMap<name, value>
pub fn load_parameters(path: &Path) -> Result<HashMap<String, f64>> {
    let file_path = path.join("parameters.csv");
    let file = File::open(&file_path).with_context(|| format!("opening {}", file_path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut parameters = HashMap::new();

    for result in reader.records() {
        let record = result?;
        let name = record[0].trim().to_string();
        let value: f64 = record[1]
            .trim()
            .parse()
            .with_context(|| format!("parameter '{}' is not a number", name))?;
        parameters.insert(name, value);
    }

    Ok(parameters)
}

/// Raw contents of an assumption directory
pub struct LoadedAssumptions {
    pub decrements: DecrementTable,
    pub expenses: ExpenseAssumptions,
    pub valuation_rate: f64,
}

impl LoadedAssumptions {
    /// Load all assumptions from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load all assumptions from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let decrements = load_decrement_table(path)?;
        let parameters = load_parameters(path)?;

        let get = |name: &str| parameters.get(name).copied().unwrap_or(0.0);
        let expenses = ExpenseAssumptions {
            per_policy: get("per_policy_expense"),
            premium_pct: get("premium_expense_pct"),
            claim_pct: get("claim_expense_pct"),
            inflation: get("expense_inflation"),
        };
        if !expenses.is_valid() {
            bail!("expense parameters must be finite and non-negative: {:?}", expenses);
        }

        let valuation_rate = parameters
            .get("valuation_rate")
            .copied()
            .context("parameters.csv is missing valuation_rate")?;
        if !valuation_rate.is_finite() || valuation_rate <= -1.0 {
            bail!("valuation_rate {} is not usable for discounting", valuation_rate);
        }

        Ok(Self { decrements, expenses, valuation_rate })
    }
}
