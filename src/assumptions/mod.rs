//! Actuarial assumptions: decrement rates, expense loadings and the valuation rate

mod decrement;
mod expense;
pub mod loader;
mod store;

pub use decrement::{DecrementRate, DecrementTable};
pub use expense::ExpenseAssumptions;
pub use loader::LoadedAssumptions;
pub use store::AssumptionStore;

use std::path::Path;

use crate::contract::ProductClass;
use crate::error::Result;

/// A versioned, immutable set of projection assumptions
#[derive(Debug, Clone)]
pub struct AssumptionSet {
    /// Identifier reported with every projection made against this set
    pub version: String,
    pub decrements: DecrementTable,
    pub expenses: ExpenseAssumptions,
    /// Annual valuation interest rate
    pub valuation_rate: f64,
}

impl AssumptionSet {
    pub fn new(
        version: impl Into<String>,
        decrements: DecrementTable,
        expenses: ExpenseAssumptions,
        valuation_rate: f64,
    ) -> Self {
        Self {
            version: version.into(),
            decrements,
            expenses,
            valuation_rate,
        }
    }

    /// Single-class aggregate set with flat rates and no expenses
    pub fn flat(
        product_class: ProductClass,
        min_age: u32,
        max_age: u32,
        mortality: f64,
        lapse: f64,
    ) -> Result<Self> {
        Ok(Self::new(
            "flat",
            DecrementTable::flat(product_class, min_age, max_age, mortality, lapse)?,
            ExpenseAssumptions::none(),
            0.0,
        ))
    }

    /// Load assumptions from CSV files in the default location (data/assumptions/)
    pub fn from_csv() -> anyhow::Result<Self> {
        Self::from_csv_path(Path::new(loader::DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load assumptions from CSV files in a specific directory
    ///
    /// The directory name becomes the version.
    pub fn from_csv_path(path: &Path) -> anyhow::Result<Self> {
        let loaded = LoadedAssumptions::load_from(path)?;
        let version = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::info!(
            "loaded assumption set '{}' ({} decrement rows)",
            version,
            loaded.decrements.len()
        );

        Ok(Self::new(version, loaded.decrements, loaded.expenses, loaded.valuation_rate))
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_expenses(mut self, expenses: ExpenseAssumptions) -> Self {
        self.expenses = expenses;
        self
    }

    pub fn with_valuation_rate(mut self, rate: f64) -> Self {
        self.valuation_rate = rate;
        self
    }
}
