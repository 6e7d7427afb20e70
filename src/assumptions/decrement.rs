//! Decrement table keyed by product class, attained age and policy duration
//!
//! Tables may be select-and-ultimate: a class with a select period of `S` years
//! holds rows for durations `0..=S`, and every duration at or beyond `S` reads the
//! ultimate row. Aggregate tables use a select period of 0 (one row per age).
//! Lookups never fall back to a default; a missing row is an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contract::ProductClass;
use crate::error::{ProjectionError, Result};

/// Annual mortality and lapse probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecrementRate {
    pub mortality: f64,
    pub lapse: f64,
}

impl DecrementRate {
    /// Create a rate pair, rejecting probabilities outside [0, 1]
    pub fn new(mortality: f64, lapse: f64) -> Result<Self> {
        for (name, value) in [("mortality", mortality), ("lapse", lapse)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProjectionError::ProjectionFailed(format!(
                    "{} rate {} outside [0, 1]",
                    name, value
                )));
            }
        }
        Ok(Self { mortality, lapse })
    }

    /// Convert annual probabilities to a period of `months` months
    ///
    /// Standard actuarial conversion: q_p = 1 - (1 - q_annual)^(months/12)
    pub fn for_period(&self, months: u32) -> Self {
        if months == 12 {
            return *self;
        }
        let exponent = months as f64 / 12.0;
        Self {
            mortality: 1.0 - (1.0 - self.mortality).powf(exponent),
            lapse: 1.0 - (1.0 - self.lapse).powf(exponent),
        }
    }

    /// Probability of remaining in force through the period
    pub fn persistency(&self) -> f64 {
        (1.0 - self.mortality) * (1.0 - self.lapse)
    }
}

#[derive(Debug, Clone, Default)]
struct ClassTable {
    /// Durations at or beyond this read the ultimate row
    select_period: Option<u32>,
    /// Rates keyed by (attained age, duration)
    rates: BTreeMap<(u32, u32), DecrementRate>,
}

/// Immutable-after-load decrement rates for all product classes
#[derive(Debug, Clone, Default)]
pub struct DecrementTable {
    classes: BTreeMap<ProductClass, ClassTable>,
}

impl DecrementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate table with the same rates for every age in `min_age..=max_age`
    pub fn flat(
        product_class: ProductClass,
        min_age: u32,
        max_age: u32,
        mortality: f64,
        lapse: f64,
    ) -> Result<Self> {
        let rate = DecrementRate::new(mortality, lapse)?;
        let mut table = Self::new();
        table.set_select_period(product_class.clone(), 0);
        for age in min_age..=max_age {
            table.insert(product_class.clone(), age, 0, rate);
        }
        Ok(table)
    }

    /// Insert or replace a single row
    pub fn insert(
        &mut self,
        product_class: ProductClass,
        age: u32,
        duration: u32,
        rate: DecrementRate,
    ) {
        self.classes
            .entry(product_class)
            .or_default()
            .rates
            .insert((age, duration), rate);
    }

    /// Set the select period (in policy years) for a class
    pub fn set_select_period(&mut self, product_class: ProductClass, years: u32) {
        self.classes.entry(product_class).or_default().select_period = Some(years);
    }

    /// Look up the annual decrement rates for a key
    pub fn rate(
        &self,
        age: u32,
        duration: u32,
        product_class: &ProductClass,
    ) -> Result<DecrementRate> {
        let not_found = || ProjectionError::AssumptionNotFound {
            product_class: product_class.clone(),
            age,
            duration,
            period: None,
        };

        let class = self.classes.get(product_class).ok_or_else(not_found)?;
        let key_duration = match class.select_period {
            Some(select) => duration.min(select),
            None => duration,
        };

        class.rates.get(&(age, key_duration)).copied().ok_or_else(not_found)
    }

    /// Highest attained age with any row for the class
    pub fn max_age(&self, product_class: &ProductClass) -> Option<u32> {
        self.classes
            .get(product_class)
            .and_then(|c| c.rates.keys().map(|(age, _)| *age).max())
    }

    /// Lowest attained age with any row for the class
    pub fn min_age(&self, product_class: &ProductClass) -> Option<u32> {
        self.classes
            .get(product_class)
            .and_then(|c| c.rates.keys().map(|(age, _)| *age).min())
    }

    pub fn select_period(&self, product_class: &ProductClass) -> Option<u32> {
        self.classes.get(product_class).and_then(|c| c.select_period)
    }

    pub fn product_classes(&self) -> impl Iterator<Item = &ProductClass> {
        self.classes.keys()
    }

    /// Total number of rows across all classes
    pub fn len(&self) -> usize {
        self.classes.values().map(|c| c.rates.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
