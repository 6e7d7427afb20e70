//! Valuation context and projection configuration

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default cap on projected periods when the caller does not set one
pub const DEFAULT_HORIZON_PERIODS: u32 = 1_500;

/// Default in-force probability below which the projection stops
pub const DEFAULT_PROBABILITY_FLOOR: f64 = 1e-10;

/// Per-request valuation inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationContext {
    /// Date the projection starts from (period 0)
    pub value_date: NaiveDate,

    /// Maximum number of periods to project
    pub projection_horizon_periods: u32,

    /// Assumption set version the caller expects, if pinned
    pub assumption_set_version: Option<String>,
}

impl ValuationContext {
    pub fn new(value_date: NaiveDate) -> Self {
        Self {
            value_date,
            projection_horizon_periods: DEFAULT_HORIZON_PERIODS,
            assumption_set_version: None,
        }
    }

    pub fn with_horizon(mut self, periods: u32) -> Self {
        self.projection_horizon_periods = periods;
        self
    }

    pub fn with_assumption_version(mut self, version: impl Into<String>) -> Self {
        self.assumption_set_version = Some(version.into());
        self
    }
}

/// Length of one projection period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodLength {
    #[default]
    Annual,
    Monthly,
}

impl PeriodLength {
    pub fn months(&self) -> u32 {
        match self {
            PeriodLength::Annual => 12,
            PeriodLength::Monthly => 1,
        }
    }
}

/// Discounting mode for projected amounts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "rate", rename_all = "snake_case")]
pub enum Discounting {
    /// Raw expected amounts
    #[default]
    None,
    /// Flat annual rate
    Rate(f64),
    /// Annual spot rates by period index; periods past the end use the last rate
    SpotCurve(Vec<f64>),
    /// The assumption set's valuation rate
    ValuationRate,
}

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionOptions {
    /// Projection period length
    pub period: PeriodLength,

    /// Raw or present-value output
    pub discounting: Discounting,

    /// Stop once the in-force probability drops below this
    pub probability_floor: f64,

    /// Add expense loadings from the assumption set
    pub include_expenses: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            period: PeriodLength::Annual,
            discounting: Discounting::None,
            probability_floor: DEFAULT_PROBABILITY_FLOOR,
            include_expenses: true,
        }
    }
}

impl ProjectionOptions {
    /// Monthly periods, otherwise default
    pub fn monthly() -> Self {
        Self {
            period: PeriodLength::Monthly,
            ..Default::default()
        }
    }

    pub fn discounted_at(mut self, annual_rate: f64) -> Self {
        self.discounting = Discounting::Rate(annual_rate);
        self
    }

    pub fn with_discounting(mut self, discounting: Discounting) -> Self {
        self.discounting = discounting;
        self
    }

    pub fn without_expenses(mut self) -> Self {
        self.include_expenses = false;
        self
    }

    pub fn with_probability_floor(mut self, floor: f64) -> Self {
        self.probability_floor = floor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProjectionOptions::default();
        assert_eq!(options.period.months(), 12);
        assert_eq!(options.discounting, Discounting::None);
        assert!(options.include_expenses);

        let ctx = ValuationContext::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ctx.projection_horizon_periods, DEFAULT_HORIZON_PERIODS);
        assert!(ctx.assumption_set_version.is_none());
    }

    #[test]
    fn test_builder_helpers() {
        let options = ProjectionOptions::monthly().discounted_at(0.04).without_expenses();
        assert_eq!(options.period, PeriodLength::Monthly);
        assert_eq!(options.discounting, Discounting::Rate(0.04));
        assert!(!options.include_expenses);
    }
}
