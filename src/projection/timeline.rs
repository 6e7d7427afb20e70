//! Period grid for a single projection
//!
//! Period `t` starts on `value_date + t * period_months` and runs to the start of
//! period `t + 1`. The grid ends at contract maturity or the context horizon,
//! whichever comes first.

use chrono::NaiveDate;

use super::context::{ProjectionOptions, ValuationContext};
use crate::assumptions::DecrementTable;
use crate::calendar::{add_months, elapsed_months};
use crate::contract::Contract;
use crate::error::{ProjectionError, Result};

/// Validated timing of one contract on the projection grid
#[derive(Debug, Clone)]
pub struct Timeline {
    pub value_date: NaiveDate,
    pub period_months: u32,
    /// Number of projection periods before maturity (capped by the horizon)
    pub periods: u32,
    /// Exclusive end of the latest clause
    pub maturity: NaiveDate,
    /// Highest attained age covered by the decrement table for the contract's class
    pub max_age: u32,
    /// Start of period `periods`
    horizon_end: NaiveDate,
}

impl Timeline {
    /// Validate the contract against the table and lay out its periods
    pub fn build(
        contract: &Contract,
        ctx: &ValuationContext,
        options: &ProjectionOptions,
        table: &DecrementTable,
    ) -> Result<Self> {
        let duration = contract.duration_years(ctx.value_date).ok_or_else(|| {
            ProjectionError::before_issue(
                &contract.contract_no,
                contract.issue_date,
                ctx.value_date,
            )
        })?;

        let class = &contract.product_class;
        let (min_age, max_age) = match (table.min_age(class), table.max_age(class)) {
            (Some(min_age), Some(max_age)) => (min_age, max_age),
            _ => {
                return Err(ProjectionError::AssumptionNotFound {
                    product_class: class.clone(),
                    age: contract.entry_age.saturating_add(duration),
                    duration,
                    period: None,
                })
            }
        };

        contract.validate(min_age, max_age)?;

        let period_months = options.period.months();
        let maturity = contract.maturity_date(max_age)?;
        let periods = periods_before(ctx.value_date, maturity, period_months)
            .min(ctx.projection_horizon_periods);
        let horizon_end = add_months(ctx.value_date, periods * period_months)?;

        Ok(Self {
            value_date: ctx.value_date,
            period_months,
            periods,
            maturity,
            max_age,
            horizon_end,
        })
    }

    /// First day of period `t`
    pub fn period_start(&self, t: u32) -> Result<NaiveDate> {
        add_months(self.value_date, t * self.period_months)
    }

    /// Period in which a dated payment falls, if it lies inside the grid
    pub fn payment_period(&self, date: NaiveDate) -> Option<u32> {
        if date >= self.horizon_end {
            return None;
        }
        elapsed_months(self.value_date, date).map(|m| m / self.period_months)
    }

    /// Exclusive end of the grid
    pub fn horizon_end(&self) -> NaiveDate {
        self.horizon_end
    }
}

/// Number of periods whose start falls before `end`
fn periods_before(start: NaiveDate, end: NaiveDate, period_months: u32) -> u32 {
    let Some(months) = elapsed_months(start, end) else {
        return 0;
    };

    // Month offsets k with start + k months < end
    let exclusive = match add_months(start, months) {
        Ok(d) if d == end => months,
        _ => months + 1,
    };

    exclusive.div_ceil(period_months)
}
