//! Decrement engine: per-period rates to an in-force probability curve
//!
//! Mortality and lapse are independent competing risks applied multiplicatively:
//! p[t+1] = p[t] * (1 - q[t]) * (1 - w[t]), with p[0] = 1.0 at the valuation date.
//! Death and lapse are absorbing; there is no re-entry.

use serde::{Deserialize, Serialize};

use super::context::{ProjectionOptions, ValuationContext};
use super::timeline::Timeline;
use crate::assumptions::{DecrementRate, DecrementTable};
use crate::contract::{Contract, ExitCause};
use crate::error::{ProjectionError, Result};

/// In-force probabilities by period offset from the valuation date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve {
    /// p[0..=horizon]
    probabilities: Vec<f64>,
    /// Per-period rates; rates[t] moves p[t] to p[t+1]
    rates: Vec<DecrementRate>,
}

impl SurvivalCurve {
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn rates(&self) -> &[DecrementRate] {
        &self.rates
    }

    /// Last period index with a probability
    pub fn horizon(&self) -> u32 {
        (self.probabilities.len() - 1) as u32
    }

    /// Probability of being in force at the start of period `t`
    pub fn in_force(&self, t: u32) -> Option<f64> {
        self.probabilities.get(t as usize).copied()
    }

    /// Probability of exiting by `cause` during period `t - 1`, paid at period `t`
    ///
    /// Zero at period 0 (no exits precede the valuation date).
    pub fn exit_probability(&self, t: u32, cause: ExitCause) -> Option<f64> {
        if t == 0 {
            return self.in_force(0).map(|_| 0.0);
        }
        let idx = (t - 1) as usize;
        let p_prev = *self.probabilities.get(idx)?;
        let rate = self.rates.get(idx)?;

        Some(match cause {
            ExitCause::Death => p_prev * rate.mortality,
            ExitCause::Lapse => p_prev * (1.0 - rate.mortality) * rate.lapse,
            ExitCause::Any => p_prev - self.probabilities[idx + 1],
        })
    }
}

/// Builds survival curves from the decrement table
pub struct DecrementEngine<'a> {
    table: &'a DecrementTable,
    options: &'a ProjectionOptions,
}

impl<'a> DecrementEngine<'a> {
    pub fn new(table: &'a DecrementTable, options: &'a ProjectionOptions) -> Self {
        Self { table, options }
    }

    /// Survival curve for the contract's remaining lifetime
    pub fn survival_curve(
        &self,
        contract: &Contract,
        ctx: &ValuationContext,
    ) -> Result<SurvivalCurve> {
        let timeline = Timeline::build(contract, ctx, self.options, self.table)?;
        self.curve_on(contract, &timeline)
    }

    /// Survival curve on an already validated timeline
    pub(crate) fn curve_on(
        &self,
        contract: &Contract,
        timeline: &Timeline,
    ) -> Result<SurvivalCurve> {
        let capacity = timeline.periods as usize + 1;
        let mut probabilities = Vec::with_capacity(capacity);
        let mut rates = Vec::with_capacity(capacity);
        probabilities.push(1.0);

        let mut in_force = 1.0;
        for t in 0..timeline.periods {
            let start = timeline.period_start(t)?;
            let duration = contract.duration_years(start).ok_or_else(|| {
                ProjectionError::ProjectionFailed(format!("period {} starts before issue", t))
            })?;
            let age = contract.attained_age(start).ok_or_else(|| {
                ProjectionError::ProjectionFailed(format!("attained age overflows in period {}", t))
            })?;

            let annual = self
                .table
                .rate(age, duration, &contract.product_class)
                .map_err(|e| e.at_period(t))?;
            let rate = annual.for_period(timeline.period_months);

            let next = in_force * rate.persistency();
            check_transition(in_force, next, t)?;

            rates.push(rate);
            probabilities.push(next);
            in_force = next;

            if next < self.options.probability_floor {
                log::debug!(
                    "{}: in-force probability {:.3e} below floor after period {}",
                    contract.contract_no,
                    next,
                    t
                );
                break;
            }
        }

        Ok(SurvivalCurve { probabilities, rates })
    }
}

/// Reject probabilities outside [0, 1] or increasing between periods
fn check_transition(previous: f64, next: f64, t: u32) -> Result<()> {
    if !next.is_finite() || !(0.0..=1.0).contains(&next) {
        return Err(ProjectionError::ProjectionFailed(format!(
            "in-force probability {} outside [0, 1] at period {}",
            next,
            t + 1
        )));
    }
    if next > previous {
        return Err(ProjectionError::ProjectionFailed(format!(
            "in-force probability increased from {} to {} at period {}",
            previous,
            next,
            t + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{BenefitClause, Frequency, ProductClass};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn contract(entry_age: u32, term: Option<u32>) -> Contract {
        Contract::new("S-1", d(2020, 1, 1), entry_age, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::survival("annuity", 100.0, Frequency::Annual, term))
    }

    #[test]
    fn test_flat_mortality_curve() {
        let table = DecrementTable::flat(ProductClass::new("TERM"), 18, 100, 0.01, 0.0).unwrap();
        let options = ProjectionOptions::default();
        let engine = DecrementEngine::new(&table, &options);

        let curve = engine
            .survival_curve(&contract(40, Some(10)), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();

        assert_eq!(curve.horizon(), 10);
        assert_eq!(curve.in_force(0), Some(1.0));
        assert_relative_eq!(curve.in_force(1).unwrap(), 0.99, epsilon = 1e-12);
        assert_relative_eq!(curve.in_force(2).unwrap(), 0.9801, epsilon = 1e-12);
        assert_relative_eq!(curve.in_force(10).unwrap(), 0.99_f64.powi(10), epsilon = 1e-12);
    }

    #[test]
    fn test_exit_probabilities_partition_decrements() {
        let table = DecrementTable::flat(ProductClass::new("TERM"), 18, 100, 0.02, 0.05).unwrap();
        let options = ProjectionOptions::default();
        let engine = DecrementEngine::new(&table, &options);
        let curve = engine
            .survival_curve(&contract(50, Some(5)), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();

        for t in 1..=curve.horizon() {
            let death = curve.exit_probability(t, ExitCause::Death).unwrap();
            let lapse = curve.exit_probability(t, ExitCause::Lapse).unwrap();
            let any = curve.exit_probability(t, ExitCause::Any).unwrap();
            assert_relative_eq!(death + lapse, any, epsilon = 1e-12);
        }
        assert_eq!(curve.exit_probability(0, ExitCause::Any), Some(0.0));
        assert_eq!(curve.exit_probability(curve.horizon() + 1, ExitCause::Death), None);
    }

    #[test]
    fn test_probability_floor_truncates() {
        let table = DecrementTable::flat(ProductClass::new("TERM"), 18, 100, 0.5, 0.5).unwrap();
        let options = ProjectionOptions::default().with_probability_floor(0.01);
        let engine = DecrementEngine::new(&table, &options);

        let curve = engine
            .survival_curve(&contract(30, None), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();

        // 0.25^4 = 0.0039 is the first value under 1%
        assert_eq!(curve.horizon(), 4);
        assert!(curve.in_force(4).unwrap() < 0.01);
        assert!(curve.in_force(3).unwrap() >= 0.01);
    }

    #[test]
    fn test_gap_in_table_reports_period() {
        // Rows stop at 45 with an isolated row at 60, leaving a gap from age 46
        let mut table = DecrementTable::flat(ProductClass::new("TERM"), 40, 45, 0.01, 0.0).unwrap();
        table.insert(ProductClass::new("TERM"), 60, 0, DecrementRate::new(0.02, 0.0).unwrap());
        let options = ProjectionOptions::default();
        let engine = DecrementEngine::new(&table, &options);

        let err = engine
            .survival_curve(&contract(40, None), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap_err();

        assert_eq!(
            err,
            ProjectionError::AssumptionNotFound {
                product_class: ProductClass::new("TERM"),
                age: 46,
                duration: 6,
                period: Some(6),
            }
        );
    }

    #[test]
    fn test_seasoned_policy_uses_attained_age() {
        let class = ProductClass::new("TERM");
        let mut table = DecrementTable::new();
        table.set_select_period(class.clone(), 0);
        for age in 18..=100 {
            let q = if age >= 45 { 0.05 } else { 0.0 };
            table.insert(class.clone(), age, 0, DecrementRate::new(q, 0.0).unwrap());
        }
        let options = ProjectionOptions::default();
        let engine = DecrementEngine::new(&table, &options);

        // Issued at 40 in 2020, valued in 2025 at attained age 45
        let curve = engine
            .survival_curve(&contract(40, Some(20)), &ValuationContext::new(d(2025, 1, 1)))
            .unwrap();
        assert_relative_eq!(curve.in_force(1).unwrap(), 0.95, epsilon = 1e-12);
        assert_eq!(curve.horizon(), 15);
    }
}
