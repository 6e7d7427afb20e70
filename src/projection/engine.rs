//! Core projection engine: survival curve and nominal schedule to expected cashflows

use std::sync::Arc;

use rayon::prelude::*;

use super::cashflows::{CashflowComponents, CashflowRecord, ProjectionResult};
use super::context::{Discounting, ProjectionOptions, ValuationContext};
use super::discount::DiscountCurve;
use super::schedule::{NominalSchedule, ScheduleGenerator};
use super::survival::{DecrementEngine, SurvivalCurve};
use super::timeline::Timeline;
use crate::assumptions::AssumptionSet;
use crate::contract::{Contract, WeightingRule};
use crate::error::{ProjectionError, Result};

/// Main projection engine
///
/// Holds one assumption snapshot for its whole lifetime, so every projection
/// it runs sees the same reference data.
pub struct ProjectionEngine {
    assumptions: Arc<AssumptionSet>,
    options: ProjectionOptions,
}

impl ProjectionEngine {
    /// Create a new projection engine with given assumptions and options
    pub fn new(assumptions: Arc<AssumptionSet>, options: ProjectionOptions) -> Self {
        Self { assumptions, options }
    }

    pub fn assumptions(&self) -> &AssumptionSet {
        &self.assumptions
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    /// Survival curve for a contract on this engine's period grid
    pub fn survival_curve(
        &self,
        contract: &Contract,
        ctx: &ValuationContext,
    ) -> Result<SurvivalCurve> {
        self.check_version(ctx)?;
        DecrementEngine::new(&self.assumptions.decrements, &self.options)
            .survival_curve(contract, ctx)
    }

    /// Nominal (unweighted, undiscounted) schedule for a contract
    pub fn nominal_schedule(
        &self,
        contract: &Contract,
        ctx: &ValuationContext,
    ) -> Result<NominalSchedule> {
        self.check_version(ctx)?;
        ScheduleGenerator::new(&self.assumptions, &self.options).nominal_schedule(contract, ctx)
    }

    /// Run projection for a single contract
    pub fn project(&self, contract: &Contract, ctx: &ValuationContext) -> Result<ProjectionResult> {
        self.check_version(ctx)?;

        let timeline = Timeline::build(contract, ctx, &self.options, &self.assumptions.decrements)?;
        let curve = DecrementEngine::new(&self.assumptions.decrements, &self.options)
            .curve_on(contract, &timeline)?;
        let schedule = ScheduleGenerator::new(&self.assumptions, &self.options)
            .schedule_on(contract, &timeline)?;
        let discount =
            DiscountCurve::for_mode(&self.options.discounting, self.assumptions.valuation_rate)?;

        let mut result = ProjectionResult::new(
            &contract.contract_no,
            ctx.value_date,
            &self.assumptions.version,
            self.options.discounting != Discounting::None,
        );

        for entry in schedule.entries() {
            let Some(weight) = entry_weight(&curve, entry.period, entry.weighting) else {
                // Past the floor cut-off
                continue;
            };
            let factor = discount.factor(entry.period, timeline.period_months);
            let value = entry.amount * weight * factor;

            match result.records.last_mut() {
                Some(record) if record.period == entry.period => {
                    record.amount += value;
                    record.components.add(entry.kind, entry.weighting, value);
                }
                _ => {
                    let mut components = CashflowComponents::default();
                    components.add(entry.kind, entry.weighting, value);
                    result.records.push(CashflowRecord {
                        period: entry.period,
                        probability_weight: curve.in_force(entry.period).unwrap_or(0.0),
                        amount: value,
                        discount_factor: factor,
                        components,
                    });
                }
            }
        }

        check_records(&result)?;

        log::debug!(
            "{}: {} records over {} periods, curve horizon {}, total {:.2}",
            contract.contract_no,
            result.records.len(),
            timeline.periods,
            curve.horizon(),
            result.total()
        );

        Ok(result)
    }

    /// Project many contracts in parallel against this engine's snapshot
    ///
    /// Results keep the input order; one failing contract does not affect the others.
    pub fn project_batch(
        &self,
        contracts: &[Contract],
        ctx: &ValuationContext,
    ) -> Vec<Result<ProjectionResult>> {
        contracts.par_iter().map(|contract| self.project(contract, ctx)).collect()
    }

    fn check_version(&self, ctx: &ValuationContext) -> Result<()> {
        match &ctx.assumption_set_version {
            Some(expected) if *expected != self.assumptions.version => {
                Err(ProjectionError::ProjectionFailed(format!(
                    "assumption set version '{}' requested but '{}' is loaded",
                    expected, self.assumptions.version
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Probability weight for an entry at period `t`; None beyond the curve
fn entry_weight(curve: &SurvivalCurve, t: u32, weighting: WeightingRule) -> Option<f64> {
    match weighting {
        WeightingRule::Survival => curve.in_force(t),
        WeightingRule::Exit { cause } => curve.exit_probability(t, cause),
        WeightingRule::Certain => Some(1.0),
    }
}

fn check_records(result: &ProjectionResult) -> Result<()> {
    for record in &result.records {
        if !record.amount.is_finite() {
            return Err(ProjectionError::ProjectionFailed(format!(
                "{}: non-finite amount {} at period {}",
                result.contract_no, record.amount, record.period
            )));
        }
        if !(0.0..=1.0).contains(&record.probability_weight) {
            return Err(ProjectionError::ProjectionFailed(format!(
                "{}: probability weight {} outside [0, 1] at period {}",
                result.contract_no, record.probability_weight, record.period
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{DecrementRate, DecrementTable, ExpenseAssumptions};
    use crate::contract::{BenefitClause, ExitCause, Frequency, ProductClass};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn flat_engine(q: f64, w: f64, options: ProjectionOptions) -> ProjectionEngine {
        let set = AssumptionSet::flat(ProductClass::new("TERM"), 18, 100, q, w).unwrap();
        ProjectionEngine::new(Arc::new(set), options)
    }

    fn annuity(entry_age: u32, term: u32) -> Contract {
        Contract::new("E-1", d(2020, 1, 1), entry_age, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::survival("annuity", 100.0, Frequency::Annual, Some(term)))
    }

    #[test]
    fn test_level_annuity_scenario() {
        let engine = flat_engine(0.01, 0.0, ProjectionOptions::default());
        let result = engine
            .project(&annuity(40, 10), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();

        assert_eq!(result.records.len(), 10);
        assert_eq!(result.assumption_version, "flat");
        assert!(!result.discounted);
        for (t, record) in result.records.iter().enumerate() {
            let p = 0.99_f64.powi(t as i32);
            assert_eq!(record.period, t as u32);
            assert_relative_eq!(record.probability_weight, p, epsilon = 1e-12);
            assert_relative_eq!(record.amount, 100.0 * p, epsilon = 1e-9);
        }
        assert_relative_eq!(result.amount_at(2), 98.01, epsilon = 1e-9);
        assert_eq!(result.amount_at(10), 0.0);
    }

    #[test]
    fn test_zero_decrements_give_zero_exit_amounts() {
        let engine = flat_engine(0.0, 0.0, ProjectionOptions::default());
        let contract = annuity(40, 5)
            .with_benefit(BenefitClause::on_exit("death", 1e6, ExitCause::Any, Some(5)));

        let curve = engine
            .survival_curve(&contract, &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();
        assert!(curve.probabilities().iter().all(|p| *p == 1.0));

        let result = engine.project(&contract, &ValuationContext::new(d(2020, 1, 1))).unwrap();
        assert!(result.records.iter().all(|r| r.components.exit_benefits == 0.0));
        assert_relative_eq!(result.total(), 500.0);
    }

    #[test]
    fn test_death_benefit_weighting() {
        let engine = flat_engine(0.02, 0.05, ProjectionOptions::default());
        let contract = Contract::new("E-2", d(2020, 1, 1), 50, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::on_exit("death", 1_000.0, ExitCause::Death, Some(3)))
            .with_benefit(BenefitClause::on_exit("surrender", 200.0, ExitCause::Lapse, Some(3)));

        let result = engine.project(&contract, &ValuationContext::new(d(2020, 1, 1))).unwrap();
        let periods: Vec<u32> = result.records.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![1, 2, 3]);

        let persistency = 0.98 * 0.95;
        assert_relative_eq!(
            result.amount_at(1),
            1_000.0 * 0.02 + 200.0 * 0.98 * 0.05,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            result.amount_at(2),
            persistency * (1_000.0 * 0.02 + 200.0 * 0.98 * 0.05),
            epsilon = 1e-9
        );
        assert_relative_eq!(result.records[0].probability_weight, persistency, epsilon = 1e-12);
    }

    #[test]
    fn test_contract_entirely_before_value_date_is_empty() {
        let engine = flat_engine(0.01, 0.0, ProjectionOptions::default());
        let contract = Contract::new("E-3", d(2000, 1, 1), 30, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::survival("annuity", 100.0, Frequency::Annual, Some(5)))
            .with_benefit(BenefitClause::fixed_date(
                "bonus",
                50.0,
                d(2003, 1, 1),
                WeightingRule::Certain,
            ));

        let result = engine.project(&contract, &ValuationContext::new(d(2020, 1, 1))).unwrap();
        assert!(result.is_empty());
        assert!(result.amounts().is_empty());
    }

    #[test]
    fn test_entry_age_below_table_is_invalid() {
        let mut table = DecrementTable::new();
        let class = ProductClass::new("TERM");
        table.set_select_period(class.clone(), 0);
        for age in (50..=100).filter(|age| *age != 55) {
            table.insert(class.clone(), age, 0, DecrementRate::new(0.01, 0.0).unwrap());
        }
        let set = AssumptionSet::new("gappy", table, ExpenseAssumptions::none(), 0.0);
        let engine = ProjectionEngine::new(Arc::new(set), ProjectionOptions::default());
        let ctx = ValuationContext::new(d(2020, 1, 1));

        let err = engine.project(&annuity(40, 10), &ctx).unwrap_err();
        assert_eq!(err.kind(), "InvalidContractTerm");

        // A hole inside the covered ages is still a missing assumption
        let err = engine.project(&annuity(52, 10), &ctx).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::AssumptionNotFound {
                product_class: ProductClass::new("TERM"),
                age: 55,
                duration: 3,
                period: Some(3),
            }
        );
    }

    #[test]
    fn test_discounting_round_trip() {
        let contract = annuity(45, 15)
            .with_benefit(BenefitClause::on_exit("death", 10_000.0, ExitCause::Death, Some(15)))
            .with_premium(250.0, Frequency::Annual, None);
        let ctx = ValuationContext::new(d(2022, 7, 1));

        let raw = flat_engine(0.01, 0.03, ProjectionOptions::default())
            .project(&contract, &ctx)
            .unwrap();
        let pv = flat_engine(0.01, 0.03, ProjectionOptions::default().discounted_at(0.04))
            .project(&contract, &ctx)
            .unwrap();

        assert!(pv.discounted);
        assert_eq!(raw.records.len(), pv.records.len());
        for (r, v) in raw.records.iter().zip(&pv.records) {
            assert_eq!(r.period, v.period);
            let factor = 1.04_f64.powi(-(r.period as i32));
            assert_relative_eq!(v.amount, r.amount * factor, epsilon = 1e-9);
            assert_relative_eq!(v.discount_factor, factor, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_valuation_rate_discounting() {
        let set = AssumptionSet::flat(ProductClass::new("TERM"), 18, 100, 0.0, 0.0)
            .unwrap()
            .with_valuation_rate(0.05);
        let options = ProjectionOptions::default().with_discounting(Discounting::ValuationRate);
        let engine = ProjectionEngine::new(Arc::new(set), options);

        let result = engine
            .project(&annuity(40, 2), &ValuationContext::new(d(2020, 1, 1)))
            .unwrap();
        assert_relative_eq!(result.amount_at(1), 100.0 / 1.05, epsilon = 1e-9);
    }

    #[test]
    fn test_monthly_periods() {
        let engine = flat_engine(0.12, 0.0, ProjectionOptions::monthly());
        let contract = Contract::new("E-4", d(2020, 1, 1), 40, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::survival("income", 10.0, Frequency::Monthly, Some(1)));

        let result = engine.project(&contract, &ValuationContext::new(d(2020, 1, 1))).unwrap();
        assert_eq!(result.records.len(), 12);

        // Twelve monthly survivals compound back to the annual rate
        let monthly_p = (0.88_f64).powf(1.0 / 12.0);
        assert_relative_eq!(result.amount_at(11), 10.0 * monthly_p.powi(11), epsilon = 1e-9);
    }

    #[test]
    fn test_expenses_and_premiums_signed() {
        let set = AssumptionSet::flat(ProductClass::new("TERM"), 18, 100, 0.0, 0.0)
            .unwrap()
            .with_expenses(ExpenseAssumptions {
                per_policy: 60.0,
                premium_pct: 0.05,
                claim_pct: 0.0,
                inflation: 0.0,
            });
        let engine = ProjectionEngine::new(Arc::new(set), ProjectionOptions::default());
        let contract = Contract::new("E-5", d(2020, 1, 1), 40, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::on_exit("death", 50_000.0, ExitCause::Death, Some(2)))
            .with_premium(1_000.0, Frequency::Annual, None);

        let result = engine.project(&contract, &ValuationContext::new(d(2020, 1, 1))).unwrap();
        let first = &result.records[0];
        assert_eq!(first.components.premiums, -1_000.0);
        assert_relative_eq!(first.components.expenses, 110.0);
        assert_relative_eq!(first.amount, -890.0);
    }

    #[test]
    fn test_pinned_version_mismatch_fails() {
        let engine = flat_engine(0.01, 0.0, ProjectionOptions::default());
        let ctx = ValuationContext::new(d(2020, 1, 1)).with_assumption_version("2024Q4");

        let err = engine.project(&annuity(40, 10), &ctx).unwrap_err();
        assert_eq!(err.kind(), "ProjectionFailed");

        let ok = ValuationContext::new(d(2020, 1, 1)).with_assumption_version("flat");
        assert!(engine.project(&annuity(40, 10), &ok).is_ok());
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let engine = flat_engine(0.01, 0.0, ProjectionOptions::default());
        let bad = Contract::new("", d(2020, 1, 1), 40, ProductClass::new("TERM"))
            .with_benefit(BenefitClause::survival("annuity", 1.0, Frequency::Annual, Some(1)));
        let contracts = vec![annuity(40, 10), bad, annuity(60, 5)];

        let results = engine.project_batch(&contracts, &ValuationContext::new(d(2020, 1, 1)));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().map(|r| r.records.len()).ok(), Some(10));
        assert_eq!(results[1].as_ref().map_err(|e| e.kind()).err(), Some("InvalidContractTerm"));
        assert_eq!(results[2].as_ref().map(|r| r.records.len()).ok(), Some(5));
    }

    proptest! {
        #[test]
        fn prop_in_force_starts_at_one_and_never_increases(
            q in 0.0f64..0.5,
            w in 0.0f64..0.5,
            entry_age in 18u32..80,
            term in 1u32..20,
        ) {
            let engine = flat_engine(q, w, ProjectionOptions::default());
            let curve = engine
                .survival_curve(&annuity(entry_age, term), &ValuationContext::new(d(2020, 1, 1)))
                .unwrap();
            let p = curve.probabilities();
            prop_assert_eq!(p[0], 1.0);
            prop_assert!(p.windows(2).all(|pair| pair[1] <= pair[0]));
            prop_assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        }

        #[test]
        fn prop_projection_is_deterministic(
            q in 0.0f64..0.3,
            entry_age in 18u32..70,
            term in 1u32..25,
            offset_months in 0u32..120,
        ) {
            let engine = flat_engine(q, 0.02, ProjectionOptions::default());
            let contract = annuity(entry_age, term)
                .with_benefit(BenefitClause::on_exit("death", 5_000.0, ExitCause::Any, Some(term)))
                .with_premium(80.0, Frequency::Monthly, None);
            let value_date = crate::calendar::add_months(d(2020, 1, 1), offset_months).unwrap();
            let ctx = ValuationContext::new(value_date);

            let schedule_a = engine.nominal_schedule(&contract, &ctx).unwrap();
            let schedule_b = engine.nominal_schedule(&contract, &ctx).unwrap();
            prop_assert_eq!(schedule_a, schedule_b);

            let first = engine.project(&contract, &ctx).unwrap();
            let second = engine.project(&contract, &ctx).unwrap();
            prop_assert!(first.records.windows(2).all(|pair| pair[0].period < pair[1].period));
            prop_assert_eq!(first, second);
        }
    }
}
