//! Benefit schedule generator: contract clauses to nominal signed amounts per period
//!
//! Sign convention (insurer liability view):
//! - benefits and expenses are positive (outflows)
//! - premiums are negative (inflows)
//!
//! Amounts are undiscounted and not yet weighted by any probability. Each entry
//! carries the weighting rule the projector must apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::context::{ProjectionOptions, ValuationContext};
use super::timeline::Timeline;
use crate::assumptions::AssumptionSet;
use crate::calendar::add_months;
use crate::contract::{ClauseTiming, Contract, Frequency, WeightingRule};
use crate::error::Result;

/// Type of a scheduled amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashflowKind {
    Premium,
    Benefit,
    Expense,
}

/// One nominal amount at one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAmount {
    pub period: u32,
    pub kind: CashflowKind,
    pub weighting: WeightingRule,
    pub amount: f64,
}

/// Nominal cashflows ordered by period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominalSchedule {
    entries: Vec<ScheduledAmount>,
}

impl NominalSchedule {
    pub fn entries(&self) -> &[ScheduledAmount] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Net nominal amount per period, ordered by period
    pub fn totals(&self) -> Vec<(u32, f64)> {
        let mut totals: Vec<(u32, f64)> = Vec::new();
        for entry in &self.entries {
            match totals.last_mut() {
                Some((period, total)) if *period == entry.period => *total += entry.amount,
                _ => totals.push((entry.period, entry.amount)),
            }
        }
        totals
    }
}

/// Accumulates amounts keyed by (period, kind, weighting); same keys are summed
#[derive(Default)]
struct ScheduleBuilder {
    amounts: BTreeMap<(u32, CashflowKind, WeightingRule), f64>,
}

impl ScheduleBuilder {
    fn add(&mut self, period: u32, kind: CashflowKind, weighting: WeightingRule, amount: f64) {
        if amount != 0.0 {
            *self.amounts.entry((period, kind, weighting)).or_insert(0.0) += amount;
        }
    }

    fn build(self) -> NominalSchedule {
        NominalSchedule {
            entries: self
                .amounts
                .into_iter()
                .map(|((period, kind, weighting), amount)| ScheduledAmount {
                    period,
                    kind,
                    weighting,
                    amount,
                })
                .collect(),
        }
    }
}

/// Expands contract clauses and expense loadings into a nominal schedule
pub struct ScheduleGenerator<'a> {
    assumptions: &'a AssumptionSet,
    options: &'a ProjectionOptions,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(assumptions: &'a AssumptionSet, options: &'a ProjectionOptions) -> Self {
        Self { assumptions, options }
    }

    /// Nominal schedule for the contract from the valuation date to maturity
    pub fn nominal_schedule(
        &self,
        contract: &Contract,
        ctx: &ValuationContext,
    ) -> Result<NominalSchedule> {
        let timeline = Timeline::build(contract, ctx, self.options, &self.assumptions.decrements)?;
        self.schedule_on(contract, &timeline)
    }

    /// Nominal schedule on an already validated timeline
    pub(crate) fn schedule_on(
        &self,
        contract: &Contract,
        timeline: &Timeline,
    ) -> Result<NominalSchedule> {
        let mut builder = ScheduleBuilder::default();
        let expenses = &self.assumptions.expenses;
        let with_expenses = self.options.include_expenses;

        for clause in &contract.benefits {
            let cover_start = contract.cover_start(clause)?;
            let cover_end = contract.clause_end(clause, timeline.max_age)?;

            match (clause.timing, clause.weighting) {
                (ClauseTiming::FixedDate { date }, weighting) => {
                    if date >= cover_start {
                        if let Some(t) = timeline.payment_period(date) {
                            builder.add(t, CashflowKind::Benefit, weighting, clause.amount);
                        }
                    }
                }
                (ClauseTiming::Recurring { .. }, WeightingRule::Exit { cause }) => {
                    let weighting = WeightingRule::Exit { cause };
                    // Exits during period t-1 are paid at period t
                    for t in 1..=timeline.periods {
                        let exit_period_start = timeline.period_start(t - 1)?;
                        if exit_period_start < cover_start || exit_period_start >= cover_end {
                            continue;
                        }
                        builder.add(t, CashflowKind::Benefit, weighting, clause.amount);
                        if with_expenses {
                            let claim = expenses.claim_expense(clause.amount);
                            builder.add(t, CashflowKind::Expense, weighting, claim);
                        }
                    }
                }
                (ClauseTiming::Recurring { frequency }, weighting) => {
                    let dates =
                        installments(cover_start, cover_end, frequency, timeline.horizon_end())?;
                    for date in dates {
                        if let Some(t) = timeline.payment_period(date) {
                            builder.add(t, CashflowKind::Benefit, weighting, clause.amount);
                        }
                    }
                }
            }
        }

        if let Some(premium) = &contract.premium {
            let premium_end = premium
                .paid_up_date
                .map_or(timeline.maturity, |paid_up| paid_up.min(timeline.maturity));

            let dates = installments(
                contract.issue_date,
                premium_end,
                premium.frequency,
                timeline.horizon_end(),
            )?;
            for date in dates {
                if let Some(t) = timeline.payment_period(date) {
                    builder.add(t, CashflowKind::Premium, WeightingRule::Survival, -premium.amount);
                    if with_expenses {
                        builder.add(
                            t,
                            CashflowKind::Expense,
                            WeightingRule::Survival,
                            expenses.premium_expense(premium.amount),
                        );
                    }
                }
            }
        }

        if with_expenses {
            for t in 0..timeline.periods {
                builder.add(
                    t,
                    CashflowKind::Expense,
                    WeightingRule::Survival,
                    expenses.maintenance_for_period(t, timeline.period_months),
                );
            }
        }

        Ok(builder.build())
    }
}

/// Installment dates from `start` (inclusive) to `end` (exclusive), stopping at `limit`
fn installments(
    start: NaiveDate,
    end: NaiveDate,
    frequency: Frequency,
    limit: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let stop = end.min(limit);
    let Some(interval) = frequency.interval_months() else {
        return Ok(if start < stop { vec![start] } else { Vec::new() });
    };

    let mut dates = Vec::new();
    let mut k = 0;
    loop {
        let date = add_months(start, k * interval)?;
        if date >= stop {
            break;
        }
        dates.push(date);
        k += 1;
    }
    Ok(dates)
}
