//! Cashflow output structures for projections

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::schedule::CashflowKind;
use crate::contract::WeightingRule;

/// Split of a period's amount by source
///
/// Each component is already probability-weighted and discounted like the
/// record it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CashflowComponents {
    /// Premium income (negative)
    pub premiums: f64,
    pub survival_benefits: f64,
    pub exit_benefits: f64,
    pub certain_benefits: f64,
    pub expenses: f64,
}

impl CashflowComponents {
    pub fn add(&mut self, kind: CashflowKind, weighting: WeightingRule, amount: f64) {
        match (kind, weighting) {
            (CashflowKind::Premium, _) => self.premiums += amount,
            (CashflowKind::Expense, _) => self.expenses += amount,
            (CashflowKind::Benefit, WeightingRule::Survival) => self.survival_benefits += amount,
            (CashflowKind::Benefit, WeightingRule::Exit { .. }) => self.exit_benefits += amount,
            (CashflowKind::Benefit, WeightingRule::Certain) => self.certain_benefits += amount,
        }
    }

    pub fn benefits(&self) -> f64 {
        self.survival_benefits + self.exit_benefits + self.certain_benefits
    }

    pub fn total(&self) -> f64 {
        self.premiums + self.benefits() + self.expenses
    }
}

/// Expected cashflow for one projection period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRecord {
    /// Period index from the valuation date
    pub period: u32,

    /// In-force probability at the start of the period, p[t]
    pub probability_weight: f64,

    /// Net expected amount (discounted when a rate was applied)
    pub amount: f64,

    /// Factor applied to the expected amount (1.0 when undiscounted)
    pub discount_factor: f64,

    pub components: CashflowComponents,
}

/// Complete projection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub contract_no: String,

    pub value_date: NaiveDate,

    /// Assumption set the projection ran against
    pub assumption_version: String,

    /// Whether amounts are present values
    pub discounted: bool,

    /// Records ordered by period; periods with nothing scheduled are omitted
    pub records: Vec<CashflowRecord>,
}

impl ProjectionResult {
    pub fn new(
        contract_no: &str,
        value_date: NaiveDate,
        assumption_version: &str,
        discounted: bool,
    ) -> Self {
        Self {
            contract_no: contract_no.to_string(),
            value_date,
            assumption_version: assumption_version.to_string(),
            discounted,
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Amount per period index 0..=last recorded period, zero-filled
    pub fn amounts(&self) -> Vec<f64> {
        let Some(last) = self.records.last() else {
            return Vec::new();
        };
        let mut amounts = vec![0.0; last.period as usize + 1];
        for record in &self.records {
            amounts[record.period as usize] += record.amount;
        }
        amounts
    }

    /// Amount at one period (zero when nothing is recorded)
    pub fn amount_at(&self, period: u32) -> f64 {
        self.records
            .binary_search_by_key(&period, |r| r.period)
            .map(|idx| self.records[idx].amount)
            .unwrap_or(0.0)
    }

    /// Sum of all record amounts
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    /// Get summary statistics
    pub fn summary(&self) -> ProjectionSummary {
        let mut totals = CashflowComponents::default();
        for record in &self.records {
            let c = &record.components;
            totals.premiums += c.premiums;
            totals.survival_benefits += c.survival_benefits;
            totals.exit_benefits += c.exit_benefits;
            totals.certain_benefits += c.certain_benefits;
            totals.expenses += c.expenses;
        }

        ProjectionSummary {
            periods: self.records.last().map_or(0, |r| r.period + 1),
            total_premiums: totals.premiums,
            total_benefits: totals.benefits(),
            total_exit_benefits: totals.exit_benefits,
            total_expenses: totals.expenses,
            total_net: self.total(),
            final_in_force: self.records.last().map_or(1.0, |r| r.probability_weight),
        }
    }
}

/// Summary statistics for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub periods: u32,
    pub total_premiums: f64,
    pub total_benefits: f64,
    pub total_exit_benefits: f64,
    pub total_expenses: f64,
    pub total_net: f64,
    pub final_in_force: f64,
}
