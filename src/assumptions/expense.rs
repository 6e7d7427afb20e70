//! Expense loadings applied on top of contractual cashflows

use serde::{Deserialize, Serialize};

/// Expense assumptions for a projection
///
/// Amounts are positive outflows. Percentages are decimals (0.05 = 5%).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpenseAssumptions {
    /// Maintenance expense per policy per year, in valuation-date money
    pub per_policy: f64,

    /// Expense as a share of each premium installment
    pub premium_pct: f64,

    /// Claim handling expense as a share of each exit benefit
    pub claim_pct: f64,

    /// Annual inflation applied to the per-policy expense
    pub inflation: f64,
}

impl ExpenseAssumptions {
    /// No expense loadings
    pub fn none() -> Self {
        Self::default()
    }

    /// Per-policy maintenance expense for projection period `period`
    pub fn maintenance_for_period(&self, period: u32, period_months: u32) -> f64 {
        let years_from_valuation = (period * period_months) as f64 / 12.0;
        let inflation = (1.0 + self.inflation).powf(years_from_valuation);
        self.per_policy * period_months as f64 / 12.0 * inflation
    }

    pub fn premium_expense(&self, premium: f64) -> f64 {
        premium * self.premium_pct
    }

    pub fn claim_expense(&self, benefit: f64) -> f64 {
        benefit * self.claim_pct
    }

    /// All parameters finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.per_policy, self.premium_pct, self.claim_pct, self.inflation]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_maintenance_inflates_annually() {
        let expenses = ExpenseAssumptions {
            per_policy: 60.0,
            inflation: 0.02,
            ..Default::default()
        };

        assert_relative_eq!(expenses.maintenance_for_period(0, 12), 60.0);
        assert_relative_eq!(expenses.maintenance_for_period(2, 12), 60.0 * 1.02_f64.powi(2));
        // Monthly periods carry a twelfth of the annual amount
        assert_relative_eq!(expenses.maintenance_for_period(12, 1), 5.0 * 1.02);
    }

    #[test]
    fn test_validity() {
        assert!(ExpenseAssumptions::none().is_valid());
        let bad = ExpenseAssumptions { claim_pct: -0.01, ..Default::default() };
        assert!(!bad.is_valid());
    }
}
