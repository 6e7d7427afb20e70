//! Discount curve handling for present-value projections
//!
//! Supports:
//! - No discounting (raw expected cashflows)
//! - Single annual rate
//! - Annual spot rates by projection period

use serde::{Deserialize, Serialize};

use super::context::Discounting;
use crate::error::{ProjectionError, Result};

/// Discount curve applied to projected amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCurve {
    /// Flat annual rate (used when no spot rate applies)
    pub annual_rate: f64,

    /// Optional: annual spot rate to each period, index = period
    pub spot_rates: Option<Vec<f64>>,
}

impl DiscountCurve {
    /// Identity curve: every factor is 1
    pub fn none() -> Self {
        Self::single_rate(0.0)
    }

    /// Create a simple discount curve with single rate
    pub fn single_rate(annual_rate: f64) -> Self {
        Self {
            annual_rate,
            spot_rates: None,
        }
    }

    /// Create discount curve from spot rate curve
    pub fn from_spot_curve(spot_rates: Vec<f64>) -> Self {
        let annual_rate = spot_rates.first().copied().unwrap_or(0.0);
        Self {
            annual_rate,
            spot_rates: Some(spot_rates),
        }
    }

    /// Build the curve for a discounting mode
    pub fn for_mode(mode: &Discounting, valuation_rate: f64) -> Result<Self> {
        let curve = match mode {
            Discounting::None => Self::none(),
            Discounting::Rate(rate) => Self::single_rate(*rate),
            Discounting::ValuationRate => Self::single_rate(valuation_rate),
            Discounting::SpotCurve(rates) => Self::from_spot_curve(rates.clone()),
        };
        curve.validate()?;
        Ok(curve)
    }

    fn validate(&self) -> Result<()> {
        let usable = |r: f64| r.is_finite() && r > -1.0;
        let spots_ok = self.spot_rates.as_ref().map_or(true, |s| s.iter().all(|r| usable(*r)));
        if usable(self.annual_rate) && spots_ok {
            Ok(())
        } else {
            Err(ProjectionError::ProjectionFailed(format!(
                "discount rates must be finite and greater than -100%: {:?}",
                self
            )))
        }
    }

    /// Annual rate applying to a period
    pub fn rate_for_period(&self, period: u32) -> f64 {
        match &self.spot_rates {
            Some(spots) if !spots.is_empty() => spots
                .get(period as usize)
                .or_else(|| spots.last())
                .copied()
                .unwrap_or(self.annual_rate),
            _ => self.annual_rate,
        }
    }

    /// Effective rate per projection period
    pub fn periodic_rate(&self, period: u32, period_months: u32) -> f64 {
        (1.0 + self.rate_for_period(period)).powf(period_months as f64 / 12.0) - 1.0
    }

    /// Discount factor from the start of `period` back to the valuation date
    ///
    /// v(t) = (1 + i)^(-t) with i the per-period rate
    pub fn factor(&self, period: u32, period_months: u32) -> f64 {
        let rate = self.rate_for_period(period);
        if rate == 0.0 {
            return 1.0;
        }
        let years = (period * period_months) as f64 / 12.0;
        (1.0 + rate).powf(-years)
    }

    /// Present value of a stream of (period, amount) pairs
    pub fn pv_stream(&self, amounts: &[(u32, f64)], period_months: u32) -> f64 {
        amounts
            .iter()
            .map(|(period, amount)| amount * self.factor(*period, period_months))
            .sum()
    }
}

impl Default for DiscountCurve {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_rate_annual_factors() {
        let curve = DiscountCurve::single_rate(0.05);
        assert_eq!(curve.factor(0, 12), 1.0);
        assert_relative_eq!(curve.factor(1, 12), 1.0 / 1.05, epsilon = 1e-12);
        assert_relative_eq!(curve.factor(10, 12), 1.05_f64.powi(-10), epsilon = 1e-12);
    }

    #[test]
    fn test_monthly_factors_match_annual_at_year_end() {
        let curve = DiscountCurve::single_rate(0.06);
        assert_relative_eq!(curve.factor(12, 1), curve.factor(1, 12), epsilon = 1e-12);
        assert_relative_eq!(
            (1.0 + curve.periodic_rate(0, 1)).powi(12),
            1.06,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_spot_curve_extends_last_rate() {
        let curve = DiscountCurve::from_spot_curve(vec![0.02, 0.03, 0.04]);
        assert_eq!(curve.rate_for_period(1), 0.03);
        assert_eq!(curve.rate_for_period(9), 0.04);
        assert_relative_eq!(curve.factor(2, 12), 1.04_f64.powi(-2), epsilon = 1e-12);
    }

    #[test]
    fn test_mode_selection() {
        let curve = DiscountCurve::for_mode(&Discounting::ValuationRate, 0.035).unwrap();
        assert_eq!(curve.annual_rate, 0.035);
        assert_eq!(
            DiscountCurve::for_mode(&Discounting::None, 0.035).unwrap(),
            DiscountCurve::none()
        );
        assert!(DiscountCurve::for_mode(&Discounting::Rate(-1.5), 0.0).is_err());
        let bad_curve = Discounting::SpotCurve(vec![0.01, f64::NAN]);
        assert!(DiscountCurve::for_mode(&bad_curve, 0.0).is_err());
    }

    #[test]
    fn test_pv_stream() {
        let curve = DiscountCurve::single_rate(0.10);
        let pv = curve.pv_stream(&[(0, 100.0), (1, 110.0)], 12);
        assert_relative_eq!(pv, 200.0, epsilon = 1e-9);
    }
}
