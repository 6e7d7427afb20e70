//! Boundary request/response shapes for the cashflow front end
//!
//! Field names follow the web JSON convention of the calling service (camelCase).
//! Nothing here knows about transport; the caller owns routing and status codes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::data::{BenefitClause, Contract, PremiumDefinition, ProductClass};
use crate::projection::{ProjectionResult, ValuationContext};

/// Inbound contract description plus valuation date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CashflowRequest {
    pub contract_no: String,
    pub value_date: NaiveDate,
    pub issue_date: NaiveDate,
    pub entry_age: u32,
    pub product_class: ProductClass,
    pub benefits: Vec<BenefitClause>,
    #[serde(default)]
    pub premium: Option<PremiumDefinition>,
    /// Optional cap on projected periods
    #[serde(default)]
    pub horizon_periods: Option<u32>,
    /// Optional assumption set version the caller expects
    #[serde(default)]
    pub assumption_version: Option<String>,
}

impl CashflowRequest {
    /// Split into the canonical contract and its valuation context
    pub fn into_parts(self) -> (Contract, ValuationContext) {
        let mut ctx = ValuationContext::new(self.value_date);
        if let Some(horizon) = self.horizon_periods {
            ctx = ctx.with_horizon(horizon);
        }
        if let Some(version) = self.assumption_version {
            ctx = ctx.with_assumption_version(version);
        }

        let contract = Contract {
            contract_no: self.contract_no,
            issue_date: self.issue_date,
            entry_age: self.entry_age,
            product_class: self.product_class,
            benefits: self.benefits,
            premium: self.premium,
        };

        (contract, ctx)
    }
}

/// Outbound expected cashflows, one amount per period index 0..=N
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowResponse {
    pub contract_no: String,
    pub value_date: NaiveDate,
    pub benefits: Vec<f64>,
}

impl From<&ProjectionResult> for CashflowResponse {
    fn from(result: &ProjectionResult) -> Self {
        Self {
            contract_no: result.contract_no.clone(),
            value_date: result.value_date,
            benefits: result.amounts(),
        }
    }
}
