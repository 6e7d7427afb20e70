//! Life Cashflows - expected cashflow projection engine for life insurance contracts
//!
//! This library provides:
//! - Decrement modeling (mortality and lapse as independent competing risks)
//! - Benefit, premium and expense schedules from contract clauses
//! - Probability-weighted, optionally discounted cashflows per projection period
//! - Versioned assumption sets with snapshot reloads
//! - Single and parallel batch projections

pub mod assumptions;
pub mod calendar;
pub mod contract;
pub mod error;
pub mod projection;
pub mod runner;

// Re-export commonly used types
pub use assumptions::{AssumptionSet, AssumptionStore, DecrementTable};
pub use contract::{BenefitClause, CashflowRequest, CashflowResponse, Contract, ProductClass};
pub use error::{ProjectionError, Result};
pub use projection::{ProjectionEngine, ProjectionOptions, ProjectionResult, ValuationContext};
pub use runner::ValuationRunner;
