//! Error taxonomy for projections
//!
//! Three kinds are surfaced to callers:
//! - `AssumptionNotFound`: a required decrement table entry is missing
//! - `InvalidContractTerm`: contract terms are malformed or inconsistent
//! - `ProjectionFailed`: an internal invariant was violated
//!
//! The transport layer maps these to its own status codes via [`ProjectionError::kind`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::contract::ProductClass;

/// Errors raised while projecting a contract
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// No table entry covers the requested key
    #[error(
        "no decrement rate for class {product_class}, age {age}, duration {duration}{}",
        .period.map(|p| format!(" (projection period {})", p)).unwrap_or_default()
    )]
    AssumptionNotFound {
        product_class: ProductClass,
        age: u32,
        duration: u32,
        /// Projection period that needed the rate, when known
        period: Option<u32>,
    },

    /// Contract terms cannot be projected
    #[error("invalid contract term for {contract_no}: {reason}")]
    InvalidContractTerm { contract_no: String, reason: String },

    /// Internal invariant violation
    #[error("projection failed: {0}")]
    ProjectionFailed(String),
}

impl ProjectionError {
    pub(crate) fn invalid_term(contract_no: &str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidContractTerm {
            contract_no: contract_no.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn before_issue(
        contract_no: &str,
        issue_date: NaiveDate,
        value_date: NaiveDate,
    ) -> Self {
        Self::invalid_term(
            contract_no,
            format!("value date {} precedes issue date {}", value_date, issue_date),
        )
    }

    /// Attach the projection period to a table lookup failure
    pub(crate) fn at_period(self, period: u32) -> Self {
        match self {
            ProjectionError::AssumptionNotFound { product_class, age, duration, .. } => {
                ProjectionError::AssumptionNotFound {
                    product_class,
                    age,
                    duration,
                    period: Some(period),
                }
            }
            other => other,
        }
    }

    /// Stable identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::AssumptionNotFound { .. } => "AssumptionNotFound",
            ProjectionError::InvalidContractTerm { .. } => "InvalidContractTerm",
            ProjectionError::ProjectionFailed(_) => "ProjectionFailed",
        }
    }
}

/// Result alias for projection operations
pub type Result<T> = std::result::Result<T, ProjectionError>;
