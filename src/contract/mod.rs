//! Contract data structures, boundary shapes and file loading

mod data;
pub mod loader;
mod request;

pub use data::{
    BenefitClause, ClauseTiming, Contract, ExitCause, Frequency, PremiumDefinition, ProductClass,
    WeightingRule,
};
pub use loader::{load_default_requests, load_requests, load_requests_from_reader};
pub use request::{CashflowRequest, CashflowResponse};
