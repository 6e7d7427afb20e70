//! Valuation runner for repeated and batch projections
//!
//! Holds the process-wide assumption store. Each call takes one snapshot and
//! projects against it, so a concurrent reload never mixes two assumption sets
//! inside a single projection or batch.

use std::path::Path;
use std::sync::Arc;

use crate::assumptions::{AssumptionSet, AssumptionStore};
use crate::contract::{CashflowRequest, CashflowResponse, Contract};
use crate::error::Result;
use crate::projection::{ProjectionEngine, ProjectionOptions, ProjectionResult, ValuationContext};

/// Pre-loaded runner for single, request and batch projections
///
/// # Example
/// ```ignore
/// let options = ProjectionOptions::default();
/// let runner = ValuationRunner::from_csv_path(Path::new("data/assumptions"), options)?;
/// let result = runner.run(&contract, &ValuationContext::new(value_date))?;
/// ```
#[derive(Debug)]
pub struct ValuationRunner {
    store: AssumptionStore,
    options: ProjectionOptions,
}

impl ValuationRunner {
    /// Create runner with an in-memory assumption set
    pub fn new(assumptions: AssumptionSet, options: ProjectionOptions) -> Self {
        Self {
            store: AssumptionStore::new(assumptions),
            options,
        }
    }

    /// Create runner by loading assumptions from a CSV directory
    pub fn from_csv_path(path: &Path, options: ProjectionOptions) -> anyhow::Result<Self> {
        Ok(Self::new(AssumptionSet::from_csv_path(path)?, options))
    }

    pub fn store(&self) -> &AssumptionStore {
        &self.store
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    /// Engine bound to the current snapshot
    pub fn engine(&self) -> ProjectionEngine {
        ProjectionEngine::new(self.store.snapshot(), self.options.clone())
    }

    /// Run a single projection
    pub fn run(&self, contract: &Contract, ctx: &ValuationContext) -> Result<ProjectionResult> {
        self.engine().project(contract, ctx)
    }

    /// Run a boundary request through to its response shape
    pub fn run_request(&self, request: CashflowRequest) -> Result<CashflowResponse> {
        let (contract, ctx) = request.into_parts();
        let result = self.run(&contract, &ctx)?;
        Ok(CashflowResponse::from(&result))
    }

    /// Run projections for multiple contracts against one snapshot
    pub fn run_batch(
        &self,
        contracts: &[Contract],
        ctx: &ValuationContext,
    ) -> Vec<Result<ProjectionResult>> {
        self.engine().project_batch(contracts, ctx)
    }

    /// Run one contract under several option sets (e.g. raw and discounted)
    pub fn run_scenarios(
        &self,
        contract: &Contract,
        ctx: &ValuationContext,
        scenarios: &[ProjectionOptions],
    ) -> Vec<Result<ProjectionResult>> {
        let snapshot = self.store.snapshot();
        scenarios
            .iter()
            .map(|options| {
                ProjectionEngine::new(Arc::clone(&snapshot), options.clone()).project(contract, ctx)
            })
            .collect()
    }

    /// Swap in a new assumption set; in-flight projections keep their snapshot
    pub fn reload(&self, assumptions: AssumptionSet) -> Arc<AssumptionSet> {
        self.store.replace(assumptions)
    }
}
