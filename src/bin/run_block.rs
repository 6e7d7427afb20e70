//! Run projections for a whole block of contracts
//!
//! Outputs expected cashflows aggregated by period across all contracts

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use life_cashflows::assumptions::loader::DEFAULT_ASSUMPTIONS_PATH;
use life_cashflows::contract::{load_requests, loader::DEFAULT_CONTRACTS_PATH};
use life_cashflows::projection::{Discounting, PeriodLength, ProjectionOptions, ProjectionResult};
use life_cashflows::{ProjectionError, ValuationRunner};

/// Parallel block projection
#[derive(Parser, Debug)]
#[command(name = "run_block", about, long_about = None)]
struct Args {
    /// Contract request file
    #[arg(long, default_value = DEFAULT_CONTRACTS_PATH)]
    contracts: PathBuf,

    /// Assumption directory
    #[arg(long, default_value = DEFAULT_ASSUMPTIONS_PATH)]
    assumptions: PathBuf,

    /// Project monthly instead of annual periods
    #[arg(long)]
    monthly: bool,

    /// Discount at the assumption set's valuation rate
    #[arg(long)]
    discount: bool,

    /// Aggregated output file
    #[arg(long, default_value = "block_cashflows.csv")]
    output: PathBuf,
}

/// Aggregated results for one period across all contracts
#[derive(Debug, Clone, Default, Serialize)]
struct AggregatedRow {
    period: u32,
    contracts: u32,
    expected_in_force: f64,
    premiums: f64,
    survival_benefits: f64,
    exit_benefits: f64,
    certain_benefits: f64,
    expenses: f64,
    net_cashflow: f64,
}

fn aggregate(results: &[ProjectionResult]) -> Vec<AggregatedRow> {
    let mut by_period: BTreeMap<u32, AggregatedRow> = BTreeMap::new();
    for result in results {
        for record in &result.records {
            let agg = by_period.entry(record.period).or_insert_with(|| AggregatedRow {
                period: record.period,
                ..Default::default()
            });
            let c = &record.components;
            agg.contracts += 1;
            agg.expected_in_force += record.probability_weight;
            agg.premiums += c.premiums;
            agg.survival_benefits += c.survival_benefits;
            agg.exit_benefits += c.exit_benefits;
            agg.certain_benefits += c.certain_benefits;
            agg.expenses += c.expenses;
            agg.net_cashflow += record.amount;
        }
    }
    by_period.into_values().collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    println!("Loading contracts from {}...", args.contracts.display());
    let requests = load_requests(&args.contracts)?;
    println!("Loaded {} contracts in {:?}", requests.len(), start.elapsed());

    let mut options = ProjectionOptions::default();
    if args.monthly {
        options.period = PeriodLength::Monthly;
    }
    if args.discount {
        options.discounting = Discounting::ValuationRate;
    }
    let runner = ValuationRunner::from_csv_path(&args.assumptions, options)
        .with_context(|| format!("loading assumptions from {}", args.assumptions.display()))?;

    println!("Running projections...");
    let proj_start = Instant::now();

    // One snapshot for the whole block
    let engine = runner.engine();
    let outcomes: Vec<(String, Result<ProjectionResult, ProjectionError>)> = requests
        .into_par_iter()
        .map(|request| {
            let (contract, ctx) = request.into_parts();
            let outcome = engine.project(&contract, &ctx);
            (contract.contract_no, outcome)
        })
        .collect();

    println!("Projections complete in {:?}", proj_start.elapsed());

    let total = outcomes.len();
    let mut results = Vec::with_capacity(total);
    for (contract_no, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => log::warn!("{}: skipped, {} ({})", contract_no, err, err.kind()),
        }
    }

    let aggregated = aggregate(&results);
    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for row in &aggregated {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let net: f64 = aggregated.iter().map(|r| r.net_cashflow).sum();
    println!(
        "{} of {} contracts projected against '{}', net expected cashflow {:.2}",
        results.len(),
        total,
        engine.assumptions().version,
        net
    );
    println!("Output written to {}", args.output.display());

    Ok(())
}
