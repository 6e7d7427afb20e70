//! Life Cashflows CLI
//!
//! Projects the contracts in a JSON request file and prints their expected
//! cashflows per period.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;

use life_cashflows::assumptions::loader::DEFAULT_ASSUMPTIONS_PATH;
use life_cashflows::contract::{load_requests, loader::DEFAULT_CONTRACTS_PATH};
use life_cashflows::projection::{Discounting, PeriodLength, ProjectionOptions, ProjectionResult};
use life_cashflows::{CashflowResponse, ValuationRunner};

/// Expected cashflow projection for life insurance contracts
#[derive(Parser, Debug)]
#[command(name = "life_cashflows", version, about, long_about = None)]
struct Cli {
    /// Contract request file (one object or an array)
    #[arg(long, default_value = DEFAULT_CONTRACTS_PATH)]
    contract: PathBuf,

    /// Assumption directory (decrement_rates.csv, parameters.csv, ...)
    #[arg(long, default_value = DEFAULT_ASSUMPTIONS_PATH)]
    assumptions: PathBuf,

    /// Override the valuation date of every request (YYYY-MM-DD)
    #[arg(long)]
    value_date: Option<NaiveDate>,

    /// Project monthly instead of annual periods
    #[arg(long)]
    monthly: bool,

    /// Discount at this flat annual rate
    #[arg(long, conflicts_with = "discount_valuation_rate")]
    discount_rate: Option<f64>,

    /// Discount at the assumption set's valuation rate
    #[arg(long)]
    discount_valuation_rate: bool,

    /// Leave out expense loadings
    #[arg(long)]
    no_expenses: bool,

    /// Write per-period records to this CSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print boundary responses as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> ProjectionOptions {
        let mut options = ProjectionOptions::default();
        if self.monthly {
            options.period = PeriodLength::Monthly;
        }
        if let Some(rate) = self.discount_rate {
            options.discounting = Discounting::Rate(rate);
        } else if self.discount_valuation_rate {
            options.discounting = Discounting::ValuationRate;
        }
        if self.no_expenses {
            options.include_expenses = false;
        }
        options
    }
}

/// One CSV output row
#[derive(Serialize)]
struct RecordRow<'a> {
    contract_no: &'a str,
    period: u32,
    in_force: f64,
    discount_factor: f64,
    premiums: f64,
    survival_benefits: f64,
    exit_benefits: f64,
    certain_benefits: f64,
    expenses: f64,
    amount: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let runner = ValuationRunner::from_csv_path(&cli.assumptions, cli.options())
        .with_context(|| format!("loading assumptions from {}", cli.assumptions.display()))?;
    let mut requests = load_requests(&cli.contract)?;
    if let Some(value_date) = cli.value_date {
        for request in &mut requests {
            request.value_date = value_date;
        }
    }

    log::info!(
        "projecting {} contracts against assumption set '{}'",
        requests.len(),
        runner.store().version()
    );

    let mut results = Vec::with_capacity(requests.len());
    let mut failures = 0;
    for request in requests {
        let (contract, ctx) = request.into_parts();
        match runner.run(&contract, &ctx) {
            Ok(result) => results.push(result),
            Err(err) => {
                failures += 1;
                log::warn!("{}: {} ({})", contract.contract_no, err, err.kind());
                eprintln!("{}: {}", contract.contract_no, err);
            }
        }
    }

    if cli.json {
        let responses: Vec<CashflowResponse> = results.iter().map(CashflowResponse::from).collect();
        println!("{}", serde_json::to_string_pretty(&responses)?);
    } else {
        for result in &results {
            print_result(result);
        }
    }

    if let Some(path) = &cli.output {
        write_csv(path, &results)?;
        println!("\nFull results written to: {}", path.display());
    }

    if failures > 0 {
        anyhow::bail!("{} of {} contracts failed", failures, failures + results.len());
    }
    Ok(())
}

fn print_result(result: &ProjectionResult) {
    println!(
        "\nContract {} valued {} (assumptions '{}'{})",
        result.contract_no,
        result.value_date,
        result.assumption_version,
        if result.discounted { ", present values" } else { "" }
    );
    println!(
        "{:>6} {:>12} {:>14} {:>14} {:>14} {:>12} {:>14}",
        "Period", "InForce", "Premiums", "SurvBenefits", "ExitBenefits", "Expenses", "Net"
    );
    println!("{}", "-".repeat(92));

    for record in &result.records {
        let c = &record.components;
        println!(
            "{:>6} {:>12.8} {:>14.2} {:>14.2} {:>14.2} {:>12.2} {:>14.2}",
            record.period,
            record.probability_weight,
            c.premiums,
            c.survival_benefits + c.certain_benefits,
            c.exit_benefits,
            c.expenses,
            record.amount,
        );
    }

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Periods: {}", summary.periods);
    println!("  Total Premiums: {:.2}", summary.total_premiums);
    println!("  Total Benefits: {:.2}", summary.total_benefits);
    println!("  Total Expenses: {:.2}", summary.total_expenses);
    println!("  Net Cashflow: {:.2}", summary.total_net);
}

fn write_csv(path: &Path, results: &[ProjectionResult]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for result in results {
        for record in &result.records {
            let c = &record.components;
            writer.serialize(RecordRow {
                contract_no: &result.contract_no,
                period: record.period,
                in_force: record.probability_weight,
                discount_factor: record.discount_factor,
                premiums: c.premiums,
                survival_benefits: c.survival_benefits,
                exit_benefits: c.exit_benefits,
                certain_benefits: c.certain_benefits,
                expenses: c.expenses,
                amount: record.amount,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
