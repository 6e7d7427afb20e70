//! Contract data structures: benefit clauses, premium terms and policy timing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar::{add_months, elapsed_years};
use crate::error::{ProjectionError, Result};

/// Product class used to select the decrement basis
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductClass(String);

impl ProductClass {
    pub fn new(name: impl Into<String>) -> Self {
        ProductClass(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment frequency of a recurring clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One installment at the start of the clause
    Single,
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl Frequency {
    /// Months between installments (None for a single installment)
    pub fn interval_months(&self) -> Option<u32> {
        match self {
            Frequency::Single => None,
            Frequency::Annual => Some(12),
            Frequency::SemiAnnual => Some(6),
            Frequency::Quarterly => Some(3),
            Frequency::Monthly => Some(1),
        }
    }
}

/// Decrement that triggers an exit-contingent benefit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCause {
    /// Death only: p[t-1] * q[t-1]
    Death,
    /// Lapse only, after surviving mortality: p[t-1] * (1 - q[t-1]) * w[t-1]
    Lapse,
    /// Any decrement: p[t-1] - p[t]
    Any,
}

/// Probability weight applied to a scheduled amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeightingRule {
    /// Payable while in force, weighted by p[t]
    Survival,
    /// Payable on exit during the prior period
    Exit { cause: ExitCause },
    /// Payable regardless of status
    Certain,
}

/// When a clause pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClauseTiming {
    /// Installments from the end of the waiting period until the clause ends.
    /// Exit-contingent clauses pay once, on exit, and must use `Single`.
    Recurring { frequency: Frequency },
    /// A single payment on a fixed date
    FixedDate { date: NaiveDate },
}

/// A single benefit definition of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BenefitClause {
    /// Label used in logs and error messages
    #[serde(default)]
    pub name: String,

    /// Sum insured or installment amount
    pub amount: f64,

    pub timing: ClauseTiming,

    pub weighting: WeightingRule,

    /// Months after issue before the clause starts paying or covering
    #[serde(default)]
    pub waiting_period_months: u32,

    /// Clause term in years from issue (None = whole of life)
    #[serde(default)]
    pub term_years: Option<u32>,
}

impl BenefitClause {
    /// Level recurring benefit payable while in force
    pub fn survival(
        name: &str,
        amount: f64,
        frequency: Frequency,
        term_years: Option<u32>,
    ) -> Self {
        Self {
            name: name.to_string(),
            amount,
            timing: ClauseTiming::Recurring { frequency },
            weighting: WeightingRule::Survival,
            waiting_period_months: 0,
            term_years,
        }
    }

    /// Lump sum payable on exit by the given cause
    pub fn on_exit(name: &str, amount: f64, cause: ExitCause, term_years: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            amount,
            timing: ClauseTiming::Recurring { frequency: Frequency::Single },
            weighting: WeightingRule::Exit { cause },
            waiting_period_months: 0,
            term_years,
        }
    }

    /// Payment on a fixed date with the given weighting
    pub fn fixed_date(name: &str, amount: f64, date: NaiveDate, weighting: WeightingRule) -> Self {
        Self {
            name: name.to_string(),
            amount,
            timing: ClauseTiming::FixedDate { date },
            weighting,
            waiting_period_months: 0,
            term_years: None,
        }
    }

    pub fn with_waiting_period(mut self, months: u32) -> Self {
        self.waiting_period_months = months;
        self
    }
}

/// Premium terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PremiumDefinition {
    /// Premium per installment
    pub amount: f64,

    pub frequency: Frequency,

    /// Premiums stop on this date (exclusive); None = payable until maturity
    #[serde(default)]
    pub paid_up_date: Option<NaiveDate>,
}

/// A life insurance contract as consumed by the projection engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique contract identifier
    pub contract_no: String,

    pub issue_date: NaiveDate,

    /// Age at issue
    pub entry_age: u32,

    /// Decrement basis for table lookups
    pub product_class: ProductClass,

    /// Benefit clauses in definition order
    pub benefits: Vec<BenefitClause>,

    #[serde(default)]
    pub premium: Option<PremiumDefinition>,
}

impl Contract {
    pub fn new(
        contract_no: &str,
        issue_date: NaiveDate,
        entry_age: u32,
        product_class: ProductClass,
    ) -> Self {
        Self {
            contract_no: contract_no.to_string(),
            issue_date,
            entry_age,
            product_class,
            benefits: Vec::new(),
            premium: None,
        }
    }

    pub fn with_benefit(mut self, clause: BenefitClause) -> Self {
        self.benefits.push(clause);
        self
    }

    pub fn with_premium(
        mut self,
        amount: f64,
        frequency: Frequency,
        paid_up_date: Option<NaiveDate>,
    ) -> Self {
        self.premium = Some(PremiumDefinition {
            amount,
            frequency,
            paid_up_date,
        });
        self
    }

    /// Attained age on a date (age at issue plus completed policy years)
    pub fn attained_age(&self, date: NaiveDate) -> Option<u32> {
        elapsed_years(self.issue_date, date).and_then(|years| self.entry_age.checked_add(years))
    }

    /// Completed policy years on a date
    pub fn duration_years(&self, date: NaiveDate) -> Option<u32> {
        elapsed_years(self.issue_date, date)
    }

    /// Date the clause starts paying or covering
    pub fn cover_start(&self, clause: &BenefitClause) -> Result<NaiveDate> {
        add_months(self.issue_date, clause.waiting_period_months)
    }

    /// Exclusive end date of a clause
    ///
    /// Whole-of-life clauses run until the attained age passes `max_age`.
    pub fn clause_end(&self, clause: &BenefitClause, max_age: u32) -> Result<NaiveDate> {
        match clause.timing {
            ClauseTiming::FixedDate { date } => date.succ_opt().ok_or_else(|| {
                ProjectionError::invalid_term(
                    &self.contract_no,
                    format!(
                        "clause '{}' pays on {}, past the last representable date",
                        clause.name, date
                    ),
                )
            }),
            ClauseTiming::Recurring { .. } => {
                let years = match clause.term_years {
                    Some(term) => term,
                    None => max_age.saturating_add(1).saturating_sub(self.entry_age),
                };
                let end = years
                    .checked_mul(12)
                    .and_then(|months| add_months(self.issue_date, months).ok());
                end.ok_or_else(|| {
                    ProjectionError::invalid_term(
                        &self.contract_no,
                        format!(
                            "clause '{}' term of {} years runs past the calendar",
                            clause.name, years
                        ),
                    )
                })
            }
        }
    }

    /// Latest clause end, or the issue date when there are no clauses
    pub fn maturity_date(&self, max_age: u32) -> Result<NaiveDate> {
        let mut maturity = self.issue_date;
        for clause in &self.benefits {
            maturity = maturity.max(self.clause_end(clause, max_age)?);
        }
        Ok(maturity)
    }

    /// Check clause and premium terms against the table's age coverage
    pub fn validate(&self, min_age: u32, max_age: u32) -> Result<()> {
        if self.contract_no.trim().is_empty() {
            return Err(ProjectionError::invalid_term(&self.contract_no, "empty contract number"));
        }
        if self.entry_age < min_age || self.entry_age > max_age {
            return Err(ProjectionError::invalid_term(
                &self.contract_no,
                format!(
                    "entry age {} outside table coverage (ages {} to {})",
                    self.entry_age, min_age, max_age
                ),
            ));
        }

        for clause in &self.benefits {
            if !clause.amount.is_finite() {
                return Err(ProjectionError::invalid_term(
                    &self.contract_no,
                    format!("clause '{}' has a non-finite amount", clause.name),
                ));
            }
            if self.cover_start(clause).is_err() {
                return Err(ProjectionError::invalid_term(
                    &self.contract_no,
                    format!(
                        "clause '{}' waiting period of {} months runs past the calendar",
                        clause.name, clause.waiting_period_months
                    ),
                ));
            }
            match clause.timing {
                ClauseTiming::Recurring { frequency } => {
                    if let Some(term) = clause.term_years {
                        if term == 0 {
                            return Err(ProjectionError::invalid_term(
                                &self.contract_no,
                                format!("clause '{}' has a non-positive term", clause.name),
                            ));
                        }
                        let end_age = self.entry_age.checked_add(term);
                        if end_age.map_or(true, |age| age > max_age.saturating_add(1)) {
                            let reason = format!(
                                "clause '{}' with term {} runs past table coverage (max age {})",
                                clause.name, term, max_age
                            );
                            return Err(ProjectionError::invalid_term(&self.contract_no, reason));
                        }
                    }
                    if matches!(clause.weighting, WeightingRule::Exit { .. })
                        && frequency != Frequency::Single
                    {
                        return Err(ProjectionError::invalid_term(
                            &self.contract_no,
                            format!(
                                "clause '{}' is exit-contingent but has {:?} frequency",
                                clause.name, frequency
                            ),
                        ));
                    }
                }
                ClauseTiming::FixedDate { date } => {
                    if date < self.issue_date {
                        return Err(ProjectionError::invalid_term(
                            &self.contract_no,
                            format!("clause '{}' pays on {} before issue", clause.name, date),
                        ));
                    }
                    if matches!(clause.weighting, WeightingRule::Exit { .. }) {
                        return Err(ProjectionError::invalid_term(
                            &self.contract_no,
                            format!(
                                "clause '{}' is exit-contingent but has a fixed date",
                                clause.name
                            ),
                        ));
                    }
                }
            }
        }

        if let Some(premium) = &self.premium {
            if !premium.amount.is_finite() || premium.amount < 0.0 {
                return Err(ProjectionError::invalid_term(
                    &self.contract_no,
                    format!("premium amount {} must be finite and non-negative", premium.amount),
                ));
            }
            if let Some(paid_up) = premium.paid_up_date {
                if paid_up < self.issue_date {
                    return Err(ProjectionError::invalid_term(
                        &self.contract_no,
                        format!("paid-up date {} precedes issue", paid_up),
                    ));
                }
            }
        }

        Ok(())
    }
}
