//! Month-based date arithmetic used for policy timing
//!
//! All projection timing is expressed in whole calendar months from an anchor date.
//! Adding months clamps to the end of the target month (Jan 31 + 1 month = Feb 28/29),
//! and elapsed months are counted consistently with that clamping.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{ProjectionError, Result};

/// Add a number of calendar months to a date
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        ProjectionError::ProjectionFailed(format!(
            "date overflow adding {} months to {}",
            months, date
        ))
    })
}

/// Whole months elapsed from `from` to `to`
///
/// Returns the largest `m` with `add_months(from, m) <= to`, or `None` when `to < from`.
pub fn elapsed_months(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    if to < from {
        return None;
    }

    let years = i64::from(to.year()) - i64::from(from.year());
    let raw = years * 12 + i64::from(to.month0()) - i64::from(from.month0());
    let mut months = u32::try_from(raw.max(0)).ok()?;

    // Clamped month ends can land after `to`; step back until we fit
    while months > 0 {
        match from.checked_add_months(Months::new(months)) {
            Some(d) if d <= to => break,
            _ => months -= 1,
        }
    }

    Some(months)
}

/// Whole years elapsed from `from` to `to` (anniversary based)
pub fn elapsed_years(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    elapsed_months(from, to).map(|m| m / 12)
}
