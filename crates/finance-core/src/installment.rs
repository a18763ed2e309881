//! Credit-card installment amortization.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::money::round2;
use crate::period::{months_between, Period};

/// Per-installment amount for a purchase split into `count` slices.
pub fn installment_amount(total: f64, count: u32) -> Result<f64> {
    if count == 0 {
        return Err(CoreError::InvalidInstallmentCount);
    }
    if total <= 0.0 {
        return Err(CoreError::NonPositiveAmount(total));
    }
    Ok(round2(total / count as f64))
}

/// Where an installment plan stands on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstallmentStatus {
    /// Whole months since the start date.
    pub months_elapsed: u32,
    /// True while `months_elapsed < total_installments`.
    pub active: bool,
    /// 1-based number of the installment due this month (0 once finished).
    pub current_installment: u32,
    /// Installments still to be paid, including the current one.
    pub remaining_installments: u32,
    /// `remaining_installments * installment_amount`.
    pub remaining_amount: f64,
}

/// Compute the status of a plan at `now`.
pub fn status(
    start_date: NaiveDate,
    total_installments: u32,
    installment_amount: f64,
    now: NaiveDate,
) -> InstallmentStatus {
    let months_elapsed = months_between(start_date, now);
    let active = months_elapsed < total_installments;
    let remaining_installments = total_installments.saturating_sub(months_elapsed);

    InstallmentStatus {
        months_elapsed,
        active,
        current_installment: if active { months_elapsed + 1 } else { 0 },
        remaining_installments,
        remaining_amount: round2(remaining_installments as f64 * installment_amount),
    }
}

/// Last month in which an installment is charged.
pub fn final_month(start_date: NaiveDate, total_installments: u32) -> Period {
    Period::of(start_date).add_months(total_installments.saturating_sub(1) as i32)
}

/// Whether the plan charges an installment in `period`.
///
/// Installment `k` is charged in the calendar month where its window opens,
/// `k - 1` months after the start month. [`status`] tells which window is
/// open on a given day, so on Apr 10 a plan started Jan 15 with three
/// installments is still on installment 3 although April has no charge.
pub fn charged_in(start_date: NaiveDate, total_installments: u32, period: Period) -> bool {
    total_installments > 0
        && Period::of(start_date) <= period
        && period <= final_month(start_date, total_installments)
}
