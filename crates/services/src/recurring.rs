//! Recurring incomes and expenses, materialized on demand.
//!
//! Nothing runs in the background. `process_due` is called when the user
//! opens the dashboard or presses the process button, and catches up on
//! every occurrence missed since the last run.

use chrono::{Datelike, NaiveDate};
use database::recurring as recurring_store;
use database::{
    expense as expense_store, validation, Database, ExpenseKind, NewExpense, RecurringTransaction,
    TransactionKind,
};
use finance_core::money::round2;
use finance_core::recurrence::{self, Frequency};
use finance_core::Period;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::budget;
use crate::error::{Result, ServiceError};
use crate::income::{self, IncomeInput};
use crate::settings::SettingsCache;

/// Fields shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringInput {
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

fn validate(input: &RecurringInput) -> Result<()> {
    validation::validate_name("Descrição", &input.description)?;
    validation::validate_category(&input.category)?;
    validation::validate_amount("Valor", round2(input.amount))?;
    Ok(())
}

async fn owned(pool: &SqlitePool, owner_id: i64, id: i64) -> Result<RecurringTransaction> {
    let item = recurring_store::get_recurring(pool, id).await?;
    if item.owner_id != owner_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(item)
}

pub async fn create(
    db: &Database,
    owner_id: i64,
    input: &RecurringInput,
) -> Result<RecurringTransaction> {
    validate(input)?;
    Ok(recurring_store::create_recurring(
        db.pool(),
        owner_id,
        input.kind,
        input.description.trim(),
        round2(input.amount),
        input.category.trim(),
        input.frequency.as_str(),
        input.start_date,
    )
    .await?)
}

/// Update description, amount, category and frequency. The schedule keeps
/// its next run date.
pub async fn update(
    db: &Database,
    owner_id: i64,
    id: i64,
    input: &RecurringInput,
) -> Result<RecurringTransaction> {
    validate(input)?;
    owned(db.pool(), owner_id, id).await?;
    recurring_store::update_recurring(
        db.pool(),
        id,
        input.description.trim(),
        round2(input.amount),
        input.category.trim(),
        input.frequency.as_str(),
    )
    .await?;
    Ok(recurring_store::get_recurring(db.pool(), id).await?)
}

pub async fn toggle_active(db: &Database, owner_id: i64, id: i64) -> Result<RecurringTransaction> {
    let item = owned(db.pool(), owner_id, id).await?;
    recurring_store::set_active(db.pool(), id, !item.active).await?;
    Ok(recurring_store::get_recurring(db.pool(), id).await?)
}

pub async fn delete(db: &Database, owner_id: i64, id: i64) -> Result<()> {
    owned(db.pool(), owner_id, id).await?;
    recurring_store::delete_recurring(db.pool(), id).await?;
    Ok(())
}

pub async fn list(db: &Database, owner_id: i64) -> Result<Vec<RecurringTransaction>> {
    Ok(recurring_store::list_recurring(db.pool(), owner_id).await?)
}

/// Materialize every occurrence due on or before `today`.
///
/// Expense items become a variable expense paid in the occurrence's month.
/// Income items become an income at exchange rate 1.0 with tax computed as
/// usual. Each item is caught up in its own transaction together with its
/// new `next_run`. Returns the number of occurrences created.
pub async fn process_due(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    today: NaiveDate,
) -> Result<usize> {
    let inss = settings.snapshot().await?.inss_config();
    let mut created = 0;
    let mut touched = Vec::new();

    for item in recurring_store::list_due(db.pool(), owner_id, today).await? {
        let frequency: Frequency = match item.frequency.parse() {
            Ok(frequency) => frequency,
            Err(err) => {
                warn!(recurring_id = item.id, "Skipping recurring item: {}", err);
                continue;
            }
        };
        let (dates, next_run) =
            recurrence::due_occurrences(item.next_run, frequency, item.start_date.day(), today);

        let mut tx = db.begin().await?;
        for date in &dates {
            match item.kind {
                TransactionKind::Expense => {
                    let new = NewExpense {
                        owner_id,
                        account_id: None,
                        group_id: None,
                        description: item.description.clone(),
                        amount: item.amount,
                        category: item.category.clone(),
                        kind: ExpenseKind::Variable,
                        due_day: None,
                    };
                    let expense = expense_store::insert_expense(&mut *tx, &new).await?;
                    let period = Period::of(*date);
                    expense_store::insert_payment(
                        &mut *tx,
                        expense.id,
                        period.month as i64,
                        period.year as i64,
                        expense.amount,
                    )
                    .await?;
                    touched.push((expense, period));
                }
                TransactionKind::Income => {
                    let input = IncomeInput {
                        description: item.description.clone(),
                        amount_usd: item.amount,
                        exchange_rate: 1.0,
                        received_on: *date,
                        account_id: None,
                    };
                    income::record_on(&mut tx, &inss, owner_id, &input).await?;
                }
            }
        }
        recurring_store::set_next_run(&mut *tx, item.id, next_run).await?;
        tx.commit().await?;

        created += dates.len();
    }

    // Budgets are refreshed once per category and month
    touched.sort_by(|a, b| (&a.0.category, a.1).cmp(&(&b.0.category, b.1)));
    touched.dedup_by(|a, b| a.0.category == b.0.category && a.1 == b.1);
    for (expense, period) in &touched {
        budget::recalculate_for_expense(db, settings, expense, *period).await?;
    }

    if created > 0 {
        info!(owner_id, created, "Recurring transactions processed");
    }
    Ok(created)
}
