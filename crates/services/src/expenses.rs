//! Expense lifecycle, monthly payments and weighted splits.

use database::expense as expense_store;
use database::{
    validation, Database, Expense, ExpenseKind, ExpensePayment, ExpenseSplit, NewExpense,
};
use finance_core::money::round2;
use finance_core::period::check_year;
use finance_core::split::{self, ShareRequest};
use finance_core::Period;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::accounts;
use crate::budget;
use crate::error::{Result, ServiceError};
use crate::groups;
use crate::settings::SettingsCache;

/// One expense and whether it was paid in the period being viewed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseStatus {
    pub expense: Expense,
    pub payment: Option<ExpensePayment>,
}

impl ExpenseStatus {
    pub fn is_paid(&self) -> bool {
        self.payment.is_some()
    }
}

/// Paid/pending view of a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOverview {
    pub period: Period,
    pub items: Vec<ExpenseStatus>,
    pub total: f64,
    pub paid: f64,
    pub pending: f64,
}

/// Validate and normalize form input. Variable expenses carry no due day.
///
/// The amount is rounded to cents before it is checked.
fn normalize(mut new: NewExpense) -> Result<NewExpense> {
    new.amount = round2(new.amount);
    validation::validate_name("Descrição", &new.description)?;
    validation::validate_category(&new.category)?;
    validation::validate_amount("Valor", new.amount)?;

    new.description = new.description.trim().to_string();
    new.category = new.category.trim().to_string();

    match new.kind {
        ExpenseKind::Variable => new.due_day = None,
        ExpenseKind::Fixed => {
            if let Some(day) = new.due_day {
                validation::validate_day(day)?;
            }
        }
    }

    Ok(new)
}

async fn check_links(pool: &SqlitePool, user_id: i64, new: &NewExpense) -> Result<()> {
    if let Some(account_id) = new.account_id {
        accounts::require_access(pool, user_id, account_id).await?;
    }
    if let Some(group_id) = new.group_id {
        groups::require_member(pool, group_id, user_id).await?;
    }
    Ok(())
}

/// Fetch an expense the user owns.
pub async fn owned_expense(pool: &SqlitePool, user_id: i64, expense_id: i64) -> Result<Expense> {
    let expense = expense_store::get_expense(pool, expense_id).await?;
    if expense.owner_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(expense)
}

pub async fn create_expense(db: &Database, user_id: i64, new: NewExpense) -> Result<Expense> {
    let new = normalize(NewExpense {
        owner_id: user_id,
        ..new
    })?;
    check_links(db.pool(), user_id, &new).await?;

    let expense = expense_store::insert_expense(db.pool(), &new).await?;
    info!(user_id, expense_id = expense.id, category = %expense.category, "Expense created");
    Ok(expense)
}

/// Overwrite an expense.
///
/// Shares of a split expense follow a new amount using their stored
/// percentages. Budgets are refreshed for every period the expense was paid
/// in, under both the old and the new category.
pub async fn update_expense(
    db: &Database,
    settings: &SettingsCache,
    user_id: i64,
    expense_id: i64,
    new: NewExpense,
) -> Result<Expense> {
    let before = owned_expense(db.pool(), user_id, expense_id).await?;
    let new = normalize(NewExpense {
        owner_id: user_id,
        ..new
    })?;
    check_links(db.pool(), user_id, &new).await?;

    let mut tx = db.begin().await?;
    let splits = expense_store::list_splits(&mut *tx, expense_id).await?;
    if !splits.is_empty() && new.group_id != before.group_id {
        return Err(ServiceError::invalid("Uma despesa dividida não pode mudar de grupo"));
    }

    expense_store::update_expense(&mut *tx, expense_id, &new).await?;
    if !splits.is_empty() && new.amount != before.amount {
        let requests: Vec<ShareRequest> = splits
            .iter()
            .map(|row| ShareRequest {
                user_id: row.user_id,
                percentage: row.percentage,
            })
            .collect();
        let shares = split::compute(new.amount, &requests)?;
        for (row, share) in splits.iter().zip(shares) {
            expense_store::set_split_amount(&mut *tx, row.id, share.amount).await?;
        }
    }
    tx.commit().await?;

    let after = expense_store::get_expense(db.pool(), expense_id).await?;
    let payments = expense_store::list_payments_for_expense(db.pool(), expense_id).await?;
    refresh_paid_periods(db, settings, &payments, &before).await?;
    if after.category != before.category {
        refresh_paid_periods(db, settings, &payments, &after).await?;
    }

    info!(user_id, expense_id, category = %after.category, "Expense updated");
    Ok(after)
}

/// Flip the active flag.
pub async fn toggle_active(db: &Database, user_id: i64, expense_id: i64) -> Result<Expense> {
    let expense = owned_expense(db.pool(), user_id, expense_id).await?;
    expense_store::set_active(db.pool(), expense_id, !expense.active).await?;
    Ok(expense_store::get_expense(db.pool(), expense_id).await?)
}

/// Delete an expense with its payments and splits, then refresh the budgets
/// of every period it had been paid in.
pub async fn delete_expense(
    db: &Database,
    settings: &SettingsCache,
    user_id: i64,
    expense_id: i64,
) -> Result<()> {
    let expense = owned_expense(db.pool(), user_id, expense_id).await?;
    let payments = expense_store::list_payments_for_expense(db.pool(), expense_id).await?;

    expense_store::delete_expense(db.pool(), expense_id).await?;
    refresh_paid_periods(db, settings, &payments, &expense).await?;

    info!(user_id, expense_id, periods = payments.len(), "Expense deleted");
    Ok(())
}

/// Recalculate the budgets of `expense`'s category for each paid period.
async fn refresh_paid_periods(
    db: &Database,
    settings: &SettingsCache,
    payments: &[ExpensePayment],
    expense: &Expense,
) -> Result<()> {
    for payment in payments {
        let period = Period::new(payment.year as i32, payment.month as u32)?;
        budget::recalculate_for_expense(db, settings, expense, period).await?;
    }
    Ok(())
}

pub async fn list(db: &Database, user_id: i64) -> Result<Vec<Expense>> {
    Ok(expense_store::list_expenses(db.pool(), user_id).await?)
}

/// Record the payment of an expense for a period and refresh budgets.
///
/// `amount` defaults to the expense amount. A second payment for the same
/// period fails with `AlreadyExists`.
pub async fn pay(
    db: &Database,
    settings: &SettingsCache,
    user_id: i64,
    expense_id: i64,
    period: Period,
    amount: Option<f64>,
) -> Result<ExpensePayment> {
    let expense = owned_expense(db.pool(), user_id, expense_id).await?;
    let amount = round2(amount.unwrap_or(expense.amount));
    validation::validate_amount("Valor pago", amount)?;

    let payment = expense_store::insert_payment(
        db.pool(),
        expense.id,
        period.month as i64,
        period.year as i64,
        amount,
    )
    .await?;

    budget::recalculate_for_expense(db, settings, &expense, period).await?;
    Ok(payment)
}

/// Remove the payment for a period. Budget alert flags stay as they are.
pub async fn unpay(
    db: &Database,
    settings: &SettingsCache,
    user_id: i64,
    expense_id: i64,
    period: Period,
) -> Result<bool> {
    let expense = owned_expense(db.pool(), user_id, expense_id).await?;
    let month = period.month as i64;
    let year = period.year as i64;
    let removed = expense_store::delete_payment(db.pool(), expense.id, month, year).await?;

    if removed {
        budget::recalculate_for_expense(db, settings, &expense, period).await?;
    }
    Ok(removed)
}

/// Expenses of a month with their payment status.
///
/// Active fixed expenses are always listed. Variable expenses appear in the
/// month they were paid or, if unpaid, the month they were created.
pub async fn monthly_overview(
    db: &Database,
    user_id: i64,
    period: Period,
) -> Result<MonthlyOverview> {
    let month = period.month as i64;
    let year = period.year as i64;
    let payments =
        expense_store::list_payments_for_period(db.pool(), user_id, month, year).await?;

    let mut items = Vec::new();
    for expense in expense_store::list_expenses(db.pool(), user_id).await? {
        let payment = payments.iter().find(|p| p.expense_id == expense.id).cloned();
        let listed = match expense.kind {
            ExpenseKind::Fixed => expense.active || payment.is_some(),
            ExpenseKind::Variable => {
                let created_in = Period::of(expense.created_at.date());
                payment.is_some() || (expense.active && created_in == period)
            }
        };
        if listed {
            items.push(ExpenseStatus { expense, payment });
        }
    }

    let paid = round2(
        items
            .iter()
            .filter_map(|i| i.payment.as_ref())
            .map(|p| p.amount)
            .sum(),
    );
    let pending = round2(
        items
            .iter()
            .filter(|i| !i.is_paid())
            .map(|i| i.expense.amount)
            .sum(),
    );

    Ok(MonthlyOverview {
        period,
        items,
        total: round2(paid + pending),
        paid,
        pending,
    })
}

/// Paid totals per category for a month, largest first.
pub async fn category_totals(
    db: &Database,
    user_id: i64,
    period: Period,
) -> Result<Vec<(String, f64)>> {
    Ok(expense_store::totals_by_category(
        db.pool(),
        user_id,
        period.month as i64,
        period.year as i64,
    )
    .await?)
}

/// Paid totals for each of the twelve months of a year.
pub async fn monthly_totals(
    db: &Database,
    user_id: i64,
    year: i32,
) -> Result<Vec<(Period, f64)>> {
    check_year(year)?;
    let rows = expense_store::monthly_paid_totals(db.pool(), user_id, year as i64).await?;
    Ok(Period::year_months(year)
        .map(|period| {
            let total = rows
                .iter()
                .find(|(month, _)| *month == period.month as i64)
                .map(|(_, total)| round2(*total))
                .unwrap_or(0.0);
            (period, total)
        })
        .collect())
}

/// Create a group expense split among members, all or nothing.
///
/// Every participant must belong to the expense's group and the percentages
/// must add up to 100. On any failure no expense or split row remains.
pub async fn create_split_expense(
    db: &Database,
    user_id: i64,
    new: NewExpense,
    participants: &[ShareRequest],
) -> Result<(Expense, Vec<ExpenseSplit>)> {
    let new = normalize(NewExpense {
        owner_id: user_id,
        ..new
    })?;
    let group_id = new
        .group_id
        .ok_or_else(|| ServiceError::invalid("Uma despesa dividida precisa de um grupo"))?;

    let mut tx = db.begin().await?;

    if database::group::get_member(&mut *tx, group_id, user_id).await?.is_none() {
        return Err(ServiceError::Forbidden);
    }
    for participant in participants {
        if database::group::get_member(&mut *tx, group_id, participant.user_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::invalid(format!(
                "O participante {} não é membro do grupo",
                participant.user_id
            )));
        }
    }

    let expense = expense_store::insert_expense(&mut *tx, &new).await?;
    let shares = split::compute(expense.amount, participants)?;

    let mut splits = Vec::with_capacity(shares.len());
    for share in shares {
        let row = expense_store::insert_split(
            &mut *tx,
            expense.id,
            share.user_id,
            share.percentage,
            share.amount,
        )
        .await?;
        splits.push(row);
    }

    tx.commit().await?;

    info!(
        user_id,
        expense_id = expense.id,
        group_id,
        participants = splits.len(),
        "Split expense created"
    );
    Ok((expense, splits))
}

/// Shares of an expense, visible to its owner and to members of its group.
pub async fn list_splits(
    db: &Database,
    user_id: i64,
    expense_id: i64,
) -> Result<Vec<ExpenseSplit>> {
    let expense = expense_store::get_expense(db.pool(), expense_id).await?;
    if expense.owner_id != user_id {
        match expense.group_id {
            Some(group_id) => {
                groups::require_member(db.pool(), group_id, user_id).await?;
            }
            None => return Err(ServiceError::Forbidden),
        }
    }
    Ok(expense_store::list_splits(db.pool(), expense_id).await?)
}

/// The user's total share across active split expenses.
pub async fn user_share_total(db: &Database, user_id: i64) -> Result<f64> {
    Ok(round2(expense_store::user_split_total(db.pool(), user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_expense, seed_group, seed_user, variable_expense};
    use database::DatabaseError;
    use finance_core::CoreError;

    fn share(user_id: i64, percentage: f64) -> ShareRequest {
        ShareRequest {
            user_id,
            percentage,
        }
    }

    #[tokio::test]
    async fn test_split_rejected_when_not_hundred() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let family = seed_group(&db, &ana, &[&bia]).await;

        let mut new = variable_expense(ana.id, "Aluguel", 2_000.0, "Moradia");
        new.group_id = Some(family.id);
        let shares = [
            share(ana.id, 60.0),
            share(bia.id, 30.0),
        ];

        let result = create_split_expense(&db, ana.id, new, &shares).await;
        assert!(matches!(
            result,
            Err(ServiceError::Core(CoreError::SplitTotal { .. }))
        ));
        assert_eq!(expense_store::count_expenses(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_split_rejects_non_member() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let stranger = seed_user(&db, "Zé").await;
        let family = seed_group(&db, &ana, &[&bia]).await;

        let mut new = variable_expense(ana.id, "Aluguel", 2_000.0, "Moradia");
        new.group_id = Some(family.id);
        let shares = [
            share(ana.id, 50.0),
            share(stranger.id, 50.0),
        ];

        assert!(matches!(
            create_split_expense(&db, ana.id, new, &shares).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(expense_store::count_expenses(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_split_last_share_absorbs_rounding() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let caio = seed_user(&db, "Caio").await;
        let family = seed_group(&db, &ana, &[&bia, &caio]).await;

        let mut new = variable_expense(ana.id, "Internet", 100.0, "Casa");
        new.group_id = Some(family.id);
        let shares = split::equal_shares(&[ana.id, bia.id, caio.id]);

        let (expense, splits) = create_split_expense(&db, ana.id, new, &shares).await.unwrap();
        assert_eq!(splits.len(), 3);
        let total: f64 = splits.iter().map(|s| s.amount).sum();
        assert!((total - expense.amount).abs() < 1e-9);
        assert_eq!(splits[0].amount, 33.33);

        assert_eq!(user_share_total(&db, bia.id).await.unwrap(), 33.33);
        assert_eq!(list_splits(&db, caio.id, expense.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pay_twice_same_period_rejected() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let rent = create_expense(&db, ana.id, fixed_expense(ana.id, "Aluguel", 1_500.0, 10))
            .await
            .unwrap();
        let march = Period::new(2025, 3).unwrap();

        pay(&db, &settings, ana.id, rent.id, march, None).await.unwrap();
        assert!(matches!(
            pay(&db, &settings, ana.id, rent.id, march, None).await,
            Err(ServiceError::Database(DatabaseError::AlreadyExists { .. }))
        ));
        // Next month is a separate period
        pay(&db, &settings, ana.id, rent.id, march.next(), Some(1_400.0)).await.unwrap();

        let totals = monthly_totals(&db, ana.id, 2025).await.unwrap();
        assert_eq!(totals.len(), 12);
        assert_eq!(totals[2].1, 1_500.0);
        assert_eq!(totals[3].1, 1_400.0);
        assert_eq!(totals[0].1, 0.0);
    }

    #[tokio::test]
    async fn test_monthly_overview_paid_and_pending() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let rent = create_expense(&db, ana.id, fixed_expense(ana.id, "Aluguel", 1_500.0, 10))
            .await
            .unwrap();
        create_expense(&db, ana.id, fixed_expense(ana.id, "Luz", 200.0, 15))
            .await
            .unwrap();
        let march = Period::new(2025, 3).unwrap();
        pay(&db, &settings, ana.id, rent.id, march, None).await.unwrap();

        let overview = monthly_overview(&db, ana.id, march).await.unwrap();
        assert_eq!(overview.items.len(), 2);
        assert_eq!(overview.paid, 1_500.0);
        assert_eq!(overview.pending, 200.0);
        assert_eq!(overview.total, 1_700.0);
    }

    #[tokio::test]
    async fn test_variable_expense_drops_due_day_and_owner_checks() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;

        let mut new = variable_expense(ana.id, "Cinema", 60.0, "Lazer");
        new.due_day = Some(5);
        let expense = create_expense(&db, ana.id, new).await.unwrap();
        assert_eq!(expense.due_day, None);

        assert!(matches!(
            toggle_active(&db, bia.id, expense.id).await,
            Err(ServiceError::Forbidden)
        ));
        let toggled = toggle_active(&db, ana.id, expense.id).await.unwrap();
        assert!(!toggled.active);

        let bad = fixed_expense(ana.id, "Água", 80.0, 40);
        assert!(matches!(
            create_expense(&db, ana.id, bad).await,
            Err(ServiceError::Validation(_))
        ));
    }

    async fn category_spent(db: &Database, user_id: i64, period: Period, name: &str) -> f64 {
        let budgets = budget::list_for_period(db, user_id, period).await.unwrap();
        budgets[0]
            .categories
            .iter()
            .find(|progress| progress.category.category == name)
            .map(|progress| progress.category.spent)
            .unwrap()
    }

    #[tokio::test]
    async fn test_delete_paid_expense_clears_budget_spend() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let march = Period::new(2025, 3).unwrap();

        let casa = budget::create_budget(&db, ana.id, "Casa", march).await.unwrap();
        budget::add_category(&db, &settings, ana.id, casa.id, "Lazer", 1_000.0)
            .await
            .unwrap();

        let show = variable_expense(ana.id, "Show", 500.0, "Lazer");
        let show = create_expense(&db, ana.id, show).await.unwrap();
        pay(&db, &settings, ana.id, show.id, march, None).await.unwrap();
        assert_eq!(category_spent(&db, ana.id, march, "Lazer").await, 500.0);

        delete_expense(&db, &settings, ana.id, show.id).await.unwrap();
        assert_eq!(category_spent(&db, ana.id, march, "Lazer").await, 0.0);
    }

    #[tokio::test]
    async fn test_category_change_moves_budget_spend() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let march = Period::new(2025, 3).unwrap();

        let casa = budget::create_budget(&db, ana.id, "Casa", march).await.unwrap();
        for name in ["Lazer", "Outros"] {
            budget::add_category(&db, &settings, ana.id, casa.id, name, 1_000.0)
                .await
                .unwrap();
        }

        let show = variable_expense(ana.id, "Show", 500.0, "Lazer");
        let show = create_expense(&db, ana.id, show).await.unwrap();
        pay(&db, &settings, ana.id, show.id, march, None).await.unwrap();

        let moved = variable_expense(ana.id, "Show", 500.0, "Outros");
        let updated = update_expense(&db, &settings, ana.id, show.id, moved).await.unwrap();
        assert_eq!(updated.category, "Outros");

        assert_eq!(category_spent(&db, ana.id, march, "Lazer").await, 0.0);
        assert_eq!(category_spent(&db, ana.id, march, "Outros").await, 500.0);
    }

    #[tokio::test]
    async fn test_split_shares_follow_new_amount() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let family = seed_group(&db, &ana, &[&bia]).await;

        let mut new = variable_expense(ana.id, "Reforma", 1_000.0, "Casa");
        new.group_id = Some(family.id);
        let shares = split::equal_shares(&[ana.id, bia.id]);
        let (expense, _) = create_split_expense(&db, ana.id, new.clone(), &shares)
            .await
            .unwrap();

        new.amount = 3_000.0;
        let updated = update_expense(&db, &settings, ana.id, expense.id, new.clone())
            .await
            .unwrap();
        assert_eq!(updated.amount, 3_000.0);
        assert_eq!(updated.group_id, Some(family.id));

        let splits = list_splits(&db, ana.id, expense.id).await.unwrap();
        let total: f64 = splits.iter().map(|s| s.amount).sum();
        assert!((total - 3_000.0).abs() < 1e-9);
        assert_eq!(splits[0].amount, 1_500.0);
        assert_eq!(splits[0].percentage, 50.0);

        // Shares stay tied to the group they were computed for
        new.group_id = None;
        assert!(matches!(
            update_expense(&db, &settings, ana.id, expense.id, new).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_amount_rounding_to_zero_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        let tiny = variable_expense(ana.id, "Chiclete", 0.004, "Outros");
        assert!(matches!(
            create_expense(&db, ana.id, tiny).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(expense_store::count_expenses(db.pool()).await.unwrap(), 0);

        let gum = variable_expense(ana.id, "Chiclete", 2.0, "Outros");
        let gum = create_expense(&db, ana.id, gum).await.unwrap();
        let march = Period::new(2025, 3).unwrap();
        assert!(matches!(
            pay(&db, &settings, ana.id, gum.id, march, Some(0.001)).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
