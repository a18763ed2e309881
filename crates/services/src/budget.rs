//! Monthly budgets with per-category limits and threshold alerts.
//!
//! Each category keeps two flags, `notified_at_80` and `notified_at_100`.
//! A flag is set the first time spend crosses its threshold and is never
//! cleared for that period, so every alert fires at most once. A budget
//! copied into the next period starts with clear flags and zero spend.

use database::budget as budget_store;
use database::{
    expense as expense_store, Budget, BudgetCategory, Database, Expense, NotificationKind,
};
use finance_core::money::{format_brl, format_percent, round2};
use finance_core::Period;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::notifications;
use crate::settings::SettingsCache;

/// Spend against one category limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category: BudgetCategory,
    /// `spent / limit`, 0 when the limit is not positive.
    pub ratio: f64,
    /// Ratio as a percentage, capped at 100 for progress bars.
    pub display_percent: f64,
    pub remaining: f64,
}

impl CategoryProgress {
    fn new(category: BudgetCategory) -> Self {
        let ratio = if category.limit_amount > 0.0 {
            category.spent / category.limit_amount
        } else {
            0.0
        };
        Self {
            ratio,
            display_percent: (ratio * 100.0).min(100.0),
            remaining: round2(category.limit_amount - category.spent),
            category,
        }
    }

    /// Spend has reached the limit.
    pub fn is_over(&self) -> bool {
        self.ratio >= 1.0
    }
}

/// A budget with its categories and totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    pub budget: Budget,
    pub categories: Vec<CategoryProgress>,
    pub total_limit: f64,
    pub total_spent: f64,
}

fn period_of(budget: &Budget) -> Result<Period> {
    Ok(Period::new(budget.year as i32, budget.month as u32)?)
}

async fn owned_budget(pool: &SqlitePool, owner_id: i64, budget_id: i64) -> Result<Budget> {
    let budget = budget_store::get_budget(pool, budget_id).await?;
    if budget.owner_id != owner_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(budget)
}

async fn owned_category(
    pool: &SqlitePool,
    owner_id: i64,
    category_id: i64,
) -> Result<(Budget, BudgetCategory)> {
    let category = budget_store::get_category(pool, category_id).await?;
    let budget = owned_budget(pool, owner_id, category.budget_id).await?;
    Ok((budget, category))
}

/// Create an empty budget for a period.
pub async fn create_budget(
    db: &Database,
    owner_id: i64,
    name: &str,
    period: Period,
) -> Result<Budget> {
    database::validation::validate_name("Nome do orçamento", name)?;
    let budget = budget_store::create_budget(
        db.pool(),
        owner_id,
        name.trim(),
        period.month as i64,
        period.year as i64,
    )
    .await?;
    info!(owner_id, budget_id = budget.id, period = %period.label(), "Budget created");
    Ok(budget)
}

/// Add a category limit and bring its spend up to date.
pub async fn add_category(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    budget_id: i64,
    category: &str,
    limit: f64,
) -> Result<BudgetCategory> {
    let limit = round2(limit);
    database::validation::validate_category(category)?;
    database::validation::validate_amount("Limite", limit)?;
    let budget = owned_budget(db.pool(), owner_id, budget_id).await?;

    let created =
        budget_store::add_category(db.pool(), budget.id, category.trim(), limit).await?;
    let threshold = settings.snapshot().await?.budget_alert_threshold;
    refresh_category(db.pool(), &budget, created, threshold).await
}

/// Change a limit. Lowering it may fire an alert that has not fired yet.
pub async fn update_category_limit(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    category_id: i64,
    limit: f64,
) -> Result<BudgetCategory> {
    let limit = round2(limit);
    database::validation::validate_amount("Limite", limit)?;
    let (budget, _) = owned_category(db.pool(), owner_id, category_id).await?;

    budget_store::update_limit(db.pool(), category_id, limit).await?;
    let category = budget_store::get_category(db.pool(), category_id).await?;
    let threshold = settings.snapshot().await?.budget_alert_threshold;
    refresh_category(db.pool(), &budget, category, threshold).await
}

pub async fn remove_category(db: &Database, owner_id: i64, category_id: i64) -> Result<()> {
    owned_category(db.pool(), owner_id, category_id).await?;
    budget_store::delete_category(db.pool(), category_id).await?;
    Ok(())
}

pub async fn delete_budget(db: &Database, owner_id: i64, budget_id: i64) -> Result<()> {
    owned_budget(db.pool(), owner_id, budget_id).await?;
    budget_store::delete_budget(db.pool(), budget_id).await?;
    Ok(())
}

/// Budgets of a period with progress per category.
pub async fn list_for_period(
    db: &Database,
    owner_id: i64,
    period: Period,
) -> Result<Vec<BudgetOverview>> {
    let month = period.month as i64;
    let year = period.year as i64;
    let budgets = budget_store::list_budgets(db.pool(), owner_id, month, year).await?;

    let mut overviews = Vec::with_capacity(budgets.len());
    for budget in budgets {
        let categories: Vec<CategoryProgress> = budget_store::list_categories(db.pool(), budget.id)
            .await?
            .into_iter()
            .map(CategoryProgress::new)
            .collect();
        let total_limit = round2(categories.iter().map(|c| c.category.limit_amount).sum());
        let total_spent = round2(categories.iter().map(|c| c.category.spent).sum());
        overviews.push(BudgetOverview {
            budget,
            categories,
            total_limit,
            total_spent,
        });
    }

    Ok(overviews)
}

/// Copy a budget and its limits into the following month.
///
/// The copy starts with zero spend and clear alert flags, then picks up any
/// payments already recorded for that month.
pub async fn copy_to_next_period(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    budget_id: i64,
) -> Result<Budget> {
    let source = owned_budget(db.pool(), owner_id, budget_id).await?;
    let next = period_of(&source)?.next();

    let copy = budget_store::create_budget(
        db.pool(),
        owner_id,
        &source.name,
        next.month as i64,
        next.year as i64,
    )
    .await?;

    let threshold = settings.snapshot().await?.budget_alert_threshold;
    for category in budget_store::list_categories(db.pool(), source.id).await? {
        let created = budget_store::add_category(
            db.pool(),
            copy.id,
            &category.category,
            category.limit_amount,
        )
        .await?;
        refresh_category(db.pool(), &copy, created, threshold).await?;
    }

    info!(owner_id, from = source.id, to = copy.id, period = %next.label(), "Budget copied");
    Ok(copy)
}

/// Recompute spend for every budget category matching an expense's
/// category in a period, then check thresholds.
///
/// Called after any payment of the expense is added or removed. Returns the
/// number of alerts sent.
pub async fn recalculate_for_expense(
    db: &Database,
    settings: &SettingsCache,
    expense: &Expense,
    period: Period,
) -> Result<usize> {
    let month = period.month as i64;
    let year = period.year as i64;
    let owner_id = expense.owner_id;
    let category = expense.category.as_str();
    let categories =
        budget_store::categories_for_period(db.pool(), owner_id, category, month, year).await?;
    if categories.is_empty() {
        return Ok(0);
    }

    let spent = round2(
        expense_store::sum_paid_in_category(db.pool(), owner_id, category, month, year).await?,
    );
    let threshold = settings.snapshot().await?.budget_alert_threshold;

    let mut sent = 0;
    for mut category in categories {
        budget_store::update_spent(db.pool(), category.id, spent).await?;
        category.spent = spent;
        sent += check_thresholds(db.pool(), expense.owner_id, period, &category, threshold).await?;
    }
    Ok(sent)
}

async fn refresh_category(
    pool: &SqlitePool,
    budget: &Budget,
    mut category: BudgetCategory,
    threshold: f64,
) -> Result<BudgetCategory> {
    let period = period_of(budget)?;
    let spent = round2(
        expense_store::sum_paid_in_category(
            pool,
            budget.owner_id,
            &category.category,
            budget.month,
            budget.year,
        )
        .await?,
    );
    budget_store::update_spent(pool, category.id, spent).await?;
    category.spent = spent;

    check_thresholds(pool, budget.owner_id, period, &category, threshold).await?;
    Ok(budget_store::get_category(pool, category.id).await?)
}

/// Fire the 80% and 100% alerts that have not fired yet.
///
/// The store only flips a flag that is still clear, so a concurrent check
/// cannot send the same alert twice.
async fn check_thresholds(
    pool: &SqlitePool,
    owner_id: i64,
    period: Period,
    category: &BudgetCategory,
    threshold: f64,
) -> Result<usize> {
    if category.limit_amount <= 0.0 {
        return Ok(0);
    }
    let ratio = category.spent / category.limit_amount;
    let mut sent = 0;

    if ratio >= threshold
        && !category.notified_at_80
        && budget_store::mark_notified_80(pool, category.id).await?
    {
        let message = format!(
            "Você já usou {} do limite de {} em {} ({} de {}).",
            format_percent(ratio),
            category.category,
            period.label(),
            format_brl(category.spent),
            format_brl(category.limit_amount),
        );
        let title = "Orçamento quase no limite";
        notifications::notify(pool, owner_id, NotificationKind::Budget80, title, &message).await?;
        info!(owner_id, category = %category.category, ratio, "Budget alert threshold crossed");
        sent += 1;
    }

    if ratio >= 1.0
        && !category.notified_at_100
        && budget_store::mark_notified_100(pool, category.id).await?
    {
        let message = format!(
            "O limite de {} em {} foi atingido ({} de {}).",
            category.category,
            period.label(),
            format_brl(category.spent),
            format_brl(category.limit_amount),
        );
        let title = "Orçamento estourado";
        notifications::notify(pool, owner_id, NotificationKind::Budget100, title, &message).await?;
        info!(owner_id, category = %category.category, ratio, "Budget limit reached");
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses;
    use crate::test_support::{seed_user, variable_expense};
    use database::notification as notification_store;

    #[tokio::test]
    async fn test_eighty_percent_alert_fires_once() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let march = Period::new(2025, 3).unwrap();

        let budget = create_budget(&db, ana.id, "Casa", march).await.unwrap();
        add_category(&db, &settings, ana.id, budget.id, "Mercado", 1_000.0).await.unwrap();

        let feira = variable_expense(ana.id, "Feira", 850.0, "Mercado");
        let first = expenses::create_expense(&db, ana.id, feira).await.unwrap();
        expenses::pay(&db, &settings, ana.id, first.id, march, None).await.unwrap();

        let padaria = variable_expense(ana.id, "Padaria", 50.0, "Mercado");
        let second = expenses::create_expense(&db, ana.id, padaria).await.unwrap();
        expenses::pay(&db, &settings, ana.id, second.id, march, None).await.unwrap();

        let count = notification_store::count_by_kind(db.pool(), ana.id, NotificationKind::Budget80)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            notification_store::count_by_kind(db.pool(), ana.id, NotificationKind::Budget100)
                .await
                .unwrap(),
            0
        );

        let overview = list_for_period(&db, ana.id, march).await.unwrap();
        assert_eq!(overview[0].categories[0].category.spent, 900.0);
        assert!(overview[0].categories[0].category.notified_at_80);
    }

    #[tokio::test]
    async fn test_flags_survive_payment_removal() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let march = Period::new(2025, 3).unwrap();

        let budget = create_budget(&db, ana.id, "Casa", march).await.unwrap();
        add_category(&db, &settings, ana.id, budget.id, "Lazer", 100.0).await.unwrap();

        let show = variable_expense(ana.id, "Show", 120.0, "Lazer");
        let show = expenses::create_expense(&db, ana.id, show).await.unwrap();
        expenses::pay(&db, &settings, ana.id, show.id, march, None).await.unwrap();
        expenses::unpay(&db, &settings, ana.id, show.id, march).await.unwrap();

        let overview = list_for_period(&db, ana.id, march).await.unwrap();
        let category = &overview[0].categories[0].category;
        assert_eq!(category.spent, 0.0);
        assert!(category.notified_at_80);
        assert!(category.notified_at_100);

        // Paying again in the same period does not alert again
        expenses::pay(&db, &settings, ana.id, show.id, march, None).await.unwrap();
        assert_eq!(notifications::unread_count(db.pool(), ana.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_copy_to_next_period_resets_flags() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let december = Period::new(2025, 12).unwrap();

        let budget = create_budget(&db, ana.id, "Casa", december).await.unwrap();
        add_category(&db, &settings, ana.id, budget.id, "Lazer", 100.0).await.unwrap();
        let show = variable_expense(ana.id, "Show", 100.0, "Lazer");
        let show = expenses::create_expense(&db, ana.id, show).await.unwrap();
        expenses::pay(&db, &settings, ana.id, show.id, december, None).await.unwrap();

        let copy = copy_to_next_period(&db, &settings, ana.id, budget.id).await.unwrap();
        assert_eq!((copy.month, copy.year), (1, 2026));

        let january = list_for_period(&db, ana.id, Period::new(2026, 1).unwrap()).await.unwrap();
        let category = &january[0].categories[0].category;
        assert_eq!(category.limit_amount, 100.0);
        assert_eq!(category.spent, 0.0);
        assert!(!category.notified_at_80);
        assert!(!category.notified_at_100);

        // Copying twice collides with the existing budget
        assert!(copy_to_next_period(&db, &settings, ana.id, budget.id).await.is_err());
    }

    #[tokio::test]
    async fn test_other_users_cannot_edit() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;

        let march = Period::new(2025, 3).unwrap();
        let budget = create_budget(&db, ana.id, "Casa", march).await.unwrap();
        assert!(matches!(
            add_category(&db, &settings, bia.id, budget.id, "Lazer", 100.0).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            delete_budget(&db, bia.id, budget.id).await,
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn test_progress_caps_display() {
        let progress = CategoryProgress::new(BudgetCategory {
            id: 1,
            budget_id: 1,
            category: "Lazer".to_string(),
            limit_amount: 100.0,
            spent: 150.0,
            notified_at_80: true,
            notified_at_100: true,
        });
        assert_eq!(progress.display_percent, 100.0);
        assert_eq!(progress.remaining, -50.0);
        assert!(progress.is_over());
    }
}
