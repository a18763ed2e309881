//! Credit cards and installment purchases.

use chrono::NaiveDate;
use database::card as card_store;
use database::{validation, CreditCard, Database, Installment, NotificationKind};
use finance_core::installment::{self, InstallmentStatus};
use finance_core::money::{format_brl, round2};
use finance_core::Period;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::notifications;

/// An installment with its status on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentView {
    pub installment: Installment,
    pub status: InstallmentStatus,
}

impl InstallmentView {
    fn at(installment: Installment, today: NaiveDate) -> Self {
        let status = installment::status(
            installment.start_date,
            installment.total_installments.max(0) as u32,
            installment.installment_amount,
            today,
        );
        Self { installment, status }
    }
}

/// A card with its active purchases and limit usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub card: CreditCard,
    pub installments: Vec<InstallmentView>,
    /// Sum of the installment amounts charged in the current calendar month.
    pub monthly_commitment: f64,
    /// Sum of what is still owed on active installments.
    pub committed: f64,
    pub available_limit: f64,
}

fn validate_card(name: &str, credit_limit: f64, closing_day: i64, due_day: i64) -> Result<()> {
    validation::validate_name("Nome do cartão", name)?;
    if !credit_limit.is_finite() || credit_limit < 0.0 {
        return Err(ServiceError::invalid("O limite não pode ser negativo"));
    }
    validation::validate_day(closing_day)?;
    validation::validate_day(due_day)?;
    Ok(())
}

async fn owned_card(pool: &SqlitePool, owner_id: i64, card_id: i64) -> Result<CreditCard> {
    let card = card_store::get_card(pool, card_id).await?;
    if card.owner_id != owner_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(card)
}

pub async fn create_card(
    db: &Database,
    owner_id: i64,
    name: &str,
    credit_limit: f64,
    closing_day: i64,
    due_day: i64,
) -> Result<CreditCard> {
    validate_card(name, credit_limit, closing_day, due_day)?;
    Ok(card_store::create_card(
        db.pool(),
        owner_id,
        name.trim(),
        round2(credit_limit),
        closing_day,
        due_day,
    )
    .await?)
}

pub async fn update_card(
    db: &Database,
    owner_id: i64,
    card_id: i64,
    name: &str,
    credit_limit: f64,
    closing_day: i64,
    due_day: i64,
) -> Result<CreditCard> {
    validate_card(name, credit_limit, closing_day, due_day)?;
    owned_card(db.pool(), owner_id, card_id).await?;
    card_store::update_card(
        db.pool(),
        card_id,
        name.trim(),
        round2(credit_limit),
        closing_day,
        due_day,
    )
    .await?;
    Ok(card_store::get_card(db.pool(), card_id).await?)
}

pub async fn delete_card(db: &Database, owner_id: i64, card_id: i64) -> Result<()> {
    owned_card(db.pool(), owner_id, card_id).await?;
    card_store::delete_card(db.pool(), card_id).await?;
    Ok(())
}

/// Add a purchase split into `count` monthly installments.
pub async fn add_installment(
    db: &Database,
    owner_id: i64,
    card_id: i64,
    description: &str,
    total_amount: f64,
    count: u32,
    start_date: NaiveDate,
) -> Result<Installment> {
    let total_amount = round2(total_amount);
    validation::validate_name("Descrição", description)?;
    validation::validate_amount("Valor total", total_amount)?;
    owned_card(db.pool(), owner_id, card_id).await?;
    let amount = installment::installment_amount(total_amount, count)?;
    validation::validate_amount("Valor da parcela", amount)?;

    let created = card_store::insert_installment(
        db.pool(),
        card_id,
        description.trim(),
        total_amount,
        amount,
        count as i64,
        start_date,
    )
    .await?;
    info!(owner_id, card_id, installment_id = created.id, count, "Installment purchase added");
    Ok(created)
}

pub async fn delete_installment(db: &Database, owner_id: i64, installment_id: i64) -> Result<()> {
    let installment = card_store::get_installment(db.pool(), installment_id).await?;
    owned_card(db.pool(), owner_id, installment.card_id).await?;
    card_store::delete_installment(db.pool(), installment_id).await?;
    Ok(())
}

/// Installments of a card still being charged on `today`.
pub async fn active_installments(
    db: &Database,
    owner_id: i64,
    card_id: i64,
    today: NaiveDate,
) -> Result<Vec<InstallmentView>> {
    owned_card(db.pool(), owner_id, card_id).await?;
    Ok(card_store::list_installments(db.pool(), card_id)
        .await?
        .into_iter()
        .map(|i| InstallmentView::at(i, today))
        .filter(|view| view.status.active)
        .collect())
}

fn summarize(card: CreditCard, installments: Vec<Installment>, today: NaiveDate) -> CardSummary {
    let monthly_commitment = due_in_period(&installments, Period::of(today));
    let installments: Vec<InstallmentView> = installments
        .into_iter()
        .map(|i| InstallmentView::at(i, today))
        .filter(|view| view.status.active)
        .collect();
    let committed = round2(installments.iter().map(|v| v.status.remaining_amount).sum());

    CardSummary {
        available_limit: round2(card.credit_limit - committed),
        card,
        installments,
        monthly_commitment,
        committed,
    }
}

/// Every card of a user with its active installments.
pub async fn card_summaries(
    db: &Database,
    owner_id: i64,
    today: NaiveDate,
) -> Result<Vec<CardSummary>> {
    let mut summaries = Vec::new();
    for card in card_store::list_cards(db.pool(), owner_id).await? {
        let installments = card_store::list_installments(db.pool(), card.id).await?;
        summaries.push(summarize(card, installments, today));
    }
    Ok(summaries)
}

/// Sum of installment amounts charged this month across all cards.
pub async fn monthly_commitment(db: &Database, owner_id: i64, today: NaiveDate) -> Result<f64> {
    Ok(round2(
        card_summaries(db, owner_id, today)
            .await?
            .iter()
            .map(|s| s.monthly_commitment)
            .sum(),
    ))
}

/// Installment charges falling in `period`.
///
/// Used for both the cards page and the yearly report, so a month shows the
/// same charges in each.
pub fn due_in_period(installments: &[Installment], period: Period) -> f64 {
    round2(
        installments
            .iter()
            .filter(|i| {
                installment::charged_in(i.start_date, i.total_installments.max(0) as u32, period)
            })
            .map(|i| i.installment_amount)
            .sum(),
    )
}

/// Announce purchases whose last installment has been charged.
///
/// Each purchase is announced once. Returns the number of notifications sent.
pub async fn notify_finished(db: &Database, owner_id: i64, today: NaiveDate) -> Result<usize> {
    let mut sent = 0;
    for installment in card_store::list_installments_for_owner(db.pool(), owner_id).await? {
        if installment.finished_notified {
            continue;
        }
        let view = InstallmentView::at(installment, today);
        if view.status.active {
            continue;
        }
        if card_store::mark_finished_notified(db.pool(), view.installment.id).await? {
            let message = format!(
                "A compra \"{}\" ({}) foi totalmente paga.",
                view.installment.description,
                format_brl(view.installment.total_amount)
            );
            notifications::notify(
                db.pool(),
                owner_id,
                NotificationKind::InstallmentFinished,
                "Parcelamento concluído",
                &message,
            )
            .await?;
            sent += 1;
        }
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, seed_user};

    #[tokio::test]
    async fn test_summary_limits_and_commitment() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let card = create_card(&db, ana.id, "Nubank", 5_000.0, 3, 10).await.unwrap();

        add_installment(&db, ana.id, card.id, "Geladeira", 3_000.0, 10, date(2025, 1, 15))
            .await
            .unwrap();
        add_installment(&db, ana.id, card.id, "Fone", 300.0, 3, date(2024, 6, 15))
            .await
            .unwrap();

        let today = date(2025, 3, 20);
        let summaries = card_summaries(&db, ana.id, today).await.unwrap();
        let summary = &summaries[0];
        // Only the fridge is still active: 2 months elapsed, 8 left
        assert_eq!(summary.installments.len(), 1);
        assert_eq!(summary.installments[0].status.current_installment, 3);
        assert_eq!(summary.monthly_commitment, 300.0);
        assert_eq!(summary.committed, 2_400.0);
        assert_eq!(summary.available_limit, 2_600.0);
        assert_eq!(monthly_commitment(&db, ana.id, today).await.unwrap(), 300.0);
    }

    #[tokio::test]
    async fn test_page_and_report_agree_on_monthly_charge() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let card = create_card(&db, ana.id, "Nubank", 5_000.0, 3, 10).await.unwrap();
        add_installment(&db, ana.id, card.id, "TV", 600.0, 3, date(2025, 1, 15))
            .await
            .unwrap();
        let installments = card_store::list_installments(db.pool(), card.id).await.unwrap();

        for (today, charge) in [
            (date(2025, 1, 20), 200.0),
            (date(2025, 3, 10), 200.0),
            (date(2025, 4, 10), 0.0),
            (date(2025, 5, 10), 0.0),
        ] {
            let summary = &card_summaries(&db, ana.id, today).await.unwrap()[0];
            assert_eq!(summary.monthly_commitment, charge);
            assert_eq!(due_in_period(&installments, Period::of(today)), charge);
        }

        // April 10 still sits inside the third installment's window
        let april = card_summaries(&db, ana.id, date(2025, 4, 10)).await.unwrap();
        assert_eq!(april[0].installments[0].status.current_installment, 3);
    }

    #[tokio::test]
    async fn test_installment_rounding_to_zero_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let card = create_card(&db, ana.id, "Inter", 1_000.0, 1, 8).await.unwrap();

        let start = date(2025, 1, 10);
        for (total, count) in [(0.004, 1), (0.01, 3)] {
            assert!(matches!(
                add_installment(&db, ana.id, card.id, "Bala", total, count, start).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert!(card_store::list_installments(db.pool(), card.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_elapsed_equal_to_count_is_inactive() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let card = create_card(&db, ana.id, "Inter", 1_000.0, 1, 8).await.unwrap();
        add_installment(&db, ana.id, card.id, "Mesa", 600.0, 3, date(2025, 1, 10))
            .await
            .unwrap();

        let march = active_installments(&db, ana.id, card.id, date(2025, 3, 10)).await.unwrap();
        assert_eq!(march.len(), 1);
        let april = active_installments(&db, ana.id, card.id, date(2025, 4, 10)).await.unwrap();
        assert!(april.is_empty());

        // Future purchase counts as active with the first installment pending
        add_installment(&db, ana.id, card.id, "Sofá", 900.0, 3, date(2025, 9, 1))
            .await
            .unwrap();
        let active = active_installments(&db, ana.id, card.id, date(2025, 4, 10)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status.current_installment, 1);
    }

    #[tokio::test]
    async fn test_finished_purchase_announced_once() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let card = create_card(&db, ana.id, "Inter", 1_000.0, 1, 8).await.unwrap();
        add_installment(&db, ana.id, card.id, "Mesa", 600.0, 3, date(2025, 1, 10))
            .await
            .unwrap();

        assert_eq!(notify_finished(&db, ana.id, date(2025, 2, 10)).await.unwrap(), 0);
        assert_eq!(notify_finished(&db, ana.id, date(2025, 4, 10)).await.unwrap(), 1);
        assert_eq!(notify_finished(&db, ana.id, date(2025, 5, 10)).await.unwrap(), 0);
    }

    #[test]
    fn test_due_in_period_window() {
        let installment = Installment {
            id: 1,
            card_id: 1,
            description: "Mesa".to_string(),
            total_amount: 600.0,
            installment_amount: 200.0,
            total_installments: 3,
            start_date: NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
            finished_notified: false,
            created_at: NaiveDate::from_ymd_opt(2025, 11, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let list = [installment];
        assert_eq!(due_in_period(&list, Period::new(2025, 10).unwrap()), 0.0);
        assert_eq!(due_in_period(&list, Period::new(2025, 11).unwrap()), 200.0);
        assert_eq!(due_in_period(&list, Period::new(2026, 1).unwrap()), 200.0);
        assert_eq!(due_in_period(&list, Period::new(2026, 2).unwrap()), 0.0);
    }

    #[tokio::test]
    async fn test_cards_are_private() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let card = create_card(&db, ana.id, "Nubank", 5_000.0, 3, 10).await.unwrap();

        assert!(matches!(
            add_installment(&db, bia.id, card.id, "TV", 1_000.0, 2, date(2025, 1, 1)).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            create_card(&db, ana.id, "Ruim", 100.0, 0, 10).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
