//! Fixtures shared by the service tests.

use chrono::{NaiveDate, NaiveDateTime};
use database::{group, Database, ExpenseKind, FamilyGroup, NewExpense, Role, User};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn now() -> NaiveDateTime {
    date(2025, 6, 1).and_hms_opt(12, 0, 0).unwrap()
}

pub async fn seed_user(db: &Database, name: &str) -> User {
    let email = format!("{}@example.com", name.to_lowercase());
    database::user::create_user(db.pool(), name, &email, "hash")
        .await
        .unwrap()
}

pub async fn seed_group(db: &Database, admin: &User, members: &[&User]) -> FamilyGroup {
    let family = group::create_group(db.pool(), "Família", admin.id).await.unwrap();
    group::add_member(db.pool(), family.id, admin.id, Role::Admin).await.unwrap();
    for member in members {
        group::add_member(db.pool(), family.id, member.id, Role::Member)
            .await
            .unwrap();
    }
    family
}

pub fn variable_expense(
    owner_id: i64,
    description: &str,
    amount: f64,
    category: &str,
) -> NewExpense {
    NewExpense {
        owner_id,
        account_id: None,
        group_id: None,
        description: description.to_string(),
        amount,
        category: category.to_string(),
        kind: ExpenseKind::Variable,
        due_day: None,
    }
}

pub fn fixed_expense(owner_id: i64, description: &str, amount: f64, due_day: i64) -> NewExpense {
    NewExpense {
        kind: ExpenseKind::Fixed,
        due_day: Some(due_day),
        ..variable_expense(owner_id, description, amount, "Moradia")
    }
}
