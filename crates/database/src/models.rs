//! Database models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

/// A login session carried by the `access_token` / `refresh_token` cookies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: NaiveDateTime,
    pub refresh_expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// Role of a user inside a family group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Member => "Membro",
        }
    }
}

/// A family group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FamilyGroup {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
}

/// Membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub joined_at: NaiveDateTime,
}

/// Membership joined with the user's name, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MemberInfo {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: NaiveDateTime,
}

/// An invite code for joining a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupInvite {
    pub id: i64,
    pub group_id: i64,
    pub code: String,
    pub created_by: i64,
    pub expires_at: NaiveDateTime,
    pub max_uses: i64,
    pub use_count: i64,
    pub created_at: NaiveDateTime,
}

impl GroupInvite {
    /// Whether the invite is past its expiry at `now`.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }

    /// Whether every use has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.use_count >= self.max_uses
    }
}

/// Individual or joint account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Individual,
    Joint,
}

impl AccountKind {
    /// Parse form input.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "individual" => Some(AccountKind::Individual),
            "joint" | "conjunta" => Some(AccountKind::Joint),
            _ => None,
        }
    }

    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Individual => "individual",
            AccountKind::Joint => "joint",
        }
    }

    /// Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Individual => "Individual",
            AccountKind::Joint => "Conjunta",
        }
    }
}

/// A bank account, owned by a user or shared with a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub kind: AccountKind,
    pub owner_id: i64,
    pub group_id: Option<i64>,
    pub initial_balance: f64,
    pub created_at: NaiveDateTime,
}

/// Fixed (monthly, with a due day) or variable expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    Fixed,
    Variable,
}

impl ExpenseKind {
    /// Parse form input.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixed" | "fixa" => Some(ExpenseKind::Fixed),
            "variable" | "variavel" | "variável" => Some(ExpenseKind::Variable),
            _ => None,
        }
    }

    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Fixed => "fixed",
            ExpenseKind::Variable => "variable",
        }
    }

    /// Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseKind::Fixed => "Fixa",
            ExpenseKind::Variable => "Variável",
        }
    }
}

/// An expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub owner_id: i64,
    pub account_id: Option<i64>,
    pub group_id: Option<i64>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub kind: ExpenseKind,
    pub due_day: Option<i64>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// Fields for creating or updating an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub owner_id: i64,
    pub account_id: Option<i64>,
    pub group_id: Option<i64>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub kind: ExpenseKind,
    pub due_day: Option<i64>,
}

/// A payment of an expense for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExpensePayment {
    pub id: i64,
    pub expense_id: i64,
    pub month: i64,
    pub year: i64,
    pub amount: f64,
    pub paid_at: NaiveDateTime,
}

/// One participant's share of a split expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExpenseSplit {
    pub id: i64,
    pub expense_id: i64,
    pub user_id: i64,
    pub percentage: f64,
    pub amount: f64,
}

/// A recorded income with its tax computation frozen at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Income {
    pub id: i64,
    pub owner_id: i64,
    pub account_id: Option<i64>,
    pub description: String,
    pub amount_usd: f64,
    pub exchange_rate: f64,
    pub amount_brl: f64,
    pub gross_amount: f64,
    pub tax_amount: f64,
    pub net_amount: f64,
    pub effective_rate: f64,
    pub received_on: NaiveDate,
    pub created_at: NaiveDateTime,
}

/// Fields for inserting an income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncome {
    pub owner_id: i64,
    pub account_id: Option<i64>,
    pub description: String,
    pub amount_usd: f64,
    pub exchange_rate: f64,
    pub amount_brl: f64,
    pub gross_amount: f64,
    pub tax_amount: f64,
    pub net_amount: f64,
    pub effective_rate: f64,
    pub received_on: NaiveDate,
}

/// A credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CreditCard {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub credit_limit: f64,
    pub closing_day: i64,
    pub due_day: i64,
    pub created_at: NaiveDateTime,
}

/// A purchase amortized over several monthly installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Installment {
    pub id: i64,
    pub card_id: i64,
    pub description: String,
    pub total_amount: f64,
    pub installment_amount: f64,
    pub total_installments: i64,
    pub start_date: NaiveDate,
    pub finished_notified: bool,
    pub created_at: NaiveDateTime,
}

/// Income or expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Parse form input.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" | "receita" => Some(TransactionKind::Income),
            "expense" | "despesa" => Some(TransactionKind::Expense),
            _ => None,
        }
    }

    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Receita",
            TransactionKind::Expense => "Despesa",
        }
    }
}

/// A transaction that repeats on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecurringTransaction {
    pub id: i64,
    pub owner_id: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub category: String,
    /// Stored as `daily` / `weekly` / `monthly` / `yearly`.
    pub frequency: String,
    pub start_date: NaiveDate,
    pub next_run: NaiveDate,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// A monthly budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Budget {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub month: i64,
    pub year: i64,
    pub created_at: NaiveDateTime,
}

/// A spending limit for one category inside a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BudgetCategory {
    pub id: i64,
    pub budget_id: i64,
    pub category: String,
    pub limit_amount: f64,
    pub spent: f64,
    pub notified_at_80: bool,
    pub notified_at_100: bool,
}

/// A shared savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupGoal {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: Option<NaiveDate>,
    pub created_by: i64,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A ledger entry toward a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GoalContribution {
    pub id: i64,
    pub goal_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub contributed_at: NaiveDateTime,
}

/// Kind of in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sqlx(rename = "budget_80")]
    #[serde(rename = "budget_80")]
    Budget80,
    #[sqlx(rename = "budget_100")]
    #[serde(rename = "budget_100")]
    Budget100,
    #[sqlx(rename = "goal_reached")]
    GoalReached,
    #[sqlx(rename = "member_joined")]
    MemberJoined,
    #[sqlx(rename = "installment_finished")]
    InstallmentFinished,
    #[sqlx(rename = "general")]
    General,
}

impl NotificationKind {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Budget80 => "budget_80",
            NotificationKind::Budget100 => "budget_100",
            NotificationKind::GoalReached => "goal_reached",
            NotificationKind::MemberJoined => "member_joined",
            NotificationKind::InstallmentFinished => "installment_finished",
            NotificationKind::General => "general",
        }
    }
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A raw settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: NaiveDateTime,
}
