//! Individual and joint accounts.

use database::account as account_store;
use database::{validation, Account, AccountKind, Database};
use finance_core::money::round2;
use sqlx::SqlitePool;

use crate::error::{Result, ServiceError};
use crate::groups;

/// Whether `user_id` may see the account: its owner, or any member of the
/// group of a joint account.
pub async fn can_access(pool: &SqlitePool, user_id: i64, account: &Account) -> Result<bool> {
    if account.owner_id == user_id {
        return Ok(true);
    }
    match (account.kind, account.group_id) {
        (AccountKind::Joint, Some(group_id)) => {
            Ok(database::group::get_member(pool, group_id, user_id).await?.is_some())
        }
        _ => Ok(false),
    }
}

/// Fetch an account the user can see.
pub async fn require_access(pool: &SqlitePool, user_id: i64, account_id: i64) -> Result<Account> {
    let account = account_store::get_account(pool, account_id).await?;
    if !can_access(pool, user_id, &account).await? {
        return Err(ServiceError::Forbidden);
    }
    Ok(account)
}

/// Create an account. Joint accounts need a group the owner belongs to;
/// individual accounts never carry one.
pub async fn create_account(
    db: &Database,
    owner_id: i64,
    name: &str,
    kind: AccountKind,
    group_id: Option<i64>,
    initial_balance: f64,
) -> Result<Account> {
    validation::validate_name("Nome da conta", name)?;

    let group_id = match kind {
        AccountKind::Individual => None,
        AccountKind::Joint => {
            let group_id = group_id
                .ok_or_else(|| ServiceError::invalid("Conta conjunta precisa de um grupo"))?;
            groups::require_member(db.pool(), group_id, owner_id).await?;
            Some(group_id)
        }
    };

    Ok(account_store::create_account(
        db.pool(),
        name.trim(),
        kind,
        owner_id,
        group_id,
        round2(initial_balance),
    )
    .await?)
}

pub async fn list_accessible(db: &Database, user_id: i64) -> Result<Vec<Account>> {
    Ok(account_store::list_accessible(db.pool(), user_id).await?)
}

/// Rename or rebalance. Owner only.
pub async fn update_account(
    db: &Database,
    user_id: i64,
    account_id: i64,
    name: &str,
    initial_balance: f64,
) -> Result<Account> {
    validation::validate_name("Nome da conta", name)?;
    let account = account_store::get_account(db.pool(), account_id).await?;
    if account.owner_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    account_store::update_account(db.pool(), account_id, name.trim(), round2(initial_balance))
        .await?;
    Ok(account_store::get_account(db.pool(), account_id).await?)
}

pub async fn delete_account(db: &Database, user_id: i64, account_id: i64) -> Result<()> {
    let account = account_store::get_account(db.pool(), account_id).await?;
    if account.owner_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    account_store::delete_account(db.pool(), account_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_group, seed_user};

    #[tokio::test]
    async fn test_joint_account_visible_to_members() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let stranger = seed_user(&db, "Zé").await;
        let family = seed_group(&db, &ana, &[&bia]).await;

        let joint = create_account(&db, ana.id, "Casa", AccountKind::Joint, Some(family.id), 500.0)
            .await
            .unwrap();
        let individual = AccountKind::Individual;
        let personal = create_account(&db, ana.id, "Pessoal", individual, Some(family.id), 0.0)
            .await
            .unwrap();
        assert_eq!(personal.group_id, None);

        assert!(require_access(db.pool(), bia.id, joint.id).await.is_ok());
        assert!(matches!(
            require_access(db.pool(), bia.id, personal.id).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            require_access(db.pool(), stranger.id, joint.id).await,
            Err(ServiceError::Forbidden)
        ));

        // Members can see but not edit
        assert!(matches!(
            update_account(&db, bia.id, joint.id, "Nossa", 0.0).await,
            Err(ServiceError::Forbidden)
        ));
        assert_eq!(list_accessible(&db, bia.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_joint_account_requires_membership() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;
        let family = seed_group(&db, &ana, &[]).await;

        assert!(matches!(
            create_account(&db, bia.id, "Casa", AccountKind::Joint, Some(family.id), 0.0).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            create_account(&db, ana.id, "Casa", AccountKind::Joint, None, 0.0).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
