//! Family groups, membership rules and invite codes.

use chrono::{Duration, NaiveDateTime};
use database::invite as invite_store;
use database::{
    group as group_store, validation, Database, DatabaseError, FamilyGroup, GroupInvite,
    GroupMember, MemberInfo, NotificationKind, Role,
};
use finance_core::invite_code;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{Result, ServiceError};
use crate::notifications;

/// Days an invite stays valid by default.
pub const DEFAULT_INVITE_DAYS: i64 = 7;

/// Uses an invite allows by default.
pub const DEFAULT_MAX_USES: i64 = 5;

/// Attempts at drawing an unused code before giving up.
const CODE_ATTEMPTS: usize = 5;

/// A group as seen by one of its members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDetail {
    pub group: FamilyGroup,
    pub role: Role,
    pub members: Vec<MemberInfo>,
    /// Only filled for admins.
    pub invites: Vec<GroupInvite>,
}

/// Membership of `user_id`, or `Forbidden`.
pub async fn require_member(pool: &SqlitePool, group_id: i64, user_id: i64) -> Result<GroupMember> {
    group_store::get_member(pool, group_id, user_id)
        .await?
        .ok_or(ServiceError::Forbidden)
}

/// Admin membership of `user_id`, or `Forbidden`.
pub async fn require_admin(pool: &SqlitePool, group_id: i64, user_id: i64) -> Result<GroupMember> {
    let member = require_member(pool, group_id, user_id).await?;
    if member.role != Role::Admin {
        return Err(ServiceError::Forbidden);
    }
    Ok(member)
}

/// Create a group with the creator as its first admin.
pub async fn create_group(db: &Database, user_id: i64, name: &str) -> Result<FamilyGroup> {
    validation::validate_name("Nome do grupo", name)?;

    let mut tx = db.begin().await?;
    let group = group_store::create_group(&mut *tx, name.trim(), user_id).await?;
    group_store::add_member(&mut *tx, group.id, user_id, Role::Admin).await?;
    tx.commit().await?;

    info!(user_id, group_id = group.id, "Group created");
    Ok(group)
}

pub async fn list_groups(db: &Database, user_id: i64) -> Result<Vec<FamilyGroup>> {
    Ok(group_store::list_groups_for_user(db.pool(), user_id).await?)
}

/// Group, members and (for admins) active invites.
pub async fn group_detail(
    db: &Database,
    user_id: i64,
    group_id: i64,
    now: NaiveDateTime,
) -> Result<GroupDetail> {
    let member = require_member(db.pool(), group_id, user_id).await?;
    let group = group_store::get_group(db.pool(), group_id).await?;
    let members = group_store::list_members(db.pool(), group_id).await?;
    let invites = if member.role == Role::Admin {
        active_invites(db.pool(), group_id, now).await?
    } else {
        Vec::new()
    };

    Ok(GroupDetail {
        group,
        role: member.role,
        members,
        invites,
    })
}

pub async fn rename_group(db: &Database, user_id: i64, group_id: i64, name: &str) -> Result<()> {
    validation::validate_name("Nome do grupo", name)?;
    require_admin(db.pool(), group_id, user_id).await?;
    group_store::rename_group(db.pool(), group_id, name.trim()).await?;
    Ok(())
}

/// Promote a member to admin.
pub async fn promote(db: &Database, actor_id: i64, group_id: i64, user_id: i64) -> Result<()> {
    require_admin(db.pool(), group_id, actor_id).await?;
    group_store::update_role(db.pool(), group_id, user_id, Role::Admin).await?;
    Ok(())
}

async fn ensure_not_last_admin(pool: &SqlitePool, member: &GroupMember) -> Result<()> {
    if member.role == Role::Admin && group_store::count_admins(pool, member.group_id).await? <= 1 {
        return Err(ServiceError::LastAdmin);
    }
    Ok(())
}

/// Remove another member. Admin only; the last admin cannot be removed.
pub async fn remove_member(
    db: &Database,
    actor_id: i64,
    group_id: i64,
    user_id: i64,
) -> Result<()> {
    require_admin(db.pool(), group_id, actor_id).await?;
    let target = group_store::get_member(db.pool(), group_id, user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, user_id),
        })?;
    ensure_not_last_admin(db.pool(), &target).await?;

    group_store::remove_member(db.pool(), group_id, user_id).await?;
    info!(actor_id, group_id, user_id, "Member removed");
    Ok(())
}

/// Leave a group. The last admin must promote someone first.
pub async fn leave_group(db: &Database, user_id: i64, group_id: i64) -> Result<()> {
    let member = require_member(db.pool(), group_id, user_id).await?;
    ensure_not_last_admin(db.pool(), &member).await?;
    group_store::remove_member(db.pool(), group_id, user_id).await?;
    info!(user_id, group_id, "Member left group");
    Ok(())
}

/// Issue a new invite code. Admin only.
pub async fn create_invite(
    db: &Database,
    actor_id: i64,
    group_id: i64,
    now: NaiveDateTime,
    max_uses: Option<i64>,
) -> Result<GroupInvite> {
    require_admin(db.pool(), group_id, actor_id).await?;

    let max_uses = max_uses.unwrap_or(DEFAULT_MAX_USES);
    if max_uses < 1 {
        return Err(ServiceError::invalid("O convite precisa permitir pelo menos um uso"));
    }
    let expires_at = now + Duration::days(DEFAULT_INVITE_DAYS);

    for _ in 0..CODE_ATTEMPTS {
        let code = invite_code::generate();
        let created =
            invite_store::create_invite(db.pool(), group_id, &code, actor_id, expires_at, max_uses)
                .await;
        match created {
            Ok(invite) => {
                info!(actor_id, group_id, invite_id = invite.id, "Invite created");
                return Ok(invite);
            }
            Err(DatabaseError::AlreadyExists { .. }) => {
                warn!(group_id, "Invite code collision, drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::invalid("Não foi possível gerar um código de convite"))
}

/// Invites still usable at `now`.
async fn active_invites(
    pool: &SqlitePool,
    group_id: i64,
    now: NaiveDateTime,
) -> Result<Vec<GroupInvite>> {
    Ok(invite_store::list_invites(pool, group_id)
        .await?
        .into_iter()
        .filter(|invite| !invite.is_expired(now) && !invite.is_exhausted())
        .collect())
}

pub async fn list_active_invites(
    db: &Database,
    actor_id: i64,
    group_id: i64,
    now: NaiveDateTime,
) -> Result<Vec<GroupInvite>> {
    require_admin(db.pool(), group_id, actor_id).await?;
    active_invites(db.pool(), group_id, now).await
}

/// Revoke an invite. Admin of the invite's group only. Returns the group ID.
pub async fn revoke_invite(db: &Database, actor_id: i64, invite_id: i64) -> Result<i64> {
    let invite = invite_store::get_invite(db.pool(), invite_id).await?;
    require_admin(db.pool(), invite.group_id, actor_id).await?;
    invite_store::delete_invite(db.pool(), invite_id).await?;
    info!(actor_id, group_id = invite.group_id, invite_id, "Invite revoked");
    Ok(invite.group_id)
}

/// Join a group with an invite code.
///
/// Lookup, checks, membership insert and use count increment happen in one
/// transaction, so a failed redemption never adds a member. Existing members
/// are notified after commit.
pub async fn redeem(
    db: &Database,
    code: &str,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<FamilyGroup> {
    let code = invite_code::normalize(code);
    if !invite_code::is_well_formed(&code) {
        return Err(ServiceError::InviteNotFound);
    }

    let mut tx = db.begin().await?;

    let invite = invite_store::get_by_code(&mut *tx, &code)
        .await?
        .ok_or(ServiceError::InviteNotFound)?;
    if invite.is_expired(now) {
        return Err(ServiceError::InviteExpired);
    }
    if invite.is_exhausted() {
        return Err(ServiceError::InviteExhausted);
    }
    if group_store::get_member(&mut *tx, invite.group_id, user_id).await?.is_some() {
        return Err(ServiceError::AlreadyMember);
    }

    group_store::add_member(&mut *tx, invite.group_id, user_id, Role::Member).await?;
    if !invite_store::increment_use(&mut *tx, invite.id).await? {
        return Err(ServiceError::InviteExhausted);
    }

    tx.commit().await?;

    let group = group_store::get_group(db.pool(), invite.group_id).await?;
    let user = database::user::get_user(db.pool(), user_id).await?;
    notifications::fan_out(
        db.pool(),
        group.id,
        Some(user_id),
        NotificationKind::MemberJoined,
        "Novo membro",
        &format!("{} entrou no grupo {}.", user.name, group.name),
    )
    .await?;

    info!(user_id, group_id = group.id, invite_id = invite.id, "Invite redeemed");
    Ok(group)
}
