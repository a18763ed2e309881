//! Password hashing and cookie sessions.

use chrono::{Duration, NaiveDateTime};
use database::session as session_store;
use database::{user as user_store, validation, Database, DatabaseError, Session, User};
use rand::RngCore;
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

/// Cookie carrying the short-lived token.
pub const ACCESS_COOKIE: &str = "access_token";

/// Cookie carrying the long-lived token used to mint new access tokens.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::days(30),
        }
    }
}

/// A logged-in user resolved from cookies.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session: Session,
    /// Set when the access token was rotated and the cookie must be rewritten.
    pub new_access_token: Option<String>,
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Hash a password using bcrypt. The salt is embedded in the result.
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Verify a password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create an account.
pub async fn register(db: &Database, name: &str, email: &str, password: &str) -> Result<User> {
    validation::validate_name("Nome", name)?;
    validation::validate_email(email)?;
    validation::validate_password(password)?;

    let hash = hash_password(password)?;
    let user =
        user_store::create_user(db.pool(), name.trim(), &normalize_email(email), &hash).await?;
    info!(user_id = user.id, "User registered");
    Ok(user)
}

async fn open_session(
    db: &Database,
    user_id: i64,
    ttl: SessionTtl,
    now: NaiveDateTime,
) -> Result<Session> {
    Ok(session_store::create_session(
        db.pool(),
        user_id,
        &random_hex(32),
        &random_hex(32),
        now + ttl.access,
        now + ttl.refresh,
    )
    .await?)
}

/// Check credentials and open a session.
pub async fn login(
    db: &Database,
    email: &str,
    password: &str,
    ttl: SessionTtl,
    now: NaiveDateTime,
) -> Result<(User, Session)> {
    let user = user_store::get_user_by_email(db.pool(), &normalize_email(email))
        .await?
        .ok_or(ServiceError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash)? {
        return Err(ServiceError::InvalidCredentials);
    }

    let session = open_session(db, user.id, ttl, now).await?;
    info!(user_id = user.id, "User logged in");
    Ok((user, session))
}

/// Resolve cookies to a user.
///
/// A valid access token wins. Otherwise a valid refresh token rotates the
/// access token. Returns `None` when neither is usable.
pub async fn authenticate(
    db: &Database,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    ttl: SessionTtl,
    now: NaiveDateTime,
) -> Result<Option<Authenticated>> {
    if let Some(token) = access_token {
        if let Some(session) = session_store::get_by_access_token(db.pool(), token).await? {
            if session.access_expires_at > now {
                let user = user_store::get_user(db.pool(), session.user_id).await?;
                return Ok(Some(Authenticated {
                    user,
                    session,
                    new_access_token: None,
                }));
            }
        }
    }

    let Some(token) = refresh_token else {
        return Ok(None);
    };
    let Some(mut session) = session_store::get_by_refresh_token(db.pool(), token).await? else {
        return Ok(None);
    };
    if session.refresh_expires_at <= now {
        session_store::delete_session(db.pool(), session.id).await?;
        return Ok(None);
    }

    let access = random_hex(32);
    let expires = now + ttl.access;
    session_store::rotate_access_token(db.pool(), session.id, &access, expires).await?;
    session.access_token = access.clone();
    session.access_expires_at = expires;
    debug!(user_id = session.user_id, "Access token rotated");

    let user = match user_store::get_user(db.pool(), session.user_id).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound { .. }) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(Authenticated {
        user,
        session,
        new_access_token: Some(access),
    }))
}

/// End the session owning `access_token`, if any.
pub async fn logout(db: &Database, access_token: &str) -> Result<()> {
    if let Some(session) = session_store::get_by_access_token(db.pool(), access_token).await? {
        session_store::delete_session(db.pool(), session.id).await?;
        info!(user_id = session.user_id, "User logged out");
    }
    Ok(())
}

/// Drop sessions whose refresh token expired.
pub async fn purge_expired(db: &Database, now: NaiveDateTime) -> Result<u64> {
    Ok(session_store::delete_expired(db.pool(), now).await?)
}
