//! Identity registry queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::{Identity, IdentityWithPassword, LoginEvent, Role};

type IdentityRow = (
    i64,
    String,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

const IDENTITY_COLUMNS: &str =
    "id, username, email, password_hash, user_type, is_active, created_at, updated_at";

fn parse_role(raw: &str) -> Result<Role, AuthError> {
    raw.parse().map_err(AuthError::Internal)
}

fn identity_from_row(row: IdentityRow) -> Result<IdentityWithPassword, AuthError> {
    let (id, username, email, password_hash, user_type, is_active, created_at, updated_at) = row;
    Ok(IdentityWithPassword {
        identity: Identity {
            id,
            username,
            email,
            role: parse_role(&user_type)?,
            is_active,
            created_at,
            updated_at,
        },
        password_hash,
    })
}

/// Fetch an identity (with password hash) by exact username.
pub async fn find_identity_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<IdentityWithPassword>, AuthError> {
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE username = $1");
    let row = sqlx::query_as::<_, IdentityRow>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(identity_from_row).transpose()
}

/// Check whether a username is already registered.
pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, AuthError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM identities WHERE username = $1)",
    )
    .bind(username)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Create a new identity.
///
/// Uniqueness of username and email is enforced by unique indexes; a
/// violation (including one lost to a concurrent signup) maps to
/// [`AuthError::DuplicateIdentity`].
pub async fn create_identity(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<Identity, AuthError> {
    let sql = format!(
        "INSERT INTO identities (username, email, password_hash, user_type) \
         VALUES ($1, $2, $3, $4) RETURNING {IDENTITY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, IdentityRow>(&sql)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = match db.constraint() {
                    Some("identities_email_key") => "email",
                    _ => "username",
                };
                AuthError::DuplicateIdentity(field.to_string())
            }
            other => AuthError::DbError(other),
        })?;
    Ok(identity_from_row(row)?.identity)
}

/// Append a login event for a successful login.
pub async fn record_login(
    pool: &PgPool,
    user_id: i64,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
) -> Result<LoginEvent, AuthError> {
    let (id, login_time) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        "INSERT INTO login_history (user_id, user_agent, ip_address) \
         VALUES ($1, $2, $3) RETURNING id, login_time",
    )
    .bind(user_id)
    .bind(user_agent)
    .bind(ip_address)
    .fetch_one(pool)
    .await?;
    Ok(LoginEvent {
        id,
        user_id,
        login_time,
        user_agent: user_agent.map(str::to_string),
        ip_address: ip_address.map(str::to_string),
    })
}
