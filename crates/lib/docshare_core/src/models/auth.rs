//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! types in `docshare_api::models`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role tag carried by an identity and asserted in session credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Uploads documents.
    Operation,
    /// Retrieves documents via temporary links.
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operation => "operation",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operation" => Ok(Role::Operation),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

/// Domain identity (no secret material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Identity with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct IdentityWithPassword {
    pub identity: Identity,
    pub password_hash: String,
}

/// Append-only login audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginEvent {
    pub id: i64,
    pub user_id: i64,
    pub login_time: chrono::DateTime<chrono::Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Which of the two session credentials a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in session credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — username (standard JWT `sub` claim).
    pub sub: String,
    /// Role claim. Absent on tokens minted at signup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,
    /// Access or refresh.
    pub token_type: TokenKind,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Freshly issued access + refresh credentials.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
