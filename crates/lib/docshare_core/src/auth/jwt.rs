//! Session credential issuance and verification (JWT, HMAC family).
//!
//! Tokens are stateless: validity is decided by signature and embedded expiry
//! alone, so there is no revocation before `exp`.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::models::auth::{Role, TokenClaims, TokenKind, TokenPair};

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

/// Caller-supplied part of the claims: who the token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub username: String,
    pub role: Option<Role>,
}

impl SessionSubject {
    pub fn new(username: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

/// Mints and verifies signed session credentials.
///
/// Built once at startup from the signing key and held read-only in
/// application state.
#[derive(Clone)]
pub struct CredentialIssuer {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialIssuer {
    /// Create an issuer for an HMAC algorithm (`HS256`, `HS384`, `HS512`).
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, AuthError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::ValidationError(format!(
                "unsupported signing algorithm {algorithm:?}; expected HS256, HS384 or HS512"
            )));
        }
        if secret.is_empty() {
            return Err(AuthError::ValidationError("signing key is empty".into()));
        }
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
        })
    }

    /// Create an issuer from an algorithm name such as `"HS256"`.
    pub fn from_algorithm_name(secret: &[u8], algorithm: &str) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(algorithm).map_err(|_| {
            AuthError::ValidationError(format!("unknown signing algorithm '{algorithm}'"))
        })?;
        Self::new(secret, algorithm)
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Sign an access token valid for `ttl` from now.
    pub fn issue_access_token(
        &self,
        subject: &SessionSubject,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        self.sign(subject, TokenKind::Access, ttl)
    }

    /// Sign a refresh token with the configured refresh lifetime.
    pub fn issue_refresh_token(&self, subject: &SessionSubject) -> Result<String, AuthError> {
        self.sign(subject, TokenKind::Refresh, self.refresh_ttl)
    }

    /// Issue an access + refresh pair. The two are not bound to each other.
    pub fn issue_pair(&self, subject: &SessionSubject) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(subject, self.access_ttl)?,
            refresh_token: self.issue_refresh_token(subject)?,
        })
    }

    /// Verify signature and expiry against the wall clock (no leeway).
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                _ => AuthError::InvalidCredential,
            })
    }

    /// Verify a token and require it to be of the given kind.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims = self.verify_token(token)?;
        if claims.token_type != kind {
            return Err(AuthError::InvalidCredential);
        }
        Ok(claims)
    }

    fn sign(
        &self,
        subject: &SessionSubject,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: subject.username.clone(),
            user_type: subject.role,
            token_type: kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }
}
