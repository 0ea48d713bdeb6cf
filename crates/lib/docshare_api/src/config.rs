//! API server configuration.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docshare_core::auth::jwt::{
    CredentialIssuer, DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_REFRESH_TOKEN_DAYS,
};
use docshare_core::storage::{
    DEFAULT_KEY_PREFIX, DEFAULT_LINK_TTL_SECS, ObjectStore, S3Settings, StorageResolver,
};
use thiserror::Error;

/// Default upload body limit: 50 MiB.
///
/// Uploads are buffered in memory before the object store write, so this is
/// also the per-request memory bound for `/upload`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Largest accepted `MAX_UPLOAD_BYTES`: the S3 single-PUT object limit (5 GiB).
pub const MAX_UPLOAD_LIMIT_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Longest presigned link S3 accepts: one week.
pub const MAX_LINK_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Startup configuration errors. Any of these is fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// JWT algorithm name (HMAC family).
    pub jwt_algorithm: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// Object store connection.
    pub s3: S3Settings,
    /// Key namespace for uploaded objects.
    pub key_prefix: String,
    pub download_url_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("s3", &self.s3)
            .field("key_prefix", &self.key_prefix)
            .field("download_url_ttl_secs", &self.download_url_ttl_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                      | Default         |
    /// |-------------------------------|-----------------|
    /// | `DATABASE_URL`                | required        |
    /// | `SECRET_KEY`                  | required        |
    /// | `ALGORITHM`                   | `HS256`         |
    /// | `AWS_ACCESS_KEY_ID`           | required        |
    /// | `AWS_SECRET_ACCESS_KEY`       | required        |
    /// | `AWS_REGION`                  | required        |
    /// | `S3_BUCKET_NAME`              | required        |
    /// | `S3_ENDPOINT`                 | AWS default     |
    /// | `S3_KEY_PREFIX`               | `documents/`    |
    /// | `BIND_ADDR`                   | `0.0.0.0:8000`  |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES` | `30`            |
    /// | `REFRESH_TOKEN_EXPIRE_DAYS`   | `7`             |
    /// | `DOWNLOAD_URL_TTL_SECS`       | `3600`          |
    /// | `MAX_UPLOAD_BYTES`            | `52428800`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let endpoint = get("S3_ENDPOINT");
        if let Some(endpoint) = &endpoint {
            url::Url::parse(endpoint).map_err(|e| ConfigError::Invalid {
                name: "S3_ENDPOINT",
                reason: e.to_string(),
            })?;
        }

        let config = Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            pg_connection_url: required("DATABASE_URL")?,
            jwt_secret: required("SECRET_KEY")?,
            jwt_algorithm: get("ALGORITHM").unwrap_or_else(|| "HS256".into()),
            access_token_minutes: parse_or(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                get("ACCESS_TOKEN_EXPIRE_MINUTES"),
                DEFAULT_ACCESS_TOKEN_MINUTES,
            )?,
            refresh_token_days: parse_or(
                "REFRESH_TOKEN_EXPIRE_DAYS",
                get("REFRESH_TOKEN_EXPIRE_DAYS"),
                DEFAULT_REFRESH_TOKEN_DAYS,
            )?,
            s3: S3Settings {
                access_key_id: required("AWS_ACCESS_KEY_ID")?,
                secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
                region: required("AWS_REGION")?,
                bucket: required("S3_BUCKET_NAME")?,
                endpoint,
            },
            key_prefix: get("S3_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.into()),
            download_url_ttl_secs: parse_or(
                "DOWNLOAD_URL_TTL_SECS",
                get("DOWNLOAD_URL_TTL_SECS"),
                DEFAULT_LINK_TTL_SECS,
            )?,
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
        };

        ensure_range(
            "DOWNLOAD_URL_TTL_SECS",
            config.download_url_ttl_secs,
            1,
            MAX_LINK_TTL_SECS,
        )?;
        ensure_range(
            "MAX_UPLOAD_BYTES",
            config.max_upload_bytes as u64,
            1,
            MAX_UPLOAD_LIMIT_BYTES,
        )?;

        // Surface a bad algorithm or lifetime at startup rather than on first login.
        config.credential_issuer()?;
        Ok(config)
    }

    /// Build the credential issuer from the signing settings.
    pub fn credential_issuer(&self) -> Result<CredentialIssuer, ConfigError> {
        let issuer =
            CredentialIssuer::from_algorithm_name(self.jwt_secret.as_bytes(), &self.jwt_algorithm)
                .map_err(|e| ConfigError::Invalid {
                    name: "ALGORITHM",
                    reason: e.to_string(),
                })?;
        let access_ttl = positive_ttl(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            self.access_token_minutes,
            chrono::Duration::try_minutes,
        )?;
        let refresh_ttl = positive_ttl(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            self.refresh_token_days,
            chrono::Duration::try_days,
        )?;
        Ok(issuer
            .with_access_ttl(access_ttl)
            .with_refresh_ttl(refresh_ttl))
    }

    /// Wrap an object store with this configuration's key layout and link TTL.
    pub fn storage_resolver(&self, store: Arc<dyn ObjectStore>) -> StorageResolver {
        StorageResolver::new(store)
            .with_prefix(self.key_prefix.clone())
            .with_link_ttl(Duration::from_secs(self.download_url_ttl_secs))
    }
}

fn ensure_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("{value} is outside {min}..={max}"),
        })
    }
}

fn positive_ttl(
    name: &'static str,
    value: i64,
    to_duration: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{value} must be greater than zero"),
        });
    }
    to_duration(value).ok_or_else(|| ConfigError::Invalid {
        name,
        reason: format!("{value} is out of range"),
    })
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
