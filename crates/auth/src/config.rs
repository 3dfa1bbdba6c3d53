//! Token configuration.
//!
//! Loaded once at startup and handed to [`crate::TokenCodec::new`]; nothing in
//! this crate reads the environment on its own.

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

const DEV_SECRET: &str = "dev-secret";

/// Default auth token lifetime: 2 hours.
pub const DEFAULT_AUTH_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Default remember-me token lifetime: 4 weeks.
pub const DEFAULT_REMEMBER_ME_TTL_SECS: i64 = 28 * 24 * 60 * 60;

/// Upper bound for either lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Signing secret and lifetimes for both token kinds.
///
/// Deserialized configs go through the same lifetime checks as
/// [`TokenConfig::from_env`].
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawTokenConfig")]
pub struct TokenConfig {
    /// HS256 signing secret.
    pub secret: String,
    pub auth_token_ttl_secs: i64,
    pub remember_me_ttl_secs: i64,
}

#[derive(Deserialize)]
struct RawTokenConfig {
    secret: String,
    auth_token_ttl_secs: i64,
    remember_me_ttl_secs: i64,
}

impl TryFrom<RawTokenConfig> for TokenConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTokenConfig) -> Result<Self, Self::Error> {
        let config = Self {
            secret: raw.secret,
            auth_token_ttl_secs: raw.auth_token_ttl_secs,
            remember_me_ttl_secs: raw.remember_me_ttl_secs,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            auth_token_ttl_secs: DEFAULT_AUTH_TOKEN_TTL_SECS,
            remember_me_ttl_secs: DEFAULT_REMEMBER_ME_TTL_SECS,
        }
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("auth_token_ttl_secs", &self.auth_token_ttl_secs)
            .field("remember_me_ttl_secs", &self.remember_me_ttl_secs)
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn with_auth_token_ttl(mut self, ttl: Duration) -> Self {
        self.auth_token_ttl_secs = ttl.num_seconds();
        self
    }

    pub fn with_remember_me_ttl(mut self, ttl: Duration) -> Self {
        self.remember_me_ttl_secs = ttl.num_seconds();
        self
    }

    /// Lifetimes beyond what `Duration` can hold saturate; token issuance
    /// rejects them.
    pub fn auth_token_ttl(&self) -> Duration {
        saturating_seconds(self.auth_token_ttl_secs)
    }

    pub fn remember_me_ttl(&self) -> Duration {
        saturating_seconds(self.remember_me_ttl_secs)
    }

    /// Both lifetimes must lie in `1..=MAX_TOKEN_TTL_SECS`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ttl("auth_token_ttl_secs", self.auth_token_ttl_secs)?;
        check_ttl("remember_me_ttl_secs", self.remember_me_ttl_secs)?;
        Ok(())
    }

    /// Load from `JWT_SECRET`, `AUTH_TOKEN_TTL_MINUTES` and `REMEMBER_ME_TTL_DAYS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TokenConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => config.secret = secret,
            _ => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(raw) = lookup("AUTH_TOKEN_TTL_MINUTES") {
            config.auth_token_ttl_secs = parse_ttl("AUTH_TOKEN_TTL_MINUTES", &raw, 60)?;
        }

        if let Some(raw) = lookup("REMEMBER_ME_TTL_DAYS") {
            config.remember_me_ttl_secs = parse_ttl("REMEMBER_ME_TTL_DAYS", &raw, 24 * 60 * 60)?;
        }

        Ok(config)
    }
}

fn saturating_seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}

/// Parse a count of `unit_secs`-second units into seconds.
fn parse_ttl(key: &'static str, raw: &str, unit_secs: i64) -> Result<i64, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key,
        value: raw.to_string(),
    };

    let secs = raw
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|value| value.checked_mul(unit_secs))
        .ok_or_else(invalid)?;

    check_ttl(key, secs).map_err(|_| invalid())?;
    Ok(secs)
}

fn check_ttl(key: &'static str, secs: i64) -> Result<(), ConfigError> {
    if (1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
        })
    }
}
