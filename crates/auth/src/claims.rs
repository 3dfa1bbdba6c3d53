use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which of the two token classes a token belongs to.
///
/// Both kinds are structurally identical; the kind claim keeps a remember-me
/// token from being accepted where an auth token is expected and vice versa.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived bearer credential for ordinary requests.
    Auth,
    /// Long-lived credential used only to mint a fresh token pair.
    RememberMe,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Auth => f.write_str("auth"),
            TokenKind::RememberMe => f.write_str("remember_me"),
        }
    }
}

/// JWT claims carried by both token kinds.
///
/// `sub` is the only identity claim (the normalized email, resolved back to a
/// live user at use time) and `exp` the only expiry claim. `iat`, `jti` and
/// `kind` are bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: normalized email.
    pub sub: String,

    /// Expiration (unix seconds).
    pub exp: i64,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Unique token id; two tokens issued in the same second still differ.
    pub jti: Uuid,

    pub kind: TokenKind,
}

/// Why a presented token was rejected.
///
/// Internal detail: callers of [`crate::TokenCodec::try_resolve_email`] only
/// ever see "no identity".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is malformed or its signature is invalid")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("expected a {expected} token, got a {actual} token")]
    WrongKind { expected: TokenKind, actual: TokenKind },

    #[error("token subject is not a valid email")]
    InvalidSubject,
}

/// Deterministically validate the time window of decoded claims.
///
/// Expiry is inclusive: a token whose `exp` equals `now` is expired.
/// Comparison happens in whole seconds, the resolution of the claims.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();

    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
