//! Token codec: signs and verifies auth and remember-me tokens.
//!
//! Tokens are HS256 JWTs. The library only checks the signature and the
//! presence of `sub`/`exp`; the time window is checked by
//! [`validate_claims`] against the caller's clock so that expiry stays
//! inclusive and testable.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use timetrack_core::Email;

use crate::{TokenClaims, TokenConfig, TokenKind, TokenValidationError, User, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("failed to encode token: {0}")]
    Encoding(String),

    #[error("token lifetime of {ttl_secs}s is out of range")]
    Lifetime { ttl_secs: i64 },
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub auth_token: String,
    /// Present only when the caller asked to be remembered (always present on
    /// the remember-me flow, which rotates it).
    pub remember_me_token: Option<String>,
}

/// Stateless issuer/verifier for both token kinds.
///
/// Holds only the signing keys and lifetimes; share it behind an `Arc`.
pub struct TokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    auth_token_ttl: Duration,
    remember_me_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` with the caller's `now`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            header: Header::new(Algorithm::HS256),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            auth_token_ttl: config.auth_token_ttl(),
            remember_me_ttl: config.remember_me_ttl(),
        }
    }

    pub fn auth_token_ttl(&self) -> Duration {
        self.auth_token_ttl
    }

    pub fn remember_me_ttl(&self) -> Duration {
        self.remember_me_ttl
    }

    /// Issue a short-lived auth token for `user`.
    pub fn issue_auth_token(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.issue(&user.email, TokenKind::Auth, self.auth_token_ttl, now)
    }

    /// Issue a long-lived remember-me token carrying only the email.
    pub fn issue_remember_me_token(&self, email: &Email, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.issue(email, TokenKind::RememberMe, self.remember_me_ttl, now)
    }

    /// Resolve the email carried by a token of the expected kind.
    ///
    /// Returns `None` for every failure (malformed, bad signature, wrong kind,
    /// expired) without saying which.
    pub fn try_resolve_email(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Option<Email> {
        match self.verify(token, kind, now) {
            Ok(claims) => Email::parse(&claims.sub).ok(),
            Err(reason) => {
                tracing::debug!(%kind, %reason, "token rejected");
                None
            }
        }
    }

    /// Verify signature, kind, time window and subject of a token.
    pub fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenValidationError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenValidationError::Malformed)?
            .claims;

        if claims.kind != kind {
            return Err(TokenValidationError::WrongKind {
                expected: kind,
                actual: claims.kind,
            });
        }

        validate_claims(&claims, now)?;

        if Email::parse(&claims.sub).is_err() {
            return Err(TokenValidationError::InvalidSubject);
        }

        Ok(claims)
    }

    fn issue(
        &self,
        email: &Email,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        // A non-positive lifetime would mint tokens that never validate.
        let expires_at = Some(ttl)
            .filter(|ttl| *ttl > Duration::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::Lifetime {
                ttl_secs: ttl.num_seconds(),
            })?;

        let claims = TokenClaims {
            sub: email.as_str().to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7(),
            kind,
        };

        encode(&self.header, &claims, &self.encoding_key).map_err(|e| TokenError::Encoding(e.to_string()))
    }
}
