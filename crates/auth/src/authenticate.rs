//! Sign-in flows: email + password, and remember-me token.
//!
//! Both flows end in a [`TokenPair`] or a typed rejection. The rejection
//! wording is part of the contract:
//!
//! - unknown email and wrong password read the same ("Invalid username or
//!   password") so the password flow gives no account-enumeration signal;
//! - an inactive account is reported as such, with its email. This does reveal
//!   that the account exists, and is intentional;
//! - any unusable remember-me token, or one naming an account that no longer
//!   exists, reads "Invalid remember me token".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use timetrack_core::Email;

use crate::{CredentialStore, PasswordHasher, StoreError, TokenCodec, TokenError, TokenKind, TokenPair, User};

/// Reason a sign-in (or token resolution) was rejected.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum AuthenticationFailure {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User is not active in system")]
    InactiveUser,

    #[error("Invalid remember me token")]
    InvalidRememberMeToken,

    #[error("Invalid auth token")]
    InvalidAuthToken,
}

/// Credential problem surfaced verbatim to the caller.
///
/// `email` is set only when a concrete account was identified (inactive
/// account); it stays `None` when the presented credential itself was
/// unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct AuthenticationError {
    reason: AuthenticationFailure,
    email: Option<Email>,
}

impl AuthenticationError {
    pub fn new(reason: AuthenticationFailure) -> Self {
        Self { reason, email: None }
    }

    pub fn for_account(reason: AuthenticationFailure, email: Email) -> Self {
        Self {
            reason,
            email: Some(email),
        }
    }

    pub fn reason(&self) -> AuthenticationFailure {
        self.reason
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }
}

impl From<AuthenticationFailure> for AuthenticationError {
    fn from(reason: AuthenticationFailure) -> Self {
        Self::new(reason)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignInError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl SignInError {
    /// The authentication rejection, if this is one.
    pub fn as_authentication(&self) -> Option<&AuthenticationError> {
        match self {
            SignInError::Authentication(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthenticationFailure> for SignInError {
    fn from(reason: AuthenticationFailure) -> Self {
        Self::Authentication(reason.into())
    }
}

/// Issues token pairs from one of the two sign-in protocols.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenCodec>,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenCodec>,
    ) -> Self {
        Self {
            credentials,
            hasher,
            tokens,
        }
    }

    /// Sign in with email and password.
    ///
    /// A remember-me token is issued only when `remember_me` is set.
    #[instrument(skip_all, fields(email = %email, remember_me = remember_me))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, SignInError> {
        // A malformed address cannot name an account; same answer as unknown.
        let Ok(email) = Email::parse(email) else {
            return Err(AuthenticationFailure::InvalidCredentials.into());
        };

        let Some(user) = self.credentials.find_user_by_email(&email).await? else {
            tracing::info!("sign-in rejected: invalid credentials");
            return Err(AuthenticationFailure::InvalidCredentials.into());
        };

        if !self.hasher.verify_password(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "sign-in rejected: invalid credentials");
            return Err(AuthenticationFailure::InvalidCredentials.into());
        }

        ensure_active(&user)?;

        let auth_token = self.tokens.issue_auth_token(&user, now)?;
        let remember_me_token = if remember_me {
            Some(self.tokens.issue_remember_me_token(&user.email, now)?)
        } else {
            None
        };

        tracing::info!(user_id = %user.id, "signed in with password");

        Ok(TokenPair {
            auth_token,
            remember_me_token,
        })
    }

    /// Exchange a remember-me token for a fresh auth token and a rotated
    /// remember-me token.
    ///
    /// The presented token is not invalidated: there is no revocation list, so
    /// it stays usable until its own expiry.
    #[instrument(skip_all)]
    pub async fn sign_in_with_remember_me_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, SignInError> {
        let Some(email) = self.tokens.try_resolve_email(token, TokenKind::RememberMe, now) else {
            tracing::info!("remember-me sign-in rejected: unusable token");
            return Err(AuthenticationFailure::InvalidRememberMeToken.into());
        };

        if !self.credentials.exists_user_with_email(&email).await? {
            tracing::info!("remember-me sign-in rejected: account no longer exists");
            return Err(AuthenticationFailure::InvalidRememberMeToken.into());
        }

        // The account may vanish between the two reads.
        let Some(user) = self.credentials.find_user_by_email(&email).await? else {
            return Err(AuthenticationFailure::InvalidRememberMeToken.into());
        };

        ensure_active(&user)?;

        let auth_token = self.tokens.issue_auth_token(&user, now)?;
        let remember_me_token = self.tokens.issue_remember_me_token(&user.email, now)?;

        tracing::info!(user_id = %user.id, "signed in with remember-me token");

        Ok(TokenPair {
            auth_token,
            remember_me_token: Some(remember_me_token),
        })
    }
}

/// Reject inactive accounts, naming the account.
pub(crate) fn ensure_active(user: &User) -> Result<(), AuthenticationError> {
    if user.is_active {
        return Ok(());
    }
    tracing::warn!(user_id = %user.id, "rejected: user is not active");
    Err(AuthenticationError::for_account(
        AuthenticationFailure::InactiveUser,
        user.email.clone(),
    ))
}
