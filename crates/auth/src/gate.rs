//! Authorization gate: runs before each guarded use case.
//!
//! Resolves the caller from an auth token, looks up the owner of the target
//! (for anything but create), and asks the evaluator. A missing target is
//! reported as not-found, never as a denial.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use timetrack_core::{ResourceId, UserId};

use crate::authenticate::ensure_active;
use crate::{
    Action, AuthenticationError, AuthenticationFailure, AuthorizationError, CredentialStore, Principal,
    ResourceKind, ResourceStore, StoreError, TokenCodec, TokenKind, evaluate,
};

/// Reference to an existing guarded resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: ResourceId,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self { kind, id }
    }
}

/// What a use case is about to act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    /// A resource that does not exist yet (create).
    New(ResourceKind),
    /// An existing resource whose owner must be looked up.
    Existing(ResourceRef),
}

impl Target {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::New(kind) => *kind,
            Target::Existing(r) => r.kind,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthenticationError),

    #[error("{} with id {id} does not exist.", .kind.title())]
    NotFound { kind: ResourceKind, id: ResourceId },

    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates identity resolution, owner lookup and the permission check.
#[derive(Clone)]
pub struct AuthorizationGate {
    credentials: Arc<dyn CredentialStore>,
    resources: Arc<dyn ResourceStore>,
    tokens: Arc<TokenCodec>,
}

impl AuthorizationGate {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        resources: Arc<dyn ResourceStore>,
        tokens: Arc<TokenCodec>,
    ) -> Self {
        Self {
            credentials,
            resources,
            tokens,
        }
    }

    /// Resolve the acting user behind an auth token.
    ///
    /// The token only carries an email; the user is re-read on every call, so
    /// deactivating an account cuts off its outstanding tokens.
    #[instrument(skip_all)]
    pub async fn resolve_principal(&self, auth_token: &str, now: DateTime<Utc>) -> Result<Principal, GateError> {
        let Some(email) = self.tokens.try_resolve_email(auth_token, TokenKind::Auth, now) else {
            return Err(AuthenticationError::new(AuthenticationFailure::InvalidAuthToken).into());
        };

        let Some(user) = self.credentials.find_user_by_email(&email).await? else {
            tracing::info!("auth token names an unknown account");
            return Err(AuthenticationError::new(AuthenticationFailure::InvalidAuthToken).into());
        };

        ensure_active(&user)?;

        let permissions = self.credentials.load_permissions(user.id).await?;
        Ok(Principal::from_user(&user, permissions))
    }

    /// Authorize `principal` for `action` on `target`.
    ///
    /// Returns the owner of an existing target (`None` for create).
    #[instrument(skip_all, fields(user_id = %principal.user_id, %action, resource = %target.kind()))]
    pub async fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        target: Target,
    ) -> Result<Option<UserId>, GateError> {
        let owner = match target {
            Target::New(_) => None,
            Target::Existing(r) => {
                let owner = self
                    .resources
                    .find_resource_owner(r.kind, r.id)
                    .await?
                    .ok_or(GateError::NotFound { kind: r.kind, id: r.id })?;
                Some(owner)
            }
        };

        let decision = evaluate(principal, action, target.kind(), owner);
        if decision.is_allowed() {
            tracing::debug!(granted_by = ?decision.granted_by, "authorized");
        } else {
            tracing::info!(ownership = ?decision.ownership, denial = ?decision.denial, "forbidden");
        }
        decision.into_result()?;

        Ok(owner)
    }

    /// Full pipeline: resolve the caller, then authorize.
    pub async fn check(
        &self,
        auth_token: &str,
        action: Action,
        target: Target,
        now: DateTime<Utc>,
    ) -> Result<Principal, GateError> {
        let principal = self.resolve_principal(auth_token, now).await?;
        self.authorize(&principal, action, target).await?;
        Ok(principal)
    }
}
