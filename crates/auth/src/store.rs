//! Contracts of the credential and resource stores.
//!
//! Both are consumed, not implemented, by this crate. Calls may suspend on
//! network or disk I/O; retries and timeouts belong to the implementation.

use async_trait::async_trait;
use thiserror::Error;

use timetrack_core::{Email, ResourceId, UserId};

use crate::{PermissionSet, ResourceKind, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Read access to users and their permission grants.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by normalized email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    async fn exists_user_with_email(&self, email: &Email) -> Result<bool, StoreError>;

    /// Permission keys granted to a user (empty if none).
    async fn load_permissions(&self, user_id: UserId) -> Result<PermissionSet, StoreError>;
}

/// Owner lookup for guarded resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Owning user of a resource, or `None` if the resource does not exist.
    async fn find_resource_owner(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> Result<Option<UserId>, StoreError>;
}
