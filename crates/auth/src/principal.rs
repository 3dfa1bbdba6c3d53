use serde::{Deserialize, Serialize};

use timetrack_core::{Email, Entity, UserId};

use crate::{PermissionKey, PermissionSet};

/// Stored password hash (opaque to this crate).
///
/// Only a [`crate::PasswordHasher`] knows how to interpret it; `Debug` never
/// prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// User record as read from the credential store.
///
/// Registration and admin tooling create and mutate users; this crate only
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password_hash: PasswordHash,
    /// Gate on every sign-in path and on token resolution.
    pub is_active: bool,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A fully resolved acting user for authorization decisions.
///
/// Built by the gate from a live user record and its grants; the evaluator
/// needs nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: Email,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn new(user_id: UserId, email: Email, permissions: PermissionSet) -> Self {
        Self {
            user_id,
            email,
            permissions,
        }
    }

    pub fn from_user(user: &User, permissions: PermissionSet) -> Self {
        Self::new(user.id, user.email.clone(), permissions)
    }

    pub fn holds(&self, key: PermissionKey) -> bool {
        self.permissions.contains(key)
    }

    pub fn owns(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}
