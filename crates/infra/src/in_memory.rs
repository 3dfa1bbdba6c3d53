use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use timetrack_auth::{CredentialStore, PermissionKey, PermissionSet, ResourceKind, ResourceStore, StoreError, User};
use timetrack_core::{Email, Entity, ResourceId, UserId};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Email, User>,
    grants: HashMap<UserId, PermissionSet>,
    owners: HashMap<(ResourceKind, ResourceId), UserId>,
}

/// In-memory credential and resource store.
///
/// Intended for tests/dev. Implements both store contracts so one instance
/// can back the authenticator and the gate.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<State>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    /// Insert a user, replacing any user with the same email.
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.users.insert(user.email.clone(), user);
        Ok(())
    }

    pub fn remove_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let mut state = self.write()?;
        let removed = state.users.remove(email);
        if let Some(user) = &removed {
            state.grants.remove(user.id());
        }
        Ok(removed)
    }

    /// Flip the active flag. Returns `false` if no such user exists.
    pub fn set_active(&self, email: &Email, is_active: bool) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.users.get_mut(email) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn grant(&self, user_id: UserId, key: PermissionKey) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.grants.entry(user_id).or_default().insert(key);
        Ok(())
    }

    pub fn revoke(&self, user_id: UserId, key: PermissionKey) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(set) = state.grants.get_mut(&user_id) {
            *set = set.iter().filter(|k| *k != key).collect();
        }
        Ok(())
    }

    /// Record that `owner` owns the resource `(kind, id)`.
    pub fn insert_resource(&self, kind: ResourceKind, id: ResourceId, owner: UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.owners.insert((kind, id), owner);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(email).cloned())
    }

    async fn exists_user_with_email(&self, email: &Email) -> Result<bool, StoreError> {
        Ok(self.read()?.users.contains_key(email))
    }

    async fn load_permissions(&self, user_id: UserId) -> Result<PermissionSet, StoreError> {
        Ok(self.read()?.grants.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ResourceStore for InMemoryCredentialStore {
    async fn find_resource_owner(&self, kind: ResourceKind, id: ResourceId) -> Result<Option<UserId>, StoreError> {
        Ok(self.read()?.owners.get(&(kind, id)).copied())
    }
}
