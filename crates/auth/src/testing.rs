//! Test doubles for the store and hasher contracts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;

use timetrack_core::{Email, ResourceId, UserId};

use crate::{
    CredentialStore, HashError, PasswordHash, PasswordHasher, PermissionKey, PermissionSet, ResourceKind,
    ResourceStore, StoreError, TokenCodec, TokenConfig, User,
};

pub(crate) fn codec() -> TokenCodec {
    TokenCodec::new(
        &TokenConfig::new("unit-test-secret")
            .with_auth_token_ttl(Duration::hours(1))
            .with_remember_me_ttl(Duration::days(30)),
    )
}

/// Stores the password as-is behind a prefix.
pub(crate) struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash_password(&self, password: &str) -> Result<PasswordHash, HashError> {
        Ok(PasswordHash::new(format!("plain:{password}")))
    }

    fn verify_password(&self, password: &str, hash: &PasswordHash) -> bool {
        hash.as_str().strip_prefix("plain:") == Some(password)
    }
}

#[derive(Default)]
struct State {
    users: HashMap<Email, User>,
    grants: HashMap<UserId, PermissionSet>,
    resources: HashMap<(ResourceKind, ResourceId), UserId>,
    failure: Option<String>,
}

#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub(crate) fn add_user(&self, email: &str, password: &str, is_active: bool) -> User {
        let user = User {
            id: UserId::new(),
            email: Email::parse(email).unwrap(),
            password_hash: PlainHasher.hash_password(password).unwrap(),
            is_active,
        };
        let mut state = self.state.lock().unwrap();
        state.users.insert(user.email.clone(), user.clone());
        user
    }

    pub(crate) fn remove_user(&self, email: &str) {
        let email = Email::parse(email).unwrap();
        self.state.lock().unwrap().users.remove(&email);
    }

    pub(crate) fn set_active(&self, email: &str, is_active: bool) {
        let email = Email::parse(email).unwrap();
        if let Some(user) = self.state.lock().unwrap().users.get_mut(&email) {
            user.is_active = is_active;
        }
    }

    pub(crate) fn grant(&self, user_id: UserId, key: PermissionKey) {
        self.state
            .lock()
            .unwrap()
            .grants
            .entry(user_id)
            .or_default()
            .insert(key);
    }

    pub(crate) fn add_resource(&self, kind: ResourceKind, owner: UserId) -> ResourceId {
        let id = ResourceId::new();
        self.state.lock().unwrap().resources.insert((kind, id), owner);
        id
    }

    pub(crate) fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    fn check(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        let state = self.state.lock().unwrap();
        if let Some(message) = state.failure.clone() {
            return Err(StoreError::Backend(message));
        }
        Ok(state)
    }
}

#[async_trait]
impl CredentialStore for FakeStore {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.check()?.users.get(email).cloned())
    }

    async fn exists_user_with_email(&self, email: &Email) -> Result<bool, StoreError> {
        Ok(self.check()?.users.contains_key(email))
    }

    async fn load_permissions(&self, user_id: UserId) -> Result<PermissionSet, StoreError> {
        Ok(self.check()?.grants.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn find_resource_owner(&self, kind: ResourceKind, id: ResourceId) -> Result<Option<UserId>, StoreError> {
        Ok(self.check()?.resources.get(&(kind, id)).copied())
    }
}
