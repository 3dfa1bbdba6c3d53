//! Integration tests for the full sign-in and authorization pipeline.
//!
//! Tests: Argon2 hasher + InMemoryCredentialStore → Authenticator → TokenCodec → AuthorizationGate
//!
//! Verifies:
//! - Password and remember-me sign-in against real hashes
//! - Tokens issued at sign-in drive the gate
//! - Deactivation and ownership rules hold end to end

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use timetrack_auth::{
        Action, AuthenticationFailure, Authenticator, AuthorizationGate, GateError, PasswordHasher, PermissionKey,
        ResourceKind, ResourceRef, SignInError, Target, TokenCodec, TokenConfig, User,
    };
    use timetrack_core::{Email, ResourceId, UserId};

    use crate::{Argon2Config, Argon2PasswordHasher, InMemoryCredentialStore};

    struct App {
        store: Arc<InMemoryCredentialStore>,
        hasher: Arc<Argon2PasswordHasher>,
        authenticator: Authenticator,
        gate: AuthorizationGate,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap()
    }

    fn setup() -> App {
        timetrack_observability::init_for_tests();

        let store = Arc::new(InMemoryCredentialStore::new());
        let hasher = Arc::new(
            Argon2PasswordHasher::new(Argon2Config {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .unwrap(),
        );
        let tokens = Arc::new(TokenCodec::new(
            &TokenConfig::new("integration-secret")
                .with_auth_token_ttl(Duration::hours(2))
                .with_remember_me_ttl(Duration::days(28)),
        ));

        let authenticator = Authenticator::new(store.clone(), hasher.clone(), tokens.clone());
        let gate = AuthorizationGate::new(store.clone(), store.clone(), tokens);

        App {
            store,
            hasher,
            authenticator,
            gate,
        }
    }

    impl App {
        fn register(&self, email: &str, password: &str, keys: &[PermissionKey]) -> User {
            let user = User {
                id: UserId::new(),
                email: Email::parse(email).unwrap(),
                password_hash: self.hasher.hash_password(password).unwrap(),
                is_active: true,
            };
            self.store.insert_user(user.clone()).unwrap();
            for key in keys {
                self.store.grant(user.id, *key).unwrap();
            }
            user
        }

        fn time_entry_of(&self, owner: &User) -> Target {
            let id = ResourceId::new();
            self.store.insert_resource(ResourceKind::TimeEntry, id, owner.id).unwrap();
            Target::Existing(ResourceRef::new(ResourceKind::TimeEntry, id))
        }
    }

    fn failure(err: &SignInError) -> AuthenticationFailure {
        err.as_authentication()
            .map(|e| e.reason())
            .unwrap_or_else(|| panic!("expected authentication failure, got {err:?}"))
    }

    #[tokio::test]
    async fn own_only_user_deletes_own_entry_but_not_a_colleagues() {
        let app = setup();
        let alice = app.register("a@x.com", "alice-pw", &[PermissionKey::CanEditOwnTimeEntry]);
        let bob = app.register("b@x.com", "bob-pw", &[]);

        let tokens = app.authenticator.sign_in("a@x.com", "alice-pw", false, t0()).await.unwrap();
        assert!(tokens.remember_me_token.is_none());

        let now = t0() + Duration::minutes(5);
        let principal = app
            .gate
            .check(&tokens.auth_token, Action::Delete, app.time_entry_of(&alice), now)
            .await
            .unwrap();
        assert_eq!(principal.user_id, alice.id);

        let err = app
            .gate
            .check(&tokens.auth_token, Action::Delete, app.time_entry_of(&bob), now)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Forbidden(_)));
        assert_eq!(
            err.to_string(),
            "User does not have permission to edit other users' time entries."
        );
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = setup();
        app.register("a@x.com", "alice-pw", &[]);

        let wrong_password = app.authenticator.sign_in("a@x.com", "nope", false, t0()).await.unwrap_err();
        let unknown = app.authenticator.sign_in("z@x.com", "alice-pw", false, t0()).await.unwrap_err();

        assert_eq!(wrong_password, unknown);
        assert_eq!(wrong_password.to_string(), "Invalid username or password");
    }

    #[tokio::test]
    async fn remember_me_rotates_and_keeps_working_for_weeks() {
        let app = setup();
        let alice = app.register("a@x.com", "alice-pw", &[PermissionKey::CanCreateTimeEntry]);

        let first = app.authenticator.sign_in("a@x.com", "alice-pw", true, t0()).await.unwrap();
        let remember = first.remember_me_token.unwrap();

        // The auth token is long dead; the remember-me token is not.
        let later = t0() + Duration::days(20);
        assert!(app.gate.resolve_principal(&first.auth_token, later).await.is_err());

        let second = app.authenticator.sign_in_with_remember_me_token(&remember, later).await.unwrap();
        let rotated = second.remember_me_token.clone().unwrap();
        assert_ne!(rotated, remember);

        let principal = app
            .gate
            .check(
                &second.auth_token,
                Action::Create,
                Target::New(ResourceKind::TimeEntry),
                later,
            )
            .await
            .unwrap();
        assert_eq!(principal.user_id, alice.id);

        // No revocation: the presented token still works until it expires.
        assert!(app.authenticator.sign_in_with_remember_me_token(&remember, later).await.is_ok());
        let err = app
            .authenticator
            .sign_in_with_remember_me_token(&remember, t0() + Duration::days(28))
            .await
            .unwrap_err();
        assert_eq!(failure(&err), AuthenticationFailure::InvalidRememberMeToken);
    }

    #[tokio::test]
    async fn deactivation_blocks_every_path() {
        let app = setup();
        let alice = app.register("a@x.com", "alice-pw", &[PermissionKey::CanEditAnyTimeEntry]);
        let tokens = app.authenticator.sign_in("a@x.com", "alice-pw", true, t0()).await.unwrap();

        app.store.set_active(&alice.email, false).unwrap();

        let err = app.authenticator.sign_in("a@x.com", "alice-pw", false, t0()).await.unwrap_err();
        assert_eq!(failure(&err), AuthenticationFailure::InactiveUser);

        let err = app
            .authenticator
            .sign_in_with_remember_me_token(tokens.remember_me_token.as_deref().unwrap(), t0())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User is not active in system");

        let err = app
            .gate
            .check(&tokens.auth_token, Action::Update, app.time_entry_of(&alice), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn missing_entry_is_reported_before_permissions() {
        let app = setup();
        app.register("a@x.com", "alice-pw", &[]);
        let tokens = app.authenticator.sign_in("a@x.com", "alice-pw", false, t0()).await.unwrap();

        let id = ResourceId::new();
        let err = app
            .gate
            .check(
                &tokens.auth_token,
                Action::View,
                Target::Existing(ResourceRef::new(ResourceKind::TimeEntry, id)),
                t0(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GateError::NotFound {
                kind: ResourceKind::TimeEntry,
                id
            }
        );
    }
}
