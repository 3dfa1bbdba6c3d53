//! Postgres-backed credential and resource store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database (any code) | `Backend` |
//! | PoolClosed | `Backend` |
//! | Column decode failure | `Corrupt` |
//! | Other (network, TLS, timeouts) | `Backend` |
//!
//! Rows that decode but violate domain rules (an email that no longer
//! parses) are reported as `Corrupt`. Unknown permission keys in
//! `user_permissions` are skipped with a warning so that a key retired in
//! code does not lock every holder out.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use timetrack_auth::{
    CredentialStore, PasswordHash, PermissionKey, PermissionSet, ResourceKind, ResourceStore, StoreError, User,
};
use timetrack_core::{Email, ResourceId, UserId};

/// DDL for the tables this store reads.
///
/// Resource tables carry only what ownership checks need; the owning
/// application adds its own columns. `users.email` only accepts the
/// normalized form that [`Email`] produces, so lookups can compare with `=`.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE CONSTRAINT users_email_normalized CHECK (email = lower(btrim(email))),
    password_hash TEXT NOT NULL,
    is_active     BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS user_permissions (
    user_id    UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    permission TEXT NOT NULL,
    PRIMARY KEY (user_id, permission)
);

CREATE TABLE IF NOT EXISTS time_entries (
    id       UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES users (id)
);

CREATE TABLE IF NOT EXISTS categories (
    id       UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES users (id)
);

CREATE TABLE IF NOT EXISTS organizations (
    id       UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES users (id)
);
"#;

/// Postgres-backed implementation of both store contracts.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share it.
#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create the tables in [`SCHEMA`] if they do not exist yet.
    #[instrument(skip_all)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip_all, fields(email = %email))]
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: Uuid = row.try_get("id").map_err(corrupt)?;
        let stored_email: String = row.try_get("email").map_err(corrupt)?;
        let password_hash: String = row.try_get("password_hash").map_err(corrupt)?;
        let is_active: bool = row.try_get("is_active").map_err(corrupt)?;

        user_from_columns(id, &stored_email, password_hash, is_active).map(Some)
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn exists_user_with_email(&self, email: &Email) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1) AS present")
            .bind(email.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_user_with_email", e))?;

        row.try_get("present").map_err(corrupt)
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn load_permissions(&self, user_id: UserId) -> Result<PermissionSet, StoreError> {
        let rows = sqlx::query("SELECT permission FROM user_permissions WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_permissions", e))?;

        let mut raw = Vec::with_capacity(rows.len());
        for row in rows {
            raw.push(row.try_get::<String, _>("permission").map_err(corrupt)?);
        }

        Ok(permissions_from_names(user_id, raw))
    }
}

#[async_trait]
impl ResourceStore for PostgresCredentialStore {
    #[instrument(skip_all, fields(%kind, id = %id))]
    async fn find_resource_owner(&self, kind: ResourceKind, id: ResourceId) -> Result<Option<UserId>, StoreError> {
        let sql = format!("SELECT owner_id FROM {} WHERE id = $1", table_for(kind));

        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_resource_owner", e))?;

        match row {
            Some(row) => {
                let owner: Uuid = row.try_get("owner_id").map_err(corrupt)?;
                Ok(Some(UserId::from_uuid(owner)))
            }
            None => Ok(None),
        }
    }
}

fn table_for(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::TimeEntry => "time_entries",
        ResourceKind::Category => "categories",
        ResourceKind::Organization => "organizations",
    }
}

fn user_from_columns(id: Uuid, email: &str, password_hash: String, is_active: bool) -> Result<User, StoreError> {
    let email = Email::parse(email).map_err(|e| StoreError::Corrupt(format!("user {id}: {e}")))?;

    Ok(User {
        id: UserId::from_uuid(id),
        email,
        password_hash: PasswordHash::new(password_hash),
        is_active,
    })
}

fn permissions_from_names<I>(user_id: UserId, names: I) -> PermissionSet
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter_map(|name| match name.parse::<PermissionKey>() {
            Ok(key) => Some(key),
            Err(_) => {
                tracing::warn!(%user_id, permission = %name, "skipping unknown permission key");
                None
            }
        })
        .collect()
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Backend(format!(
            "database error in {operation} ({}): {}",
            db_err.code().as_deref().unwrap_or("unknown"),
            db_err.message()
        )),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => corrupt(err),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
