//! Infrastructure layer: store and password-hasher implementations.
//!
//! The auth crate only defines contracts; this crate backs them with an
//! in-memory store (tests, dev), Postgres (`sqlx`) and Argon2id.

pub mod hashing;
pub mod in_memory;
pub mod postgres;

pub use hashing::{Argon2Config, Argon2PasswordHasher};
pub use in_memory::InMemoryCredentialStore;
pub use postgres::PostgresCredentialStore;

#[cfg(test)]
mod integration_tests;
