use thiserror::Error;

use crate::PasswordHash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Password hashing capability.
///
/// Injected into the authenticator; the hash format is the implementation's
/// business.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash_password(&self, password: &str) -> Result<PasswordHash, HashError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// An unreadable stored hash is a mismatch, not an error.
    fn verify_password(&self, password: &str, hash: &PasswordHash) -> bool;
}
