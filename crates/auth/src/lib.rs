//! `timetrack-auth`: credential issuance and per-resource permission checks.
//!
//! This crate is intentionally decoupled from HTTP and storage: stores and
//! password hashing are traits implemented elsewhere.

pub mod authenticate;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod gate;
pub mod hasher;
pub mod permissions;
pub mod principal;
pub mod store;
pub mod token;

#[cfg(test)]
mod testing;

pub use authenticate::{AuthenticationError, AuthenticationFailure, Authenticator, SignInError};
pub use authorize::{AuthorizationDecision, AuthorizationError, DenialCode, Ownership, authorize, evaluate};
pub use claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};
pub use config::{ConfigError, TokenConfig};
pub use gate::{AuthorizationGate, GateError, ResourceRef, Target};
pub use hasher::{HashError, PasswordHasher};
pub use permissions::{Action, Capability, PermissionKey, PermissionSet, ResourceKind, Scope, UnknownPermissionKey};
pub use principal::{PasswordHash, Principal, User};
pub use store::{CredentialStore, ResourceStore, StoreError};
pub use token::{TokenCodec, TokenError, TokenPair};
