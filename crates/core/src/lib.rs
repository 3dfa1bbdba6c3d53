//! `timetrack-core`: shared primitives for the time-tracking auth core.
//!
//! This crate contains **pure** value types (no storage, no transport).

pub mod email;
pub mod entity;
pub mod error;
pub mod id;

pub use email::Email;
pub use entity::Entity;
pub use error::DomainError;
pub use id::{ResourceId, UserId};
