//! Authentication capabilities consumed by the data layer.
//!
//! This module provides:
//! - `AuthProvider`: the "current bearer token / principal id" capability
//! - `Session`: a file-persisted session that implements it
//!
//! Acquiring tokens (login flows) is the caller's concern.

pub mod session;

pub use session::{Session, SessionData};

/// Supplies the identity used to scope cache entries and authorize calls.
pub trait AuthProvider: Send + Sync {
    /// Identity of the signed-in principal, if any.
    fn current_principal_id(&self) -> Option<String>;

    /// Bearer token for API requests, if any.
    fn auth_token(&self) -> Option<String>;
}
