//! Offline-aware data access.
//!
//! `DataAccess` picks between network, cache and pending-action queue based
//! on runtime context and connectivity. Entity services (see
//! [`crate::guides`]) supply endpoints, cache keys and optimistic cache
//! updates.

pub mod access;

pub use access::{DataAccess, Mutation, WriteOutcome};
