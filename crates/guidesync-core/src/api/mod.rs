//! REST API access for the guide backend.
//!
//! This module provides the `Transport` seam consumed by the sync coordinator
//! and the data-access layer, and `ApiClient`, its reqwest implementation.
//!
//! The API uses JWT bearer token authentication; tokens come from an
//! [`AuthProvider`](crate::auth::AuthProvider).

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, StatusClass};
pub use transport::Transport;
