//! Guide entity access.
//!
//! Endpoints, cache keys and optimistic cache updates for guides, on top of
//! [`crate::data::DataAccess`].

pub mod service;

pub use service::{
    favorite_endpoint, guide_endpoint, guide_key, GuideService, GUIDES_ENDPOINT,
    USER_GUIDES_ENDPOINT, USER_GUIDES_KEY,
};
