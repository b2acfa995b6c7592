//! Data models for guide entities.
//!
//! - `Guide`: a travel guide with its scheduled activities
//! - `GuideActivite`, `Activite`: an activity and its place in a guide
//! - `GuideDraft`: create/update request body

pub mod guide;

pub use guide::{Activite, Guide, GuideActivite, GuideDraft};
