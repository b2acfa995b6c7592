use serde_json::json;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::data::{DataAccess, Mutation, WriteOutcome};
use crate::error::Result;
use crate::models::{Guide, GuideDraft};
use crate::sync::ActionKind;

pub const GUIDES_ENDPOINT: &str = "/guides";
pub const USER_GUIDES_ENDPOINT: &str = "/guides/mes-guides";

/// Cache key of the signed-in principal's guide list.
pub const USER_GUIDES_KEY: &str = "user_guides";

pub fn guide_endpoint(id: i64) -> String {
    format!("{}/{}", GUIDES_ENDPOINT, id)
}

pub fn favorite_endpoint(id: i64) -> String {
    format!("{}/{}/favorite", GUIDES_ENDPOINT, id)
}

pub fn guide_key(id: i64) -> String {
    format!("guide_{}", id)
}

/// Guide reads and writes over [`DataAccess`].
pub struct GuideService {
    data: DataAccess,
}

impl GuideService {
    pub fn new(data: DataAccess) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    /// Guides the signed-in principal owns or was invited to.
    pub async fn user_guides(&self) -> Result<Vec<Guide>> {
        self.data
            .read_collection(USER_GUIDES_ENDPOINT, USER_GUIDES_KEY)
            .await
    }

    pub async fn guide(&self, id: i64) -> Result<Guide> {
        self.data.read_entity(&guide_endpoint(id), &guide_key(id)).await
    }

    /// Age of the cached guide list, for display.
    pub fn user_guides_age(&self) -> Option<String> {
        let owner = self.data.principal_id();
        self.data
            .cache()
            .age_display::<Vec<Guide>>(USER_GUIDES_KEY, owner.as_deref())
    }

    // ===== Writes =====

    /// Flip the favorite flag. Offline, cached copies flip immediately.
    pub async fn toggle_favorite(&self, id: i64) -> Result<WriteOutcome> {
        let mutation = Mutation::new(ActionKind::Update, favorite_endpoint(id))
            .with_payload(json!({}))
            .invalidating(guide_key(id));
        let ttl = self.data.ttl_minutes();

        self.data
            .write(mutation, move |cache, owner| {
                patch_cached(cache, owner, ttl, id, |guide| guide.favorite = !guide.favorite);
            })
            .await
    }

    /// Create a guide. The server assigns the id, so nothing is cached until it does.
    pub async fn create_guide(&self, draft: &GuideDraft) -> Result<WriteOutcome> {
        let mutation = Mutation::new(ActionKind::Create, GUIDES_ENDPOINT)
            .with_payload(serde_json::to_value(draft)?)
            .invalidating(USER_GUIDES_KEY);

        self.data.write(mutation, |_, _| {}).await
    }

    pub async fn update_guide(&self, id: i64, draft: &GuideDraft) -> Result<WriteOutcome> {
        let mutation = Mutation::new(ActionKind::Update, guide_endpoint(id))
            .with_payload(serde_json::to_value(draft)?)
            .invalidating(guide_key(id));
        let ttl = self.data.ttl_minutes();
        let draft = draft.clone();

        self.data
            .write(mutation, move |cache, owner| {
                patch_cached(cache, owner, ttl, id, |guide| guide.apply(&draft));
            })
            .await
    }

    pub async fn delete_guide(&self, id: i64) -> Result<WriteOutcome> {
        let mutation = Mutation::new(ActionKind::Delete, guide_endpoint(id))
            .invalidating(guide_key(id))
            .invalidating(USER_GUIDES_KEY);
        let ttl = self.data.ttl_minutes();

        self.data
            .write(mutation, move |cache, owner| {
                forget_cached(cache, owner, ttl, id);
            })
            .await
    }
}

// ===== Optimistic cache updates =====

/// Apply `change` to the cached guide and to its row in the cached list.
fn patch_cached<F>(cache: &CacheStore, owner: Option<&str>, ttl: i64, id: i64, change: F)
where
    F: Fn(&mut Guide),
{
    let key = guide_key(id);
    if let Some(mut guide) = cache.get::<Guide>(&key, owner) {
        change(&mut guide);
        rewrite(cache, &key, &guide, ttl, owner);
    }

    if let Some(mut guides) = cache.get::<Vec<Guide>>(USER_GUIDES_KEY, owner) {
        if let Some(guide) = guides.iter_mut().find(|g| g.id == id) {
            change(guide);
            rewrite(cache, USER_GUIDES_KEY, &guides, ttl, owner);
        }
    }
}

fn forget_cached(cache: &CacheStore, owner: Option<&str>, ttl: i64, id: i64) {
    let key = guide_key(id);
    if let Err(e) = cache.remove(&key) {
        warn!(key = %key, error = %e, "Failed to drop cached guide");
    }

    if let Some(mut guides) = cache.get::<Vec<Guide>>(USER_GUIDES_KEY, owner) {
        let before = guides.len();
        guides.retain(|g| g.id != id);
        if guides.len() != before {
            rewrite(cache, USER_GUIDES_KEY, &guides, ttl, owner);
        }
    }
}

fn rewrite<T: serde::Serialize>(cache: &CacheStore, key: &str, value: &T, ttl: i64, owner: Option<&str>) {
    match cache.set(key, value, ttl, owner) {
        Ok(()) => debug!(key, "Cached copy updated optimistically"),
        Err(e) => warn!(key, error = %e, "Failed to update cached copy"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn guide(id: i64, favorite: bool) -> Guide {
        serde_json::from_value(json!({
            "id": id,
            "titre": format!("Guide {}", id),
            "nombreJours": 2,
            "favori": favorite
        }))
        .unwrap()
    }

    fn cache() -> CacheStore {
        CacheStore::new(
            Arc::new(MemoryStore::new()),
            "test",
            Arc::new(ManualClock::default()),
        )
    }

    #[test]
    fn test_endpoints_and_keys() {
        assert_eq!(guide_endpoint(4), "/guides/4");
        assert_eq!(favorite_endpoint(4), "/guides/4/favorite");
        assert_eq!(guide_key(4), "guide_4");
    }

    #[test]
    fn test_patch_updates_entity_and_list() {
        let cache = cache();
        cache.set(&guide_key(1), &guide(1, false), 60, Some("a@x")).unwrap();
        cache
            .set(USER_GUIDES_KEY, &vec![guide(1, false), guide(2, false)], 60, Some("a@x"))
            .unwrap();

        patch_cached(&cache, Some("a@x"), 60, 1, |g| g.favorite = !g.favorite);

        assert!(cache.get::<Guide>(&guide_key(1), Some("a@x")).unwrap().favorite);
        let list = cache.get::<Vec<Guide>>(USER_GUIDES_KEY, Some("a@x")).unwrap();
        assert!(list[0].favorite);
        assert!(!list[1].favorite);
    }

    #[test]
    fn test_patch_skips_other_owner() {
        let cache = cache();
        cache.set(&guide_key(1), &guide(1, false), 60, Some("a@x")).unwrap();

        patch_cached(&cache, Some("b@x"), 60, 1, |g| g.favorite = true);

        assert!(!cache.get::<Guide>(&guide_key(1), Some("a@x")).unwrap().favorite);
    }

    #[test]
    fn test_forget_removes_everywhere() {
        let cache = cache();
        cache.set(&guide_key(2), &guide(2, false), 60, None).unwrap();
        cache
            .set(USER_GUIDES_KEY, &vec![guide(1, false), guide(2, false)], 60, None)
            .unwrap();

        forget_cached(&cache, None, 60, 2);

        assert!(cache.get::<Guide>(&guide_key(2), None).is_none());
        let ids: Vec<i64> = cache
            .get::<Vec<Guide>>(USER_GUIDES_KEY, None)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }
}
