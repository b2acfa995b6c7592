use async_trait::async_trait;
use serde_json::Value;

use super::ApiError;

/// The network-call primitive consumed by the data layer.
///
/// `endpoint` is relative to the API base (for example `/guides/1/favorite`).
/// Create, update and delete correspond to POST, PUT and DELETE.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<Value, ApiError>;

    async fn create(&self, endpoint: &str, payload: Option<&Value>) -> Result<(), ApiError>;

    async fn update(&self, endpoint: &str, payload: Option<&Value>) -> Result<(), ApiError>;

    async fn delete(&self, endpoint: &str) -> Result<(), ApiError>;
}
