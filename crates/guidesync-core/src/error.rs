//! Error taxonomy for the offline data layer.
//!
//! `ApiError` (in [`crate::api`]) describes a single transport failure.
//! `GuideError` is what callers of the data layer observe: it classifies
//! failures by how they propagate (surfaced, absorbed by cache fallback,
//! or absorbed by the pending-action queue).

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum GuideError {
    #[error("No data available offline")]
    OfflineNoCache,

    #[error("Access denied: {0}")]
    AuthorizationDenied(#[source] ApiError),

    #[error("Network failure: {0}")]
    NetworkFailure(#[source] ApiError),

    #[error("Sync of {kind} {endpoint} failed: {reason}")]
    SyncActionFailed {
        kind: String,
        endpoint: String,
        reason: String,
    },

    #[error("Sync of {kind} {endpoint} abandoned after {age_hours}h: {reason}")]
    SyncActionExpired {
        kind: String,
        endpoint: String,
        age_hours: i64,
        reason: String,
    },

    #[error("Cannot sync: no network connection")]
    SyncOffline,

    #[error("Not available in a non-interactive context")]
    NonInteractive,

    #[error("Cache TTL out of range: {0} minutes")]
    InvalidTtl(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuideError {
    /// Whether this failure must reach the caller even when cached data exists.
    pub fn is_authorization(&self) -> bool {
        matches!(self, GuideError::AuthorizationDenied(_))
    }
}

impl From<ApiError> for GuideError {
    fn from(err: ApiError) -> Self {
        if err.is_authorization() {
            GuideError::AuthorizationDenied(err)
        } else {
            GuideError::NetworkFailure(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, GuideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_maps_to_authorization_denied() {
        let err: GuideError = ApiError::Forbidden("not invited".to_string()).into();
        assert!(err.is_authorization());
        assert_eq!(err.to_string(), "Access denied: Forbidden: not invited");
    }

    #[test]
    fn test_server_error_maps_to_network_failure() {
        let err: GuideError = ApiError::ServerError("boom".to_string()).into();
        assert!(matches!(err, GuideError::NetworkFailure(_)));
        assert!(!err.is_authorization());
    }
}
