use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Coarse classification of a failed call, used to decide whether a cached
/// copy may stand in for the authoritative answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Unauthorized,
    Forbidden,
    NotFound,
    Other,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// JSON error body returned by the guide API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    details: Vec<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Prefer the server's `message` field; fall back to the raw body.
    fn describe_body(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(message),
                details,
            }) if details.is_empty() => message,
            Ok(ErrorBody {
                message: Some(message),
                details,
            }) => format!("{} ({})", message, details.join("; ")),
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let described = Self::describe_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(described),
            404 => ApiError::NotFound(described),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(described),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, described)),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            ApiError::Unauthorized => StatusClass::Unauthorized,
            ApiError::Forbidden(_) => StatusClass::Forbidden,
            ApiError::NotFound(_) => StatusClass::NotFound,
            _ => StatusClass::Other,
        }
    }

    /// 401, 403 and 404 answers are authoritative: the caller may not see the resource.
    pub fn is_authorization(&self) -> bool {
        self.status_class() != StatusClass::Other
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "").status_class(),
            StatusClass::Unauthorized
        );
        assert_eq!(
            ApiError::from_status(StatusCode::FORBIDDEN, "").status_class(),
            StatusClass::Forbidden
        );
        assert_eq!(
            ApiError::from_status(StatusCode::NOT_FOUND, "").status_class(),
            StatusClass::NotFound
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "").status_class(),
            StatusClass::Other
        );
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
    }

    #[test]
    fn test_from_status_uses_server_message() {
        let body = r#"{"status":403,"error":"Forbidden","message":"Guide non accessible","path":"/api/guides/5"}"#;
        let err = ApiError::from_status(StatusCode::FORBIDDEN, body);
        assert_eq!(err, ApiError::Forbidden("Guide non accessible".to_string()));
    }

    #[test]
    fn test_from_status_appends_details() {
        let body = r#"{"message":"Validation failed","details":["titre: required"]}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err.to_string(),
            "Invalid response: Status 400 Bad Request: Validation failed (titre: required)"
        );
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 510 total bytes)"));
    }
}
