use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthProvider;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Lifetime assumed for tokens that carry no `exp` claim.
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub principal_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claims read from the JWT payload. The signature is not verified here;
/// the server does that on every request.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    email: Option<String>,
    sub: Option<String>,
    exp: Option<i64>,
}

impl SessionData {
    /// Build session data from a bearer token, reading principal and expiry from its payload.
    pub fn from_token(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| anyhow!("Token is not a JWT"))?;
        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context("Failed to decode token payload")?;
        let claims: TokenClaims =
            serde_json::from_slice(&decoded).context("Failed to parse token claims")?;

        let principal_id = claims
            .email
            .or(claims.sub)
            .ok_or_else(|| anyhow!("Token carries no email or subject claim"))?;

        let created_at = Utc::now();
        let expires_at = claims
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
            .unwrap_or_else(|| created_at + Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES));

        Ok(Self {
            token: token.to_string(),
            principal_id,
            created_at,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

pub struct Session {
    data_dir: PathBuf,
    data: RwLock<Option<SessionData>>,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data: RwLock::new(None),
        }
    }

    /// Load session from disk
    pub fn load(&self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                debug!(principal = %data.principal_id, "Session restored");
                *self.data.write() = Some(data);
                return Ok(true);
            }
            debug!("Stored session has expired");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = *self.data.read() {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&self) -> Result<()> {
        *self.data.write() = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&self, data: SessionData) {
        *self.data.write() = Some(data);
    }

    /// Install a freshly acquired bearer token.
    pub fn set_token(&self, token: &str) -> Result<()> {
        self.update(SessionData::from_token(token)?);
        Ok(())
    }

    pub fn data(&self) -> Option<SessionData> {
        self.data.read().clone()
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data
            .read()
            .as_ref()
            .map(|d| !d.is_expired())
            .unwrap_or(false)
    }

    fn valid_data(&self) -> Option<SessionData> {
        self.data.read().clone().filter(|d| !d.is_expired())
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

impl AuthProvider for Session {
    fn current_principal_id(&self) -> Option<String> {
        self.valid_data().map(|d| d.principal_id)
    }

    fn auth_token(&self) -> Option<String> {
        self.valid_data().map(|d| d.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_from_token_reads_email_and_exp() {
        let exp = (Utc::now() + Duration::hours(2)).timestamp();
        let token = make_token(serde_json::json!({ "email": "u1@example.com", "exp": exp }));

        let data = SessionData::from_token(&token).unwrap();
        assert_eq!(data.principal_id, "u1@example.com");
        assert_eq!(data.expires_at.timestamp(), exp);
        assert!(!data.is_expired());
    }

    #[test]
    fn test_from_token_falls_back_to_subject() {
        let token = make_token(serde_json::json!({ "sub": "admin@example.com" }));
        let data = SessionData::from_token(&token).unwrap();
        assert_eq!(data.principal_id, "admin@example.com");
        assert!(data.minutes_until_expiry() > 0);
    }

    #[test]
    fn test_from_token_rejects_garbage() {
        assert!(SessionData::from_token("not-a-jwt").is_err());
        assert!(SessionData::from_token("a.!!!.c").is_err());
    }

    #[test]
    fn test_expired_session_provides_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let session = Session::new(temp_dir.path().to_path_buf());
        let exp = (Utc::now() - Duration::minutes(5)).timestamp();
        session
            .set_token(&make_token(serde_json::json!({ "email": "u1", "exp": exp })))
            .unwrap();

        assert!(!session.is_valid());
        assert_eq!(session.auth_token(), None);
        assert_eq!(session.current_principal_id(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let session = Session::new(temp_dir.path().to_path_buf());
        let token = make_token(serde_json::json!({ "email": "u1@example.com" }));
        session.set_token(&token).unwrap();
        session.save().unwrap();

        let restored = Session::new(temp_dir.path().to_path_buf());
        assert!(restored.load().unwrap());
        assert_eq!(restored.auth_token(), Some(token));
        assert_eq!(restored.current_principal_id(), Some("u1@example.com".to_string()));

        restored.clear().unwrap();
        assert!(!restored.load().unwrap());
    }
}
