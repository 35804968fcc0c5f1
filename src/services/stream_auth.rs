use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use super::ServiceError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerClaims {
    pub server: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// API key/secret pair shared by the Stream video and chat clients.
#[derive(Clone)]
pub struct StreamCredentials {
    api_key: String,
    api_secret: String,
}

impl StreamCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Token for server-to-server REST calls.
    pub fn server_token(&self) -> Result<String, ServiceError> {
        let token = encode(
            &Header::default(),
            &ServerClaims { server: true },
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Short-lived token that lets a connection act as `user_id`.
    pub fn user_token(&self, user_id: &str, ttl: Duration) -> Result<String, ServiceError> {
        // Backdated a minute to tolerate clock skew on the platform side.
        let issued_at = Utc::now() - Duration::minutes(1);
        let claims = UserClaims {
            user_id: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;
        Ok(token)
    }
}

impl std::fmt::Debug for StreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCredentials")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}
