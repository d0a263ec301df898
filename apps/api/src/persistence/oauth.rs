//! Google OAuth authorization-code flow for the Drive integration.

use async_trait::async_trait;
use redis::AsyncCommands;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// How long a consent round trip may take before its state nonce expires.
pub const STATE_TTL_SECS: u64 = 600;
const STATE_KEY_PREFIX: &str = "oauth_state:";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google refused the code or refresh token (`invalid_grant` and friends).
    #[error("grant rejected: {0}")]
    Rejected(String),

    #[error("token endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid authorization URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError>;
}

/// Short-lived mapping from OAuth `state` nonce to the user who started consent.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn issue(&self, state: &str, user_id: &str) -> anyhow::Result<()>;
    /// Returns the user once; later calls with the same state return `None`.
    async fn consume(&self, state: &str) -> anyhow::Result<Option<String>>;
}

// ────────────────────────────────────────────────────────────────────────────
// Google
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Result<Self, OAuthError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, OAuthError> {
        let response = self.client.post(GOOGLE_TOKEN_URL).form(params).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Google token endpoint returned {}: {}", status, body);
        match serde_json::from_str::<TokenErrorBody>(&body) {
            Ok(err) if status.as_u16() == 400 || status.as_u16() == 401 => Err(OAuthError::Rejected(
                err.error_description.unwrap_or(err.error),
            )),
            _ => Err(OAuthError::Api {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        build_authorization_url(&self.client_id, &self.redirect_uri, state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ])
        .await
    }
}

/// Offline access with forced consent so Google issues a refresh token.
fn build_authorization_url(client_id: &str, redirect_uri: &str, state: &str) -> Result<String, OAuthError> {
    let params = [
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", DRIVE_FILE_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", state),
    ];
    Url::parse_with_params(GOOGLE_AUTH_URL, &params)
        .map(String::from)
        .map_err(|e| OAuthError::InvalidUrl(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Redis state store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisStateStore {
    client: redis::Client,
}

impl RedisStateStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuthStateStore for RedisStateStore {
    async fn issue(&self, state: &str, user_id: &str) -> anyhow::Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.set_ex::<_, _, ()>(format!("{STATE_KEY_PREFIX}{state}"), user_id, STATE_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn consume(&self, state: &str) -> anyhow::Result<Option<String>> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let user_id: Option<String> = con.get_del(format!("{STATE_KEY_PREFIX}{state}")).await?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_requests_offline_drive_access() {
        let url = build_authorization_url("client-1", "https://app.example/oauth/callback", "nonce-9").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(parsed.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["redirect_uri"], "https://app.example/oauth/callback");
        assert_eq!(params["scope"], DRIVE_FILE_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "nonce-9");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn test_token_grant_without_refresh_token() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token": "ya29.x", "expires_in": 3599, "scope": "drive.file", "token_type": "Bearer"}"#,
        )
        .unwrap();
        assert_eq!(grant.access_token, "ya29.x");
        assert!(grant.refresh_token.is_none());
        assert_eq!(grant.expires_in, 3599);
    }
}
