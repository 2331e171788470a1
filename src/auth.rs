use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::Error;

const TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Process-wide access-token cache. Lives inside the shared application
/// state rather than a hidden global so the attendance logic stays testable
/// without real credentials. Concurrent refreshes may race; last writer
/// wins, which is acceptable for a bearer token.
#[derive(Default)]
pub struct TokenCache {
    token: RwLock<Option<String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        TokenCache::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }
}

/// Obtains access tokens from the OAuth refresh-token grant and keeps the
/// last good one cached.
pub struct Authenticator {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cache: TokenCache,
}

impl Authenticator {
    pub fn new(config: &Config) -> Self {
        Authenticator {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cache: TokenCache::new(),
        }
    }

    /// Returns the cached token if the tokeninfo endpoint still accepts it,
    /// otherwise refreshes and re-caches. Failure to refresh surfaces as
    /// `Unauthorized` to the caller.
    pub async fn valid_access_token(&self) -> Result<String, Error> {
        if let Some(token) = self.cache.get().await {
            if self.is_token_valid(&token).await {
                log::info!("Access token is valid. Using the cached token");
                return Ok(token);
            }
            self.cache.invalidate().await;
        }

        log::warn!("Access token not valid or not cached. Refreshing token...");
        let token = self.refresh_access_token().await?;
        self.cache.set(token.clone()).await;
        log::info!("Access token refreshed and cached");
        Ok(token)
    }

    async fn is_token_valid(&self, token: &str) -> bool {
        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("access_token", token)])
            .send()
            .await;
        matches!(response, Ok(r) if r.status().is_success())
    }

    async fn refresh_access_token(&self) -> Result<String, Error> {
        log::info!("Attempting to refresh access token...");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                log::error!("Failed to reach the token endpoint: {e}");
                Error::Unauthorized
            })?;

        if !response.status().is_success() {
            log::error!("Failed to refresh access token: {}", response.status());
            return Err(Error::Unauthorized);
        }

        let body: Value = response.json().await.map_err(|_| Error::Unauthorized)?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or(Error::Unauthorized)
    }
}
