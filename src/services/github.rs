//! GitHub OAuth client
//!
//! Exchanges an authorization code for an access token, then fetches the
//! account profile with it. Two HTTP round trips against github.com; the
//! combined result is a single profile object whose `message` field carries
//! GitHub's error channel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// Result of a completed code exchange. When `message` is set the exchange
/// failed upstream and no other field should be trusted.
#[derive(Debug, Clone, Default)]
pub struct ExchangedProfile {
    pub message: Option<String>,
    pub access_token: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Seam for the third-party code exchange, so the directory can be exercised
/// without the network.
#[async_trait]
pub trait CodeExchange: Send + Sync {
    /// Exchange an authorization code for an access token and profile.
    /// `Err` means the provider was unreachable; provider-reported failures
    /// come back as `Ok` with `message` set.
    async fn authorize(&self, code: &str) -> Result<ExchangedProfile>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUserResponse {
    login: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    message: Option<String>,
}

/// GitHub OAuth API client
pub struct GithubClient {
    client: Client,
    client_id: String,
    client_secret: String,
}

impl GithubClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        // api.github.com rejects requests without a User-Agent
        let client = Client::builder()
            .user_agent(concat!("photoshare/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl CodeExchange for GithubClient {
    async fn authorize(&self, code: &str) -> Result<ExchangedProfile> {
        let token: AccessTokenResponse = self
            .client
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .context("GitHub token endpoint unreachable")?
            .json()
            .await
            .context("Invalid GitHub token response")?;

        let Some(access_token) = token.access_token else {
            let message = token
                .error_description
                .or(token.error)
                .unwrap_or_else(|| "GitHub returned no access token".to_string());
            tracing::debug!(message = %message, "GitHub code exchange rejected");
            return Ok(ExchangedProfile {
                message: Some(message),
                ..Default::default()
            });
        };

        let user: GithubUserResponse = self
            .client
            .get(USER_URL)
            .header(AUTHORIZATION, format!("token {access_token}"))
            .send()
            .await
            .context("GitHub user endpoint unreachable")?
            .json()
            .await
            .context("Invalid GitHub user response")?;

        Ok(ExchangedProfile {
            message: user.message,
            access_token: Some(access_token),
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }
}
