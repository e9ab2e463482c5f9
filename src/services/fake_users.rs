//! Synthetic-profile client for bulk user seeding
//!
//! Fetches generated identities from randomuser.me. No authentication
//! required. Base URL: https://randomuser.me/api

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// A generated identity, flattened to the fields the directory stores
#[derive(Debug, Clone)]
pub struct SyntheticProfile {
    pub login: String,
    pub name: String,
    pub avatar: String,
    pub token: String,
}

/// Seam for the profile generator, so seeding can be exercised without the
/// network.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(&self, count: u32) -> Result<Vec<SyntheticProfile>>;
}

#[derive(Debug, Deserialize)]
struct RandomUserResponse {
    results: Vec<RandomUserResult>,
}

#[derive(Debug, Deserialize)]
struct RandomUserResult {
    login: RandomUserLogin,
    name: RandomUserName,
    picture: RandomUserPicture,
}

#[derive(Debug, Deserialize)]
struct RandomUserLogin {
    username: String,
    sha1: String,
}

#[derive(Debug, Deserialize)]
struct RandomUserName {
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct RandomUserPicture {
    thumbnail: String,
}

/// randomuser.me API client
pub struct RandomUserClient {
    client: Client,
    base_url: String,
}

impl RandomUserClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProfileSource for RandomUserClient {
    async fn fetch(&self, count: u32) -> Result<Vec<SyntheticProfile>> {
        let url = format!("{}/?results={}", self.base_url, count);

        let response: RandomUserResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("Profile generator unreachable")?
            .json()
            .await
            .context("Invalid profile generator response")?;

        Ok(response
            .results
            .into_iter()
            .map(|r| SyntheticProfile {
                login: r.login.username,
                name: format!("{} {}", r.name.first, r.name.last),
                avatar: r.picture.thumbnail,
                token: r.login.sha1,
            })
            .collect())
    }
}
