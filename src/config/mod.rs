//! Application configuration management

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (bind address)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite database path
    pub database_path: String,

    /// Public base URL used to derive photo URLs
    pub public_url: String,

    /// Directory where uploaded photo binaries are stored and served from
    pub images_path: String,

    /// GitHub OAuth application client id
    pub github_client_id: String,

    /// GitHub OAuth application client secret
    pub github_client_secret: String,

    /// Base URL of the synthetic-profile generator
    pub random_user_api: String,
}

impl Config {
    /// Load configuration from environment variables. Read once at startup;
    /// there is no runtime reconfiguration.
    pub fn from_env() -> Result<Self> {
        let database_path = env::var("DATABASE_PATH")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| "./data/photoshare.db".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .context("Invalid PORT")?;

        Ok(Self {
            host: env::var("HOST").ok(),

            port,

            database_path,

            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),

            images_path: env::var("IMAGES_PATH").unwrap_or_else(|_| "./data/img".to_string()),

            github_client_id: env::var("GITHUB_CLIENT_ID")
                .context("GITHUB_CLIENT_ID is required")?,

            github_client_secret: env::var("GITHUB_CLIENT_SECRET")
                .context("GITHUB_CLIENT_SECRET is required")?,

            random_user_api: env::var("RANDOM_USER_API")
                .unwrap_or_else(|_| "https://randomuser.me/api".to_string()),
        })
    }
}
