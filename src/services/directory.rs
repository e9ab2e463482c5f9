//! User directory
//!
//! Owns the upsert-vs-insert decision during third-party authentication and
//! guarantees that the `new-user` topic sees exactly one event per user that
//! actually came into existence, never one per login.

use std::sync::Arc;

use crate::db::{CreateUser, Database, UserRecord};
use crate::error::ApiError;
use crate::services::events::EventBus;
use crate::services::fake_users::ProfileSource;
use crate::services::github::CodeExchange;

/// A successful authentication: the (possibly refreshed) record and the
/// bearer credential for subsequent requests.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub token: String,
    pub user: UserRecord,
}

pub struct UserDirectory {
    db: Database,
    bus: Arc<EventBus>,
    exchange: Arc<dyn CodeExchange>,
    profiles: Arc<dyn ProfileSource>,
}

impl UserDirectory {
    pub fn new(
        db: Database,
        bus: Arc<EventBus>,
        exchange: Arc<dyn CodeExchange>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            db,
            bus,
            exchange,
            profiles,
        }
    }

    /// Complete a GitHub OAuth exchange and upsert the user it names.
    ///
    /// The existence check drives both the write path and the publish
    /// decision: only the insert branch emits on `new-user`, and the event
    /// carries the stored record with its assigned id. The check-then-branch
    /// is not atomic against a concurrent exchange for the same unseen login;
    /// the UNIQUE constraint on the login turns the loser's insert into an
    /// error rather than a duplicate row.
    pub async fn authenticate(&self, code: &str) -> Result<AuthOutcome, ApiError> {
        let profile = self
            .exchange
            .authorize(code)
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        if let Some(message) = profile.message {
            return Err(ApiError::Upstream(message));
        }

        let token = profile
            .access_token
            .ok_or_else(|| ApiError::Upstream("exchange returned no access token".to_string()))?;
        let login = profile
            .login
            .ok_or_else(|| ApiError::Upstream("exchange returned no login".to_string()))?;

        let users = self.db.users();
        let user = match users.get_by_login(&login).await? {
            Some(_) => {
                tracing::debug!(login = %login, "refreshing existing user");
                users
                    .update_profile(
                        &login,
                        profile.name.as_deref(),
                        profile.avatar_url.as_deref(),
                        &token,
                    )
                    .await?
                    .ok_or_else(|| {
                        ApiError::Persistence(anyhow::anyhow!("user disappeared during update"))
                    })?
            }
            None => {
                let record = users
                    .create(CreateUser {
                        github_login: login.clone(),
                        name: profile.name,
                        avatar: profile.avatar_url,
                        github_token: token.clone(),
                    })
                    .await?;
                tracing::info!(login = %login, id = %record.id, "new user created");
                self.bus.new_user.publish(record.clone());
                record
            }
        };

        Ok(AuthOutcome { token, user })
    }

    /// Seed `count` synthetic users and announce each one.
    ///
    /// The bulk insert does not hand assigned ids back, so the freshly
    /// inserted tail is re-read before publishing.
    pub async fn add_fake_users(&self, count: u32) -> Result<Vec<UserRecord>, ApiError> {
        let profiles = self
            .profiles
            .fetch(count)
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        let rows: Vec<CreateUser> = profiles
            .into_iter()
            .map(|p| CreateUser {
                github_login: p.login,
                name: Some(p.name),
                avatar: Some(p.avatar),
                github_token: p.token,
            })
            .collect();

        let users = self.db.users();
        users.insert_many(&rows).await?;

        let created = users.latest(rows.len() as u32).await?;
        tracing::info!(count = created.len(), "seeded synthetic users");
        for record in &created {
            self.bus.new_user.publish(record.clone());
        }

        Ok(created)
    }

    /// Credential-less auth shortcut for pre-seeded identities. Reads only;
    /// the stored token is returned as-is.
    pub async fn authenticate_by_login(&self, login: &str) -> Result<AuthOutcome, ApiError> {
        let user = self
            .db
            .users()
            .get_by_login(login)
            .await?
            .ok_or_else(|| ApiError::UserNotFound(login.to_string()))?;

        Ok(AuthOutcome {
            token: user.github_token.clone(),
            user,
        })
    }
}
