//! Session identity for GraphQL operations
//!
//! A bearer credential is resolved against stored user tokens once per HTTP
//! request and once per WebSocket connection handshake. Resolution never
//! fails: unknown or absent credentials produce an anonymous session, and
//! operations that need an identity raise their own error via [AuthExt].

use async_graphql::{Context, Result};

use crate::db::{Database, UserRecord};
use crate::error::ApiError;

/// Identity resolved for one request or one subscription connection
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: UserRecord,
}

/// Resolve an optional bearer credential to an identity by direct lookup
/// against stored tokens. Read-only; a `Bearer ` prefix is tolerated.
pub async fn resolve_identity(db: &Database, bearer: Option<&str>) -> Option<SessionUser> {
    let token = bearer?;
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    match db.users().get_by_token(token).await {
        Ok(Some(user)) => {
            tracing::debug!(login = %user.github_login, "identity resolved");
            Some(SessionUser { user })
        }
        Ok(None) => {
            tracing::debug!("unknown bearer credential, continuing anonymously");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "identity lookup failed, continuing anonymously");
            None
        }
    }
}

/// Extension trait to get the session identity from the GraphQL context
pub trait AuthExt {
    /// Get the authenticated user, or fail with an UNAUTHENTICATED error
    fn session_user(&self) -> Result<&SessionUser>;

    /// Get the authenticated user if present, or None
    fn try_session_user(&self) -> Option<&SessionUser>;
}

impl AuthExt for Context<'_> {
    fn session_user(&self) -> Result<&SessionUser> {
        self.data_opt::<SessionUser>()
            .ok_or_else(|| ApiError::Unauthenticated.into())
    }

    fn try_session_user(&self) -> Option<&SessionUser> {
        self.data_opt::<SessionUser>()
    }
}
