//! GraphQL schema definition with queries, mutations, and subscriptions
//!
//! This is the single API surface for the PhotoShare backend. Resolvers
//! dispatch into the directory and catalog services; the session identity
//! and store handle arrive as context data.

use std::sync::Arc;

use async_graphql::{Context, Object, Result, Schema};

use crate::db::Database;
use crate::error::ApiError;
use crate::services::{EventBus, NewPhoto, PhotoCatalog, UserDirectory};

use super::auth::AuthExt;
use super::limits::{LIST_FANOUT, MAX_COMPLEXITY, MAX_DEPTH, ValidationMetrics};
use super::subscriptions::SubscriptionRoot;
use super::types::*;

/// The GraphQL schema type
pub type PhotoShareSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with all resolvers, validation limits, and the
/// injected service handles
pub fn build_schema(
    db: Database,
    bus: Arc<EventBus>,
    directory: Arc<UserDirectory>,
    catalog: Arc<PhotoCatalog>,
    public_url: String,
) -> PhotoShareSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .limit_depth(MAX_DEPTH)
        .limit_complexity(MAX_COMPLEXITY)
        .extension(ValidationMetrics)
        .data(db)
        .data(bus)
        .data(directory)
        .data(catalog)
        .data(PublicUrl(public_url))
        .finish()
}

// ============================================================================
// Query Root
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The currently authenticated user, if any
    async fn me(&self, ctx: &Context<'_>) -> Option<User> {
        ctx.try_session_user().map(|s| User::from(s.user.clone()))
    }

    /// Total number of photos on file
    async fn total_photos(&self, ctx: &Context<'_>) -> Result<i64> {
        let db = ctx.data_unchecked::<Database>();
        db.photos()
            .count()
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))
    }

    /// All photos in creation order, optionally only those created after
    /// `after`
    #[graphql(complexity = "LIST_FANOUT * child_complexity + 1")]
    async fn all_photos(&self, ctx: &Context<'_>, after: Option<DateTime>) -> Result<Vec<Photo>> {
        let catalog = ctx.data_unchecked::<Arc<PhotoCatalog>>();
        let records = catalog.photos_since(after.map(|d| d.0)).await?;
        Ok(records.into_iter().map(Photo::from).collect())
    }

    /// Total number of users on file
    async fn total_users(&self, ctx: &Context<'_>) -> Result<i64> {
        let db = ctx.data_unchecked::<Database>();
        db.users()
            .count()
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))
    }

    /// All users in the order they joined
    #[graphql(complexity = "LIST_FANOUT * child_complexity + 1")]
    async fn all_users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let db = ctx.data_unchecked::<Database>();
        let records = db
            .users()
            .list_all()
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        Ok(records.into_iter().map(User::from).collect())
    }

    /// Health check (no auth required)
    async fn health(&self) -> Result<bool> {
        Ok(true)
    }

    /// Server version
    async fn version(&self) -> Result<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

// ============================================================================
// Mutation Root
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Post a new photo as the authenticated user. The owner is taken from
    /// the session, never from the input.
    async fn post_photo(&self, ctx: &Context<'_>, input: PostPhotoInput) -> Result<Photo> {
        let catalog = ctx.data_unchecked::<Arc<PhotoCatalog>>();

        let upload = match &input.file {
            Some(file) => Some(
                file.value(ctx)
                    .map_err(|e| ApiError::Attachment(e.to_string()))?,
            ),
            None => None,
        };

        let record = catalog
            .post_photo(
                NewPhoto {
                    name: input.name,
                    description: input.description,
                    category: input.category.as_str().to_string(),
                    upload,
                },
                ctx.try_session_user().map(|s| &s.user),
            )
            .await?;

        Ok(Photo::from(record))
    }

    /// Exchange a GitHub OAuth code for a user record and bearer token
    async fn github_auth(&self, ctx: &Context<'_>, code: String) -> Result<AuthPayload> {
        let directory = ctx.data_unchecked::<Arc<UserDirectory>>();
        let outcome = directory.authenticate(&code).await?;

        Ok(AuthPayload {
            token: outcome.token,
            user: User::from(outcome.user),
        })
    }

    /// Seed generated users into the directory
    #[graphql(complexity = "LIST_FANOUT * child_complexity + 1")]
    async fn add_fake_users(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 1)] count: u32,
    ) -> Result<Vec<User>> {
        let directory = ctx.data_unchecked::<Arc<UserDirectory>>();
        let records = directory.add_fake_users(count).await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    /// Authenticate as a seeded user without a credential exchange
    async fn fake_user_auth(&self, ctx: &Context<'_>, github_login: String) -> Result<AuthPayload> {
        let directory = ctx.data_unchecked::<Arc<UserDirectory>>();
        let outcome = directory.authenticate_by_login(&github_login).await?;

        Ok(AuthPayload {
            token: outcome.token,
            user: User::from(outcome.user),
        })
    }
}
