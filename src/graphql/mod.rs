//! GraphQL API with subscriptions for real-time updates
//!
//! This module provides the GraphQL surface using async-graphql: queries and
//! mutations over HTTP, subscriptions over WebSocket. Identity is resolved
//! from the bearer credential before an operation executes and injected as
//! context data; validation limits reject oversized operations before any
//! resolver runs.

pub mod auth;
pub mod limits;
mod schema;
mod subscriptions;
pub mod types;

pub use auth::{AuthExt, SessionUser, resolve_identity};
pub use schema::{MutationRoot, PhotoShareSchema, QueryRoot, build_schema};
