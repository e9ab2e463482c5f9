//! PhotoShare backend
//!
//! A GraphQL gateway in front of a SQLite-backed photo store: typed queries,
//! mutations that create photos and authenticate users via GitHub OAuth, and
//! WebSocket subscriptions that push newly created photos and users to every
//! live subscriber.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod services;

pub use app::{AppState, build_app};
