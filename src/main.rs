//! PhotoShare Backend - GraphQL gateway for the photo sharing API
//!
//! Reads configuration from the environment, connects the store, constructs
//! the event bus and services, builds the schema, and serves HTTP/WebSocket
//! traffic until the process exits.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoshare::config::Config;
use photoshare::db::Database;
use photoshare::services::{EventBus, GithubClient, PhotoCatalog, PhotoStorage, RandomUserClient, UserDirectory};
use photoshare::{AppState, build_app, graphql};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoshare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PhotoShare Backend");

    if let Some(parent) = Path::new(&config.database_path).parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    let db = Database::connect(&config.database_path).await?;
    tracing::info!("Database connected");

    let storage = PhotoStorage::new(&config.images_path);
    storage.ensure_root().await?;

    let bus = Arc::new(EventBus::new());

    let github = Arc::new(GithubClient::new(
        &config.github_client_id,
        &config.github_client_secret,
    ));
    let profiles = Arc::new(RandomUserClient::new(&config.random_user_api));

    let directory = Arc::new(UserDirectory::new(
        db.clone(),
        bus.clone(),
        github,
        profiles,
    ));
    let catalog = Arc::new(PhotoCatalog::new(db.clone(), bus.clone(), storage));

    let schema = graphql::build_schema(
        db.clone(),
        bus,
        directory,
        catalog,
        config.public_url.clone(),
    );
    tracing::info!("GraphQL schema built");

    let state = AppState {
        config: config.clone(),
        db,
        schema,
    };
    let app = build_app(state);

    let host = config.host.as_deref().unwrap_or("0.0.0.0");
    let addr = format!("{}:{}", host, config.port);
    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "GraphQL playground: http://localhost:{}/graphql",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
