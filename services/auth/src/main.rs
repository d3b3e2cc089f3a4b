use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod error;
mod jwt;
mod middleware;
mod models;
mod pages;
mod password;
mod rate_limiter;
mod repositories;
mod routes;
mod service;
mod validation;

use common::database::{DatabaseConfig, init_pool};
use tokio::net::TcpListener;

use crate::{
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    password::PasswordEncoder,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{PgStore, TransactionManager},
    service::AuthService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub jwt_service: JwtService,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    let store = PgStore::new(pool);

    // Check database connectivity
    if store.health_check().await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    store.migrate().await?;

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config)?;

    let rate_limiter = RateLimiter::new(RateLimiterConfig::from_env()?);

    let auth_service = AuthService::new(
        Arc::new(store),
        jwt_service.clone(),
        PasswordEncoder::new(),
        rate_limiter,
    );

    let app_state = AppState {
        auth_service,
        jwt_service,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let server_config = ServerConfig::from_env()?;
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(server_config.bind_address).await?;
    info!(
        "Authentication service listening on {}",
        server_config.bind_address
    );

    axum::serve(listener, app).await?;

    Ok(())
}
