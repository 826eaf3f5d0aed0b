use std::net::SocketAddr;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::database::{DatabaseConfig, health_check, init_pool};
use daybook_auth::{
    AppState, database::run_migrations, repositories::Stores, routes, settings::AuthTokenSettings,
    settings::ServerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    let token_settings = AuthTokenSettings::from_env()?;
    let server_config = ServerConfig::from_env();

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let app_state = AppState::new(token_settings, Stores::postgres(pool))?;
    info!("Authentication service initialized successfully");

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_address).await?;
    info!(
        "Authentication service listening on {}",
        server_config.bind_address
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
