use anyhow::Context;
use tracing_subscriber::EnvFilter;

use edutrack::config::AppConfig;
use edutrack::database::connect_store;
use edutrack::services::UserService;
use edutrack::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;
    tracing::info!("Starting EduTrack API in {:?} mode", config.environment);

    let store = connect_store(&config.database).await?;
    store.migrate().await.context("applying schema")?;

    // The memory store starts empty; without a seed admin nobody could log in
    if config.database.url.is_none() {
        let (admin, _) = UserService::new(store.clone(), &config).ensure_admin(&config.seed).await?;
        tracing::info!("Seeded admin login: {} / {}", admin.email, config.seed.admin_password);
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("EduTrack API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(config, store))).await?;
    Ok(())
}
