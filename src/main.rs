use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crm_api::config::config;
use crm_api::database::DatabaseManager;
use crm_api::services::UserService;
use crm_api::{app, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT secrets, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    info!("Starting CRM API in {:?} mode", config.environment);

    let memory = config.uses_memory_store();
    if memory && is_production!() {
        warn!("Production is running on the in-memory store; data will not survive a restart");
    }
    let store = DatabaseManager::open_store(&config.database, memory).await?;
    let state = AppState::new(store, config.clone())?;

    UserService::new(state.store.clone())
        .ensure_seed_admin(&config.seed)
        .await?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("CRM API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
