mod error;
mod routes;
mod state;

use anyhow::Result;
use dotenv::dotenv;
use shared::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting stock data API server...");

    let config = Config::from_env()?;
    let state = AppState::new(&config).await?;
    info!("Allowed CORS origins: {:?}", config.allowed_origins);

    let app = routes::app_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
