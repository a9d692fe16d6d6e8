use std::sync::Arc;

use sea_orm::DatabaseConnection;
use shared::{ensure_schema, get_db_connection, Config, StockService, YahooClient};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub stocks: Arc<StockService>,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let db = get_db_connection(&config.database_url).await?;
        ensure_schema(&db).await?;
        tracing::info!("Connected to database, stock_data table ready");

        let provider = Arc::new(YahooClient::new(&config.market_data_base_url)?);
        tracing::info!("Market data provider: {}", config.market_data_base_url);

        Ok(AppState {
            db: Arc::new(db),
            stocks: Arc::new(StockService::new(provider)),
        })
    }
}
