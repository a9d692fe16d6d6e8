pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod market_data;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use database::{ensure_schema, get_db_connection};
pub use error::StockError;
pub use market_data::{DailyBar, MarketDataError, MarketDataProvider, YahooClient};
pub use models::*;
pub use services::stock_service::{DateRange, StockService};
