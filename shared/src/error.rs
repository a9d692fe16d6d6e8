use sea_orm::DbErr;
use thiserror::Error;

use crate::market_data::MarketDataError;

#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Provider(#[from] MarketDataError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("Invalid date format for {field}: '{value}'. Please use YYYY-MM-DD.")]
    InvalidDate { field: &'static str, value: String },
    #[error("No data found for symbol {symbol} within the specified date range.")]
    NotFound { symbol: String },
}

