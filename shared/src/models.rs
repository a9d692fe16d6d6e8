use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::price_bars;

/// Wire representation of a stored bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBarResponse {
    pub id: i32,
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl From<price_bars::Model> for PriceBarResponse {
    fn from(model: price_bars::Model) -> Self {
        Self {
            id: model.id,
            symbol: model.symbol,
            timestamp: model.timestamp,
            open: model.open,
            high: model.high,
            low: model.low,
            close: model.close,
            volume: model.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The provider had nothing for this symbol; the store was not touched.
    NoData { symbol: String },
    Stored {
        symbol: String,
        fetched: usize,
        inserted: usize,
    },
}

impl RefreshOutcome {
    pub fn inserted(&self) -> usize {
        match self {
            RefreshOutcome::NoData { .. } => 0,
            RefreshOutcome::Stored { inserted, .. } => *inserted,
        }
    }

    pub fn fetched(&self) -> usize {
        match self {
            RefreshOutcome::NoData { .. } => 0,
            RefreshOutcome::Stored { fetched, .. } => *fetched,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RefreshOutcome::NoData { symbol } => format!("No data found for symbol {}", symbol),
            RefreshOutcome::Stored { symbol, .. } => {
                format!("Successfully updated data for {}", symbol)
            }
        }
    }
}
