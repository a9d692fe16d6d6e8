use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::error::StockError;
use crate::market_data::{DailyBar, MarketDataProvider};
use crate::models::{PriceBarResponse, RefreshOutcome};
use crate::repositories::PriceBarRepository;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open timestamp window built from calendar-day filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Inclusive lower bound, midnight of the start day.
    pub start: Option<NaiveDateTime>,
    /// Exclusive upper bound, midnight of the day after the end day.
    pub end_exclusive: Option<NaiveDateTime>,
}

impl DateRange {
    /// Parses optional `YYYY-MM-DD` filters. Both values are validated
    /// before anything is returned; empty strings count as absent.
    pub fn parse(start_date: Option<&str>, end_date: Option<&str>) -> Result<Self, StockError> {
        let start = parse_date("start_date", start_date)?;
        let end = parse_date("end_date", end_date)?;

        Ok(DateRange {
            start: start.map(|d| d.and_time(NaiveTime::MIN)),
            end_exclusive: end
                .and_then(|d| d.succ_opt())
                .map(|d| d.and_time(NaiveTime::MIN)),
        })
    }
}

fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, StockError> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| StockError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

/// Fetches bars from the provider into the store and reads them back.
pub struct StockService {
    provider: Arc<dyn MarketDataProvider>,
    refresh_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl StockService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    fn refresh_lock(&self, symbol: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(symbol.to_string()).or_default().clone()
    }

    /// Drops the map entry once no other refresh of `symbol` holds it.
    fn release_refresh_lock(&self, symbol: &str, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under this mutex: one for the map, one for `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(symbol);
        }
    }

    async fn store_new_bars(
        db: &DatabaseConnection,
        symbol: &str,
        bars: &[DailyBar],
    ) -> Result<usize, StockError> {
        let txn = db.begin().await?;
        let mut inserted = 0;
        for bar in bars {
            if PriceBarRepository::exists(&txn, symbol, bar.timestamp).await? {
                continue;
            }
            PriceBarRepository::insert(&txn, symbol, bar).await?;
            inserted += 1;
        }
        txn.commit().await?;
        Ok(inserted)
    }

    /// Pulls the trailing daily history for `symbol` and inserts the bars
    /// that are not stored yet. All inserts are committed together.
    pub async fn refresh(
        &self,
        db: &DatabaseConnection,
        symbol: &str,
    ) -> Result<RefreshOutcome, StockError> {
        let bars = self.provider.daily_history(symbol).await?;
        if bars.is_empty() {
            warn!("No data found for symbol {} from {}", symbol, self.provider.id());
            return Ok(RefreshOutcome::NoData {
                symbol: symbol.to_string(),
            });
        }

        // Same-symbol refreshes would otherwise race between check and insert.
        let lock = self.refresh_lock(symbol);
        let stored = {
            let _guard = lock.lock().await;
            Self::store_new_bars(db, symbol, &bars).await
        };
        self.release_refresh_lock(symbol, lock);
        let inserted = stored?;

        info!(
            "Data fetched and stored for {}: {} bars received, {} new",
            symbol,
            bars.len(),
            inserted
        );

        Ok(RefreshOutcome::Stored {
            symbol: symbol.to_string(),
            fetched: bars.len(),
            inserted,
        })
    }

    /// Stored bars for `symbol`, newest first, optionally limited to an
    /// inclusive `start_date..=end_date` window.
    pub async fn query(
        &self,
        db: &DatabaseConnection,
        symbol: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<PriceBarResponse>, StockError> {
        let range = DateRange::parse(start_date, end_date)?;
        let rows = PriceBarRepository::find_by_symbol(db, symbol, &range).await?;

        if rows.is_empty() {
            return Err(StockError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(rows.into_iter().map(PriceBarResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use sea_orm::{ConnectOptions, Database};

    use super::*;
    use crate::database::ensure_schema;
    use crate::market_data::MarketDataError;

    struct OneBarProvider;

    #[async_trait]
    impl MarketDataProvider for OneBarProvider {
        fn id(&self) -> &'static str {
            "ONE_BAR"
        }

        async fn daily_history(&self, _symbol: &str) -> Result<Vec<DailyBar>, MarketDataError> {
            Ok(vec![DailyBar {
                timestamp: at_midnight(2024, 1, 10),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10,
            }])
        }
    }

    async fn memory_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn lock_entries(service: &StockService) -> usize {
        service.refresh_locks.lock().unwrap().len()
    }

    fn at_midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_date_range_end_is_inclusive_of_whole_day() {
        let range = DateRange::parse(Some("2024-01-10"), Some("2024-01-10")).unwrap();
        assert_eq!(range.start, Some(at_midnight(2024, 1, 10)));
        assert_eq!(range.end_exclusive, Some(at_midnight(2024, 1, 11)));
    }

    #[test]
    fn test_date_range_end_rolls_over_month() {
        let range = DateRange::parse(None, Some("2024-02-29")).unwrap();
        assert_eq!(range.start, None);
        assert_eq!(range.end_exclusive, Some(at_midnight(2024, 3, 1)));
    }

    #[test]
    fn test_date_range_empty_strings_are_ignored() {
        let range = DateRange::parse(Some(""), Some("")).unwrap();
        assert_eq!(range, DateRange::default());
    }

    #[test]
    fn test_date_range_rejects_malformed_start() {
        let err = DateRange::parse(Some("not-a-date"), Some("2024-01-10")).unwrap_err();
        assert!(matches!(
            err,
            StockError::InvalidDate { field: "start_date", ref value } if value == "not-a-date"
        ));
    }

    #[test]
    fn test_date_range_rejects_malformed_end_even_with_valid_start() {
        let err = DateRange::parse(Some("2024-01-10"), Some("2024-13-01")).unwrap_err();
        assert!(matches!(err, StockError::InvalidDate { field: "end_date", .. }));
    }

    #[test]
    fn test_date_range_rejects_datetime_strings() {
        assert!(DateRange::parse(Some("2024-01-10T00:00:00"), None).is_err());
    }

    #[tokio::test]
    async fn test_refresh_releases_symbol_lock_entry() {
        let db = memory_db().await;
        let service = StockService::new(Arc::new(OneBarProvider));

        for symbol in ["AAPL", "MSFT", "AAPL"] {
            service.refresh(&db, symbol).await.unwrap();
            assert_eq!(lock_entries(&service), 0);
        }
    }

    #[test]
    fn test_release_keeps_lock_entry_while_shared() {
        let service = StockService::new(Arc::new(OneBarProvider));

        let first = service.refresh_lock("AAPL");
        let second = service.refresh_lock("AAPL");
        assert!(Arc::ptr_eq(&first, &second));

        service.release_refresh_lock("AAPL", first);
        assert_eq!(lock_entries(&service), 1);

        service.release_refresh_lock("AAPL", second);
        assert_eq!(lock_entries(&service), 0);
    }
}
