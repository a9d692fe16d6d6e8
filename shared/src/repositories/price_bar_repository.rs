use chrono::NaiveDateTime;
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{QueryOrder, Set};

use crate::entity::price_bars;
use crate::market_data::DailyBar;
use crate::services::stock_service::DateRange;

/// Queries over `stock_data`.
///
/// Every method takes the connection per call so the same code runs
/// against the pool or inside a refresh transaction.
pub struct PriceBarRepository;

impl PriceBarRepository {
    /// Exact (case-sensitive) match on symbol and timestamp.
    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        symbol: &str,
        timestamp: NaiveDateTime,
    ) -> Result<bool, DbErr> {
        let row = price_bars::Entity::find()
            .filter(price_bars::Column::Symbol.eq(symbol))
            .filter(price_bars::Column::Timestamp.eq(timestamp))
            .one(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        symbol: &str,
        bar: &DailyBar,
    ) -> Result<(), DbErr> {
        let active_model = price_bars::ActiveModel {
            symbol: Set(symbol.to_string()),
            timestamp: Set(bar.timestamp),
            open: Set(bar.open),
            high: Set(bar.high),
            low: Set(bar.low),
            close: Set(bar.close),
            volume: Set(bar.volume),
            ..Default::default()
        };
        price_bars::Entity::insert(active_model).exec(db).await?;
        Ok(())
    }

    /// Rows for `symbol` (any letter case) inside `range`, newest first.
    ///
    /// Both sides are folded by the database's `LOWER`, so a symbol always
    /// matches itself even where `LOWER` only folds ASCII.
    pub async fn find_by_symbol<C: ConnectionTrait>(
        db: &C,
        symbol: &str,
        range: &DateRange,
    ) -> Result<Vec<price_bars::Model>, DbErr> {
        let mut query = price_bars::Entity::find().filter(
            Expr::expr(Func::lower(Expr::col(price_bars::Column::Symbol)))
                .eq(Func::lower(Expr::val(symbol))),
        );

        if let Some(start) = range.start {
            query = query.filter(price_bars::Column::Timestamp.gte(start));
        }
        if let Some(end) = range.end_exclusive {
            query = query.filter(price_bars::Column::Timestamp.lt(end));
        }

        query
            .order_by_desc(price_bars::Column::Timestamp)
            .all(db)
            .await
    }
}
