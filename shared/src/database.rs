use anyhow::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};
use tracing::info;

use crate::entity::price_bars;

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", database_url);
    let db = Database::connect(database_url).await?;
    Ok(db)
}

/// Creates the `stock_data` table and its indexes if they do not exist yet.
///
/// The unique (symbol, timestamp) index backs up the existence check done
/// by the refresh path; the timestamp index serves date-window scans.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C) -> Result<(), sea_orm::DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut timestamp_index = Index::create()
        .name("idx_stock_data_timestamp")
        .table(price_bars::Entity)
        .col(price_bars::Column::Timestamp)
        .to_owned();

    let mut table = schema.create_table_from_entity(price_bars::Entity);
    table.if_not_exists().index(
        Index::create()
            .name("idx_stock_data_symbol_timestamp")
            .col(price_bars::Column::Symbol)
            .col(price_bars::Column::Timestamp)
            .unique(),
    );

    // MySQL has no CREATE INDEX IF NOT EXISTS, so its plain index goes inline.
    if backend == DbBackend::MySql {
        table.index(&mut timestamp_index);
        db.execute(backend.build(&table)).await?;
    } else {
        db.execute(backend.build(&table)).await?;
        db.execute(backend.build(timestamp_index.if_not_exists()))
            .await?;
    }
    Ok(())
}
